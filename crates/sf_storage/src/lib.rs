// crates/sf_storage/src/lib.rs

//! StoneFlow 粒子存储层
//!
//! 核心类型为 [`Storage`]：QuantityId → [`Quantity`] 的有序映射，
//! 每个物理量持有值缓冲与 0~2 阶时间导数缓冲，外加按连续粒子
//! 区间挂接的 [`Material`]。
//!
//! 位置物理量约定：`DVec4` 的 xyz 为空间坐标，w 为光滑长度 h。

pub mod eos;
pub mod material;
pub mod quantity;
pub mod rheology;
pub mod storage;

pub use eos::{Eos, IdealGasEos, MurnaghanEos};
pub use material::{Material, MaterialParams, QuantityBounds};
pub use quantity::{OrderEnum, Quantity, QuantityBuffer, QuantityId, QuantityValue, ValueKind};
pub use rheology::{NoRheology, Rheology, VonMisesRheology};
pub use storage::{BufferSelector, MaterialEntry, Storage};
