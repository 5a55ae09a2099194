// crates/sf_foundation/src/lib.rs

//! StoneFlow 基础层
//!
//! 提供全 workspace 共享的底层设施：
//! - 统一错误类型 [`SfError`] / [`SfResult`]
//! - 闭区间 [`Interval`]
//! - 对称张量 [`SymTensor3`] 与无迹张量 [`TracelessTensor3`]
//! - 流式统计 [`MinMaxMean`]
//! - 并行调度抽象 [`Scheduler`]
//!
//! 本层不依赖任何上层 crate。

pub mod error;
pub mod interval;
pub mod means;
pub mod scheduler;
pub mod tensor;

pub use error::{check_index, check_size, SfError, SfResult};
pub use interval::Interval;
pub use means::MinMaxMean;
pub use scheduler::Scheduler;
pub use tensor::{SymTensor3, TracelessTensor3};
