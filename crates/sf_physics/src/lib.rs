// crates/sf_physics/src/lib.rs

//! StoneFlow 物理层
//!
//! SPH 求解流水线的全部物理语义：核函数、空间导数、方程项、
//! 非对称求解器与自适应时间步进。
//!
//! 分层约定：
//! - [`derivatives`] 只做逐邻居的累加，不写存储；
//! - [`equations`] 申报导数、插入物理量，并在收尾阶段合成最终导数；
//! - [`solver`] 串起邻居查找、核求值与导数累加，保证并行与串行
//!   结果逐位一致；
//! - [`timestepping`] 按判据推进时间。

pub mod accumulated;
pub mod derivatives;
pub mod equations;
pub mod kernel;
pub mod solver;
pub mod statistics;
pub mod timestepping;

pub use accumulated::{Accumulated, BufferCategory};
pub use derivatives::{Derivative, DerivativeHolder, DerivativeKind, DerivativePhase};
pub use equations::{
    AdaptiveSmoothingLength, ConstSmoothingLength, ConstantAcceleration, ContinuityEquation,
    EquationHolder, EquationTerm, GradyKippDamage, MonaghanViscosity, PressureForce,
    SolidStressForce,
};
pub use kernel::{CubicSpline, FourthOrderSpline, Kernel, LutKernel};
pub use solver::AsymmetricSolver;
pub use statistics::{Statistics, StatisticsId, StatsValue};
pub use timestepping::{CriterionId, Integrator, MultiCriterion, TimeStepping};
