// crates/sf_config/src/lib.rs

//! StoneFlow 配置层
//!
//! 运行参数 [`RunConfig`] 与物体参数 [`BodyConfig`]，
//! 全 f64 + serde，供 CLI 以 TOML 加载。

pub mod body_config;
pub mod run_config;

pub use body_config::{BodyConfig, EosChoice, RheologyChoice};
pub use run_config::{
    ContinuityChoice, DiscretizationChoice, FinderConfig, IntegratorChoice, KernelChoice, RunConfig,
    RunControlConfig, SmoothingConfig, SolverConfig, TimestepConfig,
};
