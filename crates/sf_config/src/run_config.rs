// crates/sf_config/src/run_config.rs

//! 运行配置
//!
//! 求解器、时间步、光滑长度与邻居查找的全部参数，
//! 纯 f64 存储以便 TOML/JSON 序列化。默认值取自久经验证的
//! 冲击模拟参数组。

use serde::{Deserialize, Serialize};
use sf_foundation::{SfError, SfResult};

/// SPH 核函数选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelChoice {
    /// 三次样条（支撑半径 2h）
    #[default]
    CubicSpline,
    /// 四次样条（支撑半径 2.5h）
    FourthOrderSpline,
}

/// SPH 离散格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscretizationChoice {
    /// pᵢ/ρᵢ² + pⱼ/ρⱼ²
    #[default]
    Standard,
    /// (pᵢ+pⱼ)/(ρᵢρⱼ)
    BenzAsphaug,
}

/// 连续性方程变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuityChoice {
    /// 全体粒子用速度散度
    #[default]
    Standard,
    /// 完好粒子用速度梯度的迹，破碎粒子退回散度
    Solid,
}

/// 求解器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub kernel: KernelChoice,

    #[serde(default)]
    pub discretization: DiscretizationChoice,

    #[serde(default)]
    pub continuity: ContinuityChoice,

    /// Monaghan 人工粘性 α
    #[serde(default = "default_av_alpha")]
    pub av_alpha: f64,

    /// Monaghan 人工粘性 β
    #[serde(default = "default_av_beta")]
    pub av_beta: f64,

    /// 是否启用人工粘性
    #[serde(default = "default_true")]
    pub use_av: bool,

    /// 是否用 Balsara 开关抑制剪切流中的人工粘性
    #[serde(default)]
    pub use_balsara: bool,

    /// 是否把 Balsara 系数存入存储（诊断用）
    #[serde(default)]
    pub balsara_store: bool,

    /// 是否对速度梯度施加核梯度修正张量
    #[serde(default)]
    pub use_correction_tensor: bool,
}

fn default_av_alpha() -> f64 {
    1.5
}
fn default_av_beta() -> f64 {
    3.0
}
fn default_true() -> bool {
    true
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kernel: KernelChoice::default(),
            discretization: DiscretizationChoice::default(),
            continuity: ContinuityChoice::default(),
            av_alpha: default_av_alpha(),
            av_beta: default_av_beta(),
            use_av: true,
            use_balsara: false,
            balsara_store: false,
            use_correction_tensor: false,
        }
    }
}

/// 时间积分器选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorChoice {
    /// 半隐式欧拉（一阶）
    EulerExplicit,
    /// 预估-校正（二阶）
    #[default]
    PredictorCorrector,
    /// 蛙跳 KDK
    LeapFrog,
}

/// 时间步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestepConfig {
    #[serde(default)]
    pub integrator: IntegratorChoice,

    /// Courant 数
    #[serde(default = "default_courant")]
    pub courant: f64,

    /// 最大时间步 [s]
    #[serde(default = "default_max_step")]
    pub max_step: f64,

    /// 初始时间步 [s]
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,

    /// 导数判据系数
    #[serde(default = "default_derivative_factor")]
    pub derivative_factor: f64,

    #[serde(default = "default_true")]
    pub use_courant_criterion: bool,

    #[serde(default = "default_true")]
    pub use_acceleration_criterion: bool,

    #[serde(default = "default_true")]
    pub use_derivative_criterion: bool,
}

fn default_courant() -> f64 {
    0.2
}
fn default_max_step() -> f64 {
    10.0
}
fn default_initial_step() -> f64 {
    0.03
}
fn default_derivative_factor() -> f64 {
    0.2
}

impl Default for TimestepConfig {
    fn default() -> Self {
        Self {
            integrator: IntegratorChoice::default(),
            courant: default_courant(),
            max_step: default_max_step(),
            initial_step: default_initial_step(),
            derivative_factor: default_derivative_factor(),
            use_courant_criterion: true,
            use_acceleration_criterion: true,
            use_derivative_criterion: true,
        }
    }
}

/// 光滑长度配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// 是否随散度演化光滑长度
    #[serde(default = "default_true")]
    pub adaptive: bool,

    /// 邻居数下限
    #[serde(default = "default_neighbour_min")]
    pub neighbour_min: f64,

    /// 邻居数上限
    #[serde(default = "default_neighbour_max")]
    pub neighbour_max: f64,

    /// 邻居数强制项强度
    #[serde(default = "default_enforcing")]
    pub enforcing_strength: f64,

    /// 光滑长度下限 [m]
    #[serde(default = "default_h_min")]
    pub h_min: f64,
}

fn default_neighbour_min() -> f64 {
    25.0
}
fn default_neighbour_max() -> f64 {
    100.0
}
fn default_enforcing() -> f64 {
    0.2
}
fn default_h_min() -> f64 {
    1e-5
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            adaptive: true,
            neighbour_min: default_neighbour_min(),
            neighbour_max: default_neighbour_max(),
            enforcing_strength: default_enforcing(),
            h_min: default_h_min(),
        }
    }
}

/// 邻居查找配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderConfig {
    /// kd 树叶节点粒子数上限
    #[serde(default = "default_leaf_size")]
    pub leaf_size: usize,

    /// 并行粒子循环的最小分块长度
    #[serde(default = "default_granularity")]
    pub granularity: usize,
}

fn default_leaf_size() -> usize {
    25
}
fn default_granularity() -> usize {
    1000
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            leaf_size: default_leaf_size(),
            granularity: default_granularity(),
        }
    }
}

/// 运行控制
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunControlConfig {
    /// 模拟终止时刻 [s]
    #[serde(default = "default_end_time")]
    pub end_time: f64,

    /// 快照输出间隔 [s]，0 表示不输出
    #[serde(default)]
    pub snapshot_interval: f64,

    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: std::path::PathBuf,
}

fn default_end_time() -> f64 {
    10.0
}
fn default_output_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("output")
}

impl Default for RunControlConfig {
    fn default() -> Self {
        Self {
            end_time: default_end_time(),
            snapshot_interval: 0.0,
            output_dir: default_output_dir(),
        }
    }
}

/// 完整运行配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub timestep: TimestepConfig,

    #[serde(default)]
    pub smoothing: SmoothingConfig,

    #[serde(default)]
    pub finder: FinderConfig,

    #[serde(default)]
    pub run: RunControlConfig,
}

impl RunConfig {
    /// 参数合法性检查
    pub fn validate(&self) -> SfResult<()> {
        if self.timestep.courant <= 0.0 || self.timestep.courant > 1.0 {
            return Err(SfError::invalid_parameter(
                "timestep.courant",
                "须在 (0, 1] 内",
            ));
        }
        if self.timestep.initial_step <= 0.0 || self.timestep.initial_step > self.timestep.max_step
        {
            return Err(SfError::invalid_parameter(
                "timestep.initial_step",
                "须为正且不超过 max_step",
            ));
        }
        if self.smoothing.neighbour_min >= self.smoothing.neighbour_max {
            return Err(SfError::invalid_parameter(
                "smoothing.neighbour_min",
                "须小于 neighbour_max",
            ));
        }
        if self.smoothing.h_min <= 0.0 {
            return Err(SfError::invalid_parameter("smoothing.h_min", "须为正"));
        }
        if self.solver.av_alpha < 0.0 || self.solver.av_beta < 0.0 {
            return Err(SfError::invalid_parameter("solver.av_alpha", "须非负"));
        }
        if self.finder.leaf_size == 0 {
            return Err(SfError::invalid_parameter("finder.leaf_size", "须为正"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timestep.courant, 0.2);
        assert_eq!(config.timestep.max_step, 10.0);
        assert_eq!(config.smoothing.neighbour_min, 25.0);
        assert_eq!(config.finder.leaf_size, 25);
    }

    #[test]
    fn test_validate_rejects_bad_courant() {
        let mut config = RunConfig::default();
        config.timestep.courant = 1.5;
        assert!(config.validate().is_err());
        config.timestep.courant = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_neighbour_band() {
        let mut config = RunConfig::default();
        config.smoothing.neighbour_min = 200.0;
        assert!(config.validate().is_err());
    }
}
