// crates/sf_config/src/body_config.rs

//! 物体（材料）配置
//!
//! 默认参数为玄武岩，Weibull 缺陷分布参数取实验测定值
//! k = 4×10³⁵, m = 9。

use serde::{Deserialize, Serialize};
use sf_foundation::{SfError, SfResult};

/// 状态方程选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EosChoice {
    IdealGas,
    #[default]
    Murnaghan,
}

/// 流变模型选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RheologyChoice {
    /// 无强度（流体）
    None,
    #[default]
    VonMises,
}

/// 单一物体的材料与初始状态配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyConfig {
    /// 参考密度 [kg/m³]
    #[serde(default = "default_density")]
    pub density: f64,

    #[serde(default)]
    pub eos: EosChoice,

    /// 理想气体绝热指数
    #[serde(default = "default_gamma")]
    pub adiabatic_index: f64,

    /// 体积模量 [Pa]
    #[serde(default = "default_bulk")]
    pub bulk_modulus: f64,

    /// 剪切模量 [Pa]
    #[serde(default = "default_shear")]
    pub shear_modulus: f64,

    /// von Mises 屈服极限 [Pa]
    #[serde(default = "default_elasticity_limit")]
    pub elasticity_limit: f64,

    /// 熔融比内能 [J/kg]
    #[serde(default = "default_melt_energy")]
    pub melt_energy: f64,

    #[serde(default)]
    pub rheology: RheologyChoice,

    /// 是否启用 Grady-Kipp 损伤模型
    #[serde(default)]
    pub use_damage: bool,

    /// Weibull 系数 k [m⁻³]
    #[serde(default = "default_weibull_k")]
    pub weibull_coefficient: f64,

    /// Weibull 指数 m
    #[serde(default = "default_weibull_m")]
    pub weibull_exponent: f64,

    /// 缺陷采样种子
    #[serde(default = "default_seed")]
    pub damage_seed: u64,

    /// 初始比内能 [J/kg]
    #[serde(default)]
    pub initial_energy: f64,

    /// 能量下限（钳制与导数判据）[J/kg]
    #[serde(default = "default_energy_min")]
    pub energy_min: f64,

    /// 密度下限（钳制与导数判据）[kg/m³]
    #[serde(default = "default_density_min")]
    pub density_min: f64,

    /// 粒子数（初始条件生成用）
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,

    /// 物体半径 [m]（初始条件生成用）
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_density() -> f64 {
    2700.0
}
fn default_gamma() -> f64 {
    1.4
}
fn default_bulk() -> f64 {
    2.67e10
}
fn default_shear() -> f64 {
    2.27e10
}
fn default_elasticity_limit() -> f64 {
    3.5e9
}
fn default_melt_energy() -> f64 {
    3.4e6
}
fn default_weibull_k() -> f64 {
    4.0e35
}
fn default_weibull_m() -> f64 {
    9.0
}
fn default_seed() -> u64 {
    1234
}
fn default_energy_min() -> f64 {
    10.0
}
fn default_density_min() -> f64 {
    50.0
}
fn default_particle_count() -> usize {
    10000
}
fn default_radius() -> f64 {
    1000.0
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            density: default_density(),
            eos: EosChoice::default(),
            adiabatic_index: default_gamma(),
            bulk_modulus: default_bulk(),
            shear_modulus: default_shear(),
            elasticity_limit: default_elasticity_limit(),
            melt_energy: default_melt_energy(),
            rheology: RheologyChoice::default(),
            use_damage: false,
            weibull_coefficient: default_weibull_k(),
            weibull_exponent: default_weibull_m(),
            damage_seed: default_seed(),
            initial_energy: 0.0,
            energy_min: default_energy_min(),
            density_min: default_density_min(),
            particle_count: default_particle_count(),
            radius: default_radius(),
        }
    }
}

impl BodyConfig {
    pub fn validate(&self) -> SfResult<()> {
        if self.density <= 0.0 {
            return Err(SfError::invalid_parameter("body.density", "须为正"));
        }
        if self.eos == EosChoice::IdealGas && self.adiabatic_index <= 1.0 {
            return Err(SfError::invalid_parameter(
                "body.adiabatic_index",
                "须大于 1",
            ));
        }
        if self.bulk_modulus <= 0.0 || self.shear_modulus < 0.0 {
            return Err(SfError::invalid_parameter("body.bulk_modulus", "须为正"));
        }
        if self.use_damage && (self.weibull_coefficient <= 0.0 || self.weibull_exponent <= 0.0) {
            return Err(SfError::invalid_parameter(
                "body.weibull_coefficient",
                "损伤模型要求正的 Weibull 参数",
            ));
        }
        if self.particle_count == 0 {
            return Err(SfError::invalid_parameter("body.particle_count", "须为正"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basalt_defaults() {
        let body = BodyConfig::default();
        assert!(body.validate().is_ok());
        assert_eq!(body.weibull_coefficient, 4.0e35);
        assert_eq!(body.weibull_exponent, 9.0);
        assert_eq!(body.rheology, RheologyChoice::VonMises);
    }

    #[test]
    fn test_validate_ideal_gas() {
        let mut body = BodyConfig {
            eos: EosChoice::IdealGas,
            ..BodyConfig::default()
        };
        assert!(body.validate().is_ok());
        body.adiabatic_index = 1.0;
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_validate_damage_params() {
        let mut body = BodyConfig {
            use_damage: true,
            ..BodyConfig::default()
        };
        assert!(body.validate().is_ok());
        body.weibull_exponent = 0.0;
        assert!(body.validate().is_err());
    }
}
