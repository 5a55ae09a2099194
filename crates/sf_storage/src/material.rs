// crates/sf_storage/src/material.rs

//! 材料
//!
//! 材料 = 参数 + 状态方程 + 流变模型 + 物理量取值范围。
//! 每步开始时对所属粒子区间求状态方程并施加流变折减。

use std::ops::Range;

use sf_config::{BodyConfig, EosChoice, RheologyChoice};
use sf_foundation::{Interval, SfResult};

use crate::eos::{Eos, IdealGasEos, MurnaghanEos};
use crate::quantity::QuantityId;
use crate::rheology::{NoRheology, Rheology, VonMisesRheology};
use crate::storage::Storage;

/// 材料标量参数（Copy，便于在借用存储的同时读取）
#[derive(Debug, Clone, Copy)]
pub struct MaterialParams {
    /// 参考密度 [kg/m³]
    pub rho0: f64,
    /// 剪切模量 [Pa]
    pub shear_modulus: f64,
    /// 体积模量 [Pa]
    pub bulk_modulus: f64,
    /// von Mises 屈服极限 [Pa]
    pub elasticity_limit: f64,
    /// 熔融比内能 [J/kg]
    pub melt_energy: f64,
    /// Weibull 系数 k [m⁻³]
    pub weibull_coefficient: f64,
    /// Weibull 指数 m
    pub weibull_exponent: f64,
    /// 缺陷采样种子
    pub seed: u64,
}

impl MaterialParams {
    /// Young 模量 E = 9Kμ / (3K + μ)
    #[inline]
    pub fn young_modulus(&self) -> f64 {
        let k = self.bulk_modulus;
        let mu = self.shear_modulus;
        9.0 * k * mu / (3.0 * k + mu)
    }
}

/// 物理量取值范围：钳制区间 + 导数判据的最小刻度
#[derive(Debug, Clone, Copy)]
pub struct QuantityBounds {
    pub range: Interval,
    pub min_scale: f64,
}

/// 材料
#[derive(Debug)]
pub struct Material {
    pub params: MaterialParams,
    eos: Option<Box<dyn Eos>>,
    rheology: Option<Box<dyn Rheology>>,
    bounds: Vec<(QuantityId, QuantityBounds)>,
}

impl Material {
    pub fn new(params: MaterialParams) -> Material {
        Material {
            params,
            eos: None,
            rheology: None,
            bounds: Vec::new(),
        }
    }

    pub fn with_eos(mut self, eos: Box<dyn Eos>) -> Material {
        self.eos = Some(eos);
        self
    }

    pub fn with_rheology(mut self, rheology: Box<dyn Rheology>) -> Material {
        self.rheology = Some(rheology);
        self
    }

    /// 设定物理量的钳制区间与最小刻度
    pub fn set_bounds(&mut self, id: QuantityId, range: Interval, min_scale: f64) {
        if let Some(entry) = self.bounds.iter_mut().find(|(qid, _)| *qid == id) {
            entry.1 = QuantityBounds { range, min_scale };
        } else {
            self.bounds.push((id, QuantityBounds { range, min_scale }));
        }
    }

    pub fn bounds(&self, id: QuantityId) -> Option<QuantityBounds> {
        self.bounds
            .iter()
            .find(|(qid, _)| *qid == id)
            .map(|(_, b)| *b)
    }

    pub fn iter_bounds(&self) -> impl Iterator<Item = (QuantityId, QuantityBounds)> + '_ {
        self.bounds.iter().map(|(id, b)| (*id, *b))
    }

    pub fn eos(&self) -> Option<&dyn Eos> {
        self.eos.as_deref()
    }

    pub fn has_rheology(&self) -> bool {
        self.rheology.is_some()
    }

    /// 装配阶段：插入流变模型所需物理量
    pub fn create(&self, storage: &mut Storage) -> SfResult<()> {
        if let Some(rheo) = &self.rheology {
            rheo.create(storage)?;
        }
        Ok(())
    }

    /// 步前初始化：状态方程求值 + 流变折减
    pub fn initialize(&self, storage: &mut Storage, range: Range<usize>) -> SfResult<()> {
        if let Some(eos) = &self.eos {
            if storage.has(QuantityId::Pressure) && storage.has(QuantityId::SoundSpeed) {
                let [p_q, cs_q, rho_q, u_q] = storage.get_many_mut([
                    QuantityId::Pressure,
                    QuantityId::SoundSpeed,
                    QuantityId::Density,
                    QuantityId::Energy,
                ])?;
                let p = p_q.values_mut::<f64>()?;
                let cs = cs_q.values_mut::<f64>()?;
                let rho = rho_q.values::<f64>()?;
                let u = u_q.values::<f64>()?;
                for i in range.clone() {
                    let (pi, ci) = eos.evaluate(rho[i], u[i]);
                    p[i] = pi;
                    cs[i] = ci;
                }
            }
        }
        if let Some(rheo) = &self.rheology {
            rheo.initialize(storage, range, &self.params)?;
        }
        Ok(())
    }

    /// 由物体配置构建材料
    pub fn from_body_config(config: &BodyConfig) -> SfResult<Material> {
        config.validate()?;
        let params = MaterialParams {
            rho0: config.density,
            shear_modulus: config.shear_modulus,
            bulk_modulus: config.bulk_modulus,
            elasticity_limit: config.elasticity_limit,
            melt_energy: config.melt_energy,
            weibull_coefficient: config.weibull_coefficient,
            weibull_exponent: config.weibull_exponent,
            seed: config.damage_seed,
        };
        let eos: Box<dyn Eos> = match config.eos {
            EosChoice::IdealGas => Box::new(IdealGasEos::new(config.adiabatic_index)),
            EosChoice::Murnaghan => {
                Box::new(MurnaghanEos::new(config.density, config.bulk_modulus))
            }
        };
        let rheology: Option<Box<dyn Rheology>> = match config.rheology {
            RheologyChoice::None => Some(Box::new(NoRheology)),
            RheologyChoice::VonMises => Some(Box::new(VonMisesRheology)),
        };
        let mut material = Material::new(params).with_eos(eos);
        if let Some(rheo) = rheology {
            material = material.with_rheology(rheo);
        }
        material.set_bounds(
            QuantityId::Density,
            Interval::at_least(config.density_min),
            config.density_min,
        );
        material.set_bounds(
            QuantityId::Energy,
            Interval::at_least(0.0),
            config.energy_min,
        );
        if config.use_damage {
            material.set_bounds(QuantityId::Damage, Interval::new(0.0, 1.0), 1.0);
        }
        Ok(material)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::OrderEnum;
    use glam::DVec4;

    #[test]
    fn test_young_modulus() {
        let params = MaterialParams {
            rho0: 2700.0,
            shear_modulus: 2.27e10,
            bulk_modulus: 2.67e10,
            elasticity_limit: 3.5e9,
            melt_energy: 3.4e6,
            weibull_coefficient: 4.0e35,
            weibull_exponent: 9.0,
            seed: 0,
        };
        let e = params.young_modulus();
        // E 介于 μ 与 3K 之间
        assert!(e > params.shear_modulus && e < 3.0 * params.bulk_modulus);
    }

    #[test]
    fn test_from_body_config() {
        let material = Material::from_body_config(&BodyConfig::default()).unwrap();
        assert!(material.eos().is_some());
        assert!(material.has_rheology());
        let bounds = material.bounds(QuantityId::Energy).unwrap();
        assert_eq!(bounds.range.lower(), 0.0);
        assert!(material.bounds(QuantityId::Damage).is_none());
    }

    #[test]
    fn test_initialize_evaluates_eos() {
        let mut storage = Storage::new();
        storage
            .insert_values(
                QuantityId::Position,
                OrderEnum::Second,
                vec![DVec4::new(0.0, 0.0, 0.0, 1.0); 2],
            )
            .unwrap();
        storage
            .insert_uniform(QuantityId::Density, OrderEnum::First, 2800.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::Energy, OrderEnum::First, 0.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::Pressure, OrderEnum::Zero, 0.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::SoundSpeed, OrderEnum::Zero, 0.0)
            .unwrap();

        let config = BodyConfig {
            rheology: RheologyChoice::None,
            ..BodyConfig::default()
        };
        let material = Material::from_body_config(&config).unwrap();
        material.initialize(&mut storage, 0..2).unwrap();

        let p = storage.values::<f64>(QuantityId::Pressure).unwrap();
        let cs = storage.values::<f64>(QuantityId::SoundSpeed).unwrap();
        // 压缩态为正压
        assert!(p[0] > 0.0);
        assert!(cs[0] > 0.0);
    }
}
