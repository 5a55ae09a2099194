// crates/sf_storage/src/rheology.rs

//! 流变模型
//!
//! 每步开始时对材料区间内的粒子施加屈服与损伤折减：
//! 负压按 (1-D³) 缩放，偏应力按 von Mises 屈服准则折减，
//! 折减系数写入 StressReducing 供连续性方程区分完好/破碎粒子。

use std::ops::Range;

use sf_foundation::{SfResult, TracelessTensor3};

use crate::material::MaterialParams;
use crate::quantity::{OrderEnum, QuantityId};
use crate::storage::Storage;

/// 流变模型接口
pub trait Rheology: Send + Sync + std::fmt::Debug {
    /// 装配阶段：插入模型所需的物理量
    fn create(&self, storage: &mut Storage) -> SfResult<()> {
        let _ = storage;
        Ok(())
    }

    /// 步前初始化：对区间内粒子施加折减
    fn initialize(
        &self,
        storage: &mut Storage,
        range: Range<usize>,
        params: &MaterialParams,
    ) -> SfResult<()>;
}

/// 无流变（流体 / 尘埃），不做任何折减
#[derive(Debug, Default)]
pub struct NoRheology;

impl Rheology for NoRheology {
    fn initialize(
        &self,
        _storage: &mut Storage,
        _range: Range<usize>,
        _params: &MaterialParams,
    ) -> SfResult<()> {
        Ok(())
    }
}

/// von Mises 屈服
#[derive(Debug, Default)]
pub struct VonMisesRheology;

impl VonMisesRheology {
    #[allow(clippy::too_many_arguments)]
    fn apply(
        range: Range<usize>,
        params: &MaterialParams,
        u: &[f64],
        reducing: &mut [f64],
        p: &mut [f64],
        s: &mut [TracelessTensor3],
        damage: Option<&[f64]>,
    ) {
        const EPS: f64 = 1e-15;
        let limit = params.elasticity_limit;
        let u_melt = params.melt_energy;
        for i in range {
            let d = damage.map_or(0.0, |d| d[i].powi(3));
            // 仅折减负压（拉伸）
            if p[i] < 0.0 {
                p[i] *= 1.0 - d;
            }

            // 屈服应力随内能接近熔融线性衰减
            let unorm = u[i] / u_melt;
            let mut y = if unorm < 1e-5 {
                limit
            } else {
                limit * (1.0 - unorm).max(0.0)
            };
            y *= 1.0 - d;

            if y < EPS {
                reducing[i] = 0.0;
                s[i] = TracelessTensor3::ZERO;
                continue;
            }
            let j2 = 0.5 * s[i].ddot(&s[i].to_sym()) + EPS;
            let red = (y / (3.0 * j2).sqrt()).min(1.0);
            reducing[i] = red;
            s[i] = s[i] * red;
        }
    }
}

impl Rheology for VonMisesRheology {
    fn create(&self, storage: &mut Storage) -> SfResult<()> {
        storage.insert_uniform(QuantityId::StressReducing, OrderEnum::Zero, 1.0)
    }

    fn initialize(
        &self,
        storage: &mut Storage,
        range: Range<usize>,
        params: &MaterialParams,
    ) -> SfResult<()> {
        // 无强度物理量的存储（纯流体）不折减
        if !storage.has(QuantityId::DeviatoricStress) || !storage.has(QuantityId::Pressure) {
            return Ok(());
        }
        if storage.has(QuantityId::Damage) {
            let [u_q, red_q, p_q, s_q, d_q] = storage.get_many_mut([
                QuantityId::Energy,
                QuantityId::StressReducing,
                QuantityId::Pressure,
                QuantityId::DeviatoricStress,
                QuantityId::Damage,
            ])?;
            Self::apply(
                range,
                params,
                u_q.values()?,
                red_q.values_mut()?,
                p_q.values_mut()?,
                s_q.values_mut()?,
                Some(d_q.values()?),
            );
        } else {
            let [u_q, red_q, p_q, s_q] = storage.get_many_mut([
                QuantityId::Energy,
                QuantityId::StressReducing,
                QuantityId::Pressure,
                QuantityId::DeviatoricStress,
            ])?;
            Self::apply(
                range,
                params,
                u_q.values()?,
                red_q.values_mut()?,
                p_q.values_mut()?,
                s_q.values_mut()?,
                None,
            );
        }
        Ok(())
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec4;

    fn solid_storage(n: usize) -> Storage {
        let mut storage = Storage::new();
        storage
            .insert_values(
                QuantityId::Position,
                OrderEnum::Second,
                vec![DVec4::new(0.0, 0.0, 0.0, 1.0); n],
            )
            .unwrap();
        storage
            .insert_uniform(QuantityId::Energy, OrderEnum::First, 0.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::Pressure, OrderEnum::Zero, 0.0)
            .unwrap();
        storage
            .insert_uniform(
                QuantityId::DeviatoricStress,
                OrderEnum::First,
                TracelessTensor3::ZERO,
            )
            .unwrap();
        VonMisesRheology.create(&mut storage).unwrap();
        storage
    }

    fn params() -> MaterialParams {
        MaterialParams {
            rho0: 2700.0,
            shear_modulus: 2.27e10,
            bulk_modulus: 2.67e10,
            elasticity_limit: 3.5e9,
            melt_energy: 3.4e6,
            weibull_coefficient: 4.0e35,
            weibull_exponent: 9.0,
            seed: 0,
        }
    }

    #[test]
    fn test_small_stress_not_reduced() {
        let mut storage = solid_storage(1);
        storage.values_mut::<TracelessTensor3>(QuantityId::DeviatoricStress).unwrap()[0] =
            TracelessTensor3 {
                xx: 1e6,
                yy: -1e6,
                ..TracelessTensor3::ZERO
            };
        VonMisesRheology
            .initialize(&mut storage, 0..1, &params())
            .unwrap();
        let red = storage.values::<f64>(QuantityId::StressReducing).unwrap();
        assert_eq!(red[0], 1.0);
    }

    #[test]
    fn test_large_stress_reduced() {
        let mut storage = solid_storage(1);
        let big = TracelessTensor3 {
            xx: 1e10,
            yy: -1e10,
            ..TracelessTensor3::ZERO
        };
        storage.values_mut::<TracelessTensor3>(QuantityId::DeviatoricStress).unwrap()[0] = big;
        VonMisesRheology
            .initialize(&mut storage, 0..1, &params())
            .unwrap();
        let red = storage.values::<f64>(QuantityId::StressReducing).unwrap()[0];
        assert!(red > 0.0 && red < 1.0);
        let s = storage
            .values::<TracelessTensor3>(QuantityId::DeviatoricStress)
            .unwrap()[0];
        assert!((s.xx - big.xx * red).abs() < 1.0);
    }

    #[test]
    fn test_molten_material_loses_strength() {
        let mut storage = solid_storage(1);
        storage.values_mut::<f64>(QuantityId::Energy).unwrap()[0] = 1e8;
        storage.values_mut::<TracelessTensor3>(QuantityId::DeviatoricStress).unwrap()[0] =
            TracelessTensor3 {
                xx: 1e9,
                yy: -1e9,
                ..TracelessTensor3::ZERO
            };
        VonMisesRheology
            .initialize(&mut storage, 0..1, &params())
            .unwrap();
        assert_eq!(
            storage.values::<f64>(QuantityId::StressReducing).unwrap()[0],
            0.0
        );
        assert_eq!(
            storage
                .values::<TracelessTensor3>(QuantityId::DeviatoricStress)
                .unwrap()[0],
            TracelessTensor3::ZERO
        );
    }

    #[test]
    fn test_damaged_tension_reduced() {
        let mut storage = solid_storage(1);
        storage
            .insert_uniform(QuantityId::Damage, OrderEnum::First, 1.0)
            .unwrap();
        storage.values_mut::<f64>(QuantityId::Pressure).unwrap()[0] = -1e8;
        VonMisesRheology
            .initialize(&mut storage, 0..1, &params())
            .unwrap();
        // 完全破碎: 负压清零
        assert_eq!(storage.values::<f64>(QuantityId::Pressure).unwrap()[0], 0.0);
        assert_eq!(
            storage.values::<f64>(QuantityId::StressReducing).unwrap()[0],
            0.0
        );
    }
}
