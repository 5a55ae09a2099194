// crates/sf_physics/src/equations/damage.rs

//! Grady-Kipp 标量损伤模型
//!
//! 装配阶段按 Weibull 分布给每个粒子播种缺陷：第 j 个缺陷的
//! 激活应变 ε = (j / (kV))^(1/m)，随机落到区间内某个粒子上，
//! 直到所有粒子至少持有一个缺陷。演化阶段，最大主应力折算的
//! 应变超过激活阈值时损伤以裂纹扩展速率增长。
//!
//! 损伤对应力的折减在流变模型里完成，这里只负责 dD/dt。

use glam::{DVec3, DVec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sf_foundation::{Scheduler, SfResult, SymTensor3, TracelessTensor3};
use sf_storage::{MaterialParams, OrderEnum, QuantityId, Storage};

use crate::derivatives::DerivativeHolder;
use crate::equations::EquationTerm;
use sf_config::SolverConfig;

pub struct GradyKippDamage {
    /// 核支撑半径 κ（裂纹扩展距离尺度 κh）
    kernel_radius: f64,
}

/// 单材料区间的缺陷采样结果
struct Flaws {
    eps_min: Vec<f64>,
    flaw_cnt: Vec<f64>,
    exponent: Vec<f64>,
}

impl GradyKippDamage {
    /// 裂纹扩展速率与声速之比
    const GROWTH_FACTOR: f64 = 0.4;

    pub fn new(kernel_radius: f64) -> GradyKippDamage {
        GradyKippDamage { kernel_radius }
    }

    /// Weibull 缺陷播种
    fn sample_flaws(params: &MaterialParams, volumes: &[f64]) -> Flaws {
        let n = volumes.len();
        let total_volume: f64 = volumes.iter().sum();
        let k_v = params.weibull_coefficient * total_volume;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut eps_min = vec![0.0; n];
        let mut eps_max = vec![0.0; n];
        let mut cnt = vec![0u64; n];
        let mut assigned = 0usize;
        let mut flaw = 1u64;
        while assigned < n {
            let eps = (flaw as f64 / k_v).powf(1.0 / params.weibull_exponent);
            let idx = rng.gen_range(0..n);
            if cnt[idx] == 0 {
                assigned += 1;
                eps_min[idx] = eps;
            }
            eps_max[idx] = eps;
            cnt[idx] += 1;
            flaw += 1;
        }

        let exponent = (0..n)
            .map(|i| {
                if cnt[i] > 1 && eps_max[i] > eps_min[i] {
                    (cnt[i] as f64).ln() / (eps_max[i] / eps_min[i]).ln()
                } else {
                    1.0
                }
            })
            .collect();
        Flaws {
            eps_min,
            flaw_cnt: cnt.into_iter().map(|c| c as f64).collect(),
            exponent,
        }
    }

    fn damaged_materials(storage: &Storage) -> Vec<(std::ops::Range<usize>, MaterialParams)> {
        (0..storage.material_cnt())
            .filter_map(|k| {
                let entry = storage.material(k);
                entry
                    .material
                    .bounds(QuantityId::Damage)
                    .map(|_| (entry.range.clone(), entry.material.params))
            })
            .collect()
    }
}

impl EquationTerm for GradyKippDamage {
    fn set_derivatives(
        &self,
        _derivatives: &mut DerivativeHolder,
        _config: &SolverConfig,
    ) -> SfResult<()> {
        Ok(())
    }

    fn create(&self, storage: &mut Storage) -> SfResult<()> {
        let entries = Self::damaged_materials(storage);
        if entries.is_empty() {
            return Ok(());
        }
        storage.insert_uniform(QuantityId::Damage, OrderEnum::First, 0.0)?;
        storage.insert_uniform(QuantityId::EpsMin, OrderEnum::Zero, 0.0)?;
        storage.insert_uniform(QuantityId::FlawCount, OrderEnum::Zero, 0.0)?;
        storage.insert_uniform(QuantityId::FlawExponent, OrderEnum::Zero, 1.0)?;

        for (range, params) in entries {
            let volumes: Vec<f64> = {
                let m = storage.values::<f64>(QuantityId::Mass)?;
                let rho = storage.values::<f64>(QuantityId::Density)?;
                range.clone().map(|i| m[i] / rho[i]).collect()
            };
            let flaws = Self::sample_flaws(&params, &volumes);
            let start = range.start;
            storage.values_mut::<f64>(QuantityId::EpsMin)?[range.clone()]
                .copy_from_slice(&flaws.eps_min);
            storage.values_mut::<f64>(QuantityId::FlawCount)?[range.clone()]
                .copy_from_slice(&flaws.flaw_cnt);
            storage.values_mut::<f64>(QuantityId::FlawExponent)?
                [start..start + flaws.exponent.len()]
                .copy_from_slice(&flaws.exponent);
        }
        Ok(())
    }

    fn finalize(&self, _scheduler: Scheduler, storage: &mut Storage, _t: f64) -> SfResult<()> {
        let entries = Self::damaged_materials(storage);
        if entries.is_empty() {
            return Ok(());
        }

        let [d_q, p_q, s_q, cs_q, r_q, eps_q, cnt_q, m0_q] = storage.get_many_mut([
            QuantityId::Damage,
            QuantityId::Pressure,
            QuantityId::DeviatoricStress,
            QuantityId::SoundSpeed,
            QuantityId::Position,
            QuantityId::EpsMin,
            QuantityId::FlawCount,
            QuantityId::FlawExponent,
        ])?;
        let (d, dd) = d_q.value_and_highest_mut::<f64>()?;
        let p = p_q.values::<f64>()?;
        let s = s_q.values::<TracelessTensor3>()?;
        let cs = cs_q.values::<f64>()?;
        let r = r_q.values::<DVec4>()?;
        let eps_min = eps_q.values::<f64>()?;
        let flaw_cnt = cnt_q.values::<f64>()?;
        let m0 = m0_q.values::<f64>()?;

        for (range, params) in entries {
            let young = params.young_modulus();
            for i in range {
                dd[i] = 0.0;
                if d[i] >= 1.0 || eps_min[i] <= 0.0 {
                    continue;
                }
                // 总应力 σ = -p I + S（折减后）
                let sigma = s[i].to_sym()
                    + SymTensor3::new(DVec3::splat(-p[i]), DVec3::ZERO);
                let strain = sigma.max_principal() / young;
                if strain <= eps_min[i] {
                    continue;
                }
                let active = (strain / eps_min[i]).powf(m0[i]).min(flaw_cnt[i]);
                let growth =
                    Self::GROWTH_FACTOR * cs[i] / (self.kernel_radius * r[i].w);
                dd[i] = growth * active.cbrt();
            }
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
    use sf_config::BodyConfig;
    use sf_storage::Material;

    fn damage_storage(n: usize) -> Storage {
        let mut storage = Storage::new();
        storage
            .insert_values(
                QuantityId::Position,
                OrderEnum::Second,
                vec![DVec4::new(0.0, 0.0, 0.0, 0.1); n],
            )
            .unwrap();
        storage
            .insert_uniform(QuantityId::Mass, OrderEnum::Zero, 1.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::Density, OrderEnum::First, 2700.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::Pressure, OrderEnum::Zero, 0.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::SoundSpeed, OrderEnum::Zero, 3000.0)
            .unwrap();
        storage
            .insert_uniform(
                QuantityId::DeviatoricStress,
                OrderEnum::First,
                TracelessTensor3::ZERO,
            )
            .unwrap();
        let config = BodyConfig {
            use_damage: true,
            ..BodyConfig::default()
        };
        let material = Material::from_body_config(&config).unwrap();
        storage.add_material(material, 0..n).unwrap();
        storage
    }

    #[test]
    fn test_flaw_sampling_covers_all_particles() {
        let params = Material::from_body_config(&BodyConfig {
            use_damage: true,
            ..BodyConfig::default()
        })
        .unwrap()
        .params;
        let volumes = vec![1e-3; 100];
        let flaws = GradyKippDamage::sample_flaws(&params, &volumes);
        assert!(flaws.eps_min.iter().all(|&e| e > 0.0));
        assert!(flaws.flaw_cnt.iter().all(|&c| c >= 1.0));
        assert!(flaws.exponent.iter().all(|&m| m > 0.0));

        // 相同种子可复现
        let again = GradyKippDamage::sample_flaws(&params, &volumes);
        assert_eq!(flaws.eps_min, again.eps_min);
    }

    #[test]
    fn test_create_seeds_flaws() {
        let mut storage = damage_storage(50);
        let term = GradyKippDamage::new(2.0);
        term.create(&mut storage).unwrap();
        assert!(storage.has(QuantityId::Damage));
        let eps = storage.values::<f64>(QuantityId::EpsMin).unwrap();
        assert!(eps.iter().all(|&e| e > 0.0));
    }

    #[test]
    fn test_tension_above_threshold_grows_damage() {
        let mut storage = damage_storage(10);
        let term = GradyKippDamage::new(2.0);
        term.create(&mut storage).unwrap();
        // 强拉伸（负压）
        storage
            .values_mut::<f64>(QuantityId::Pressure)
            .unwrap()
            .fill(-1e10);
        term.finalize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        let dd = storage.dt::<f64>(QuantityId::Damage).unwrap();
        assert!(dd.iter().all(|&x| x > 0.0));
        // 压缩不增长
        storage
            .values_mut::<f64>(QuantityId::Pressure)
            .unwrap()
            .fill(1e10);
        term.finalize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        let dd = storage.dt::<f64>(QuantityId::Damage).unwrap();
        assert!(dd.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_fully_damaged_stops_growing() {
        let mut storage = damage_storage(5);
        let term = GradyKippDamage::new(2.0);
        term.create(&mut storage).unwrap();
        storage.values_mut::<f64>(QuantityId::Damage).unwrap().fill(1.0);
        storage
            .values_mut::<f64>(QuantityId::Pressure)
            .unwrap()
            .fill(-1e10);
        term.finalize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        let dd = storage.dt::<f64>(QuantityId::Damage).unwrap();
        assert!(dd.iter().all(|&x| x == 0.0));
    }
}
