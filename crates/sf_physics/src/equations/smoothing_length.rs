// crates/sf_physics/src/equations/smoothing_length.rs

//! 光滑长度策略
//!
//! 光滑长度存放在位置向量的 w 分量，它的时间导数就是
//! 速度向量的 w 分量。自适应策略令 h 随局部膨胀率演化
//! dh/dt = h/3 ∇·v，邻居数离开目标区间时叠加随偏差指数
//! 增长的修正项，并在每步开始把 h 钳到配置下限。

use sf_config::{SmoothingConfig, SolverConfig};
use sf_foundation::{Scheduler, SfResult};
use sf_storage::{QuantityId, Storage};

use crate::derivatives::{DerivativeHolder, VelocityDivergence};
use crate::equations::EquationTerm;

pub struct AdaptiveSmoothingLength {
    neighbour_min: f64,
    neighbour_max: f64,
    strength: f64,
    h_min: f64,
}

impl AdaptiveSmoothingLength {
    pub fn new(config: &SmoothingConfig) -> AdaptiveSmoothingLength {
        AdaptiveSmoothingLength {
            neighbour_min: config.neighbour_min,
            neighbour_max: config.neighbour_max,
            strength: config.enforcing_strength,
            h_min: config.h_min,
        }
    }
}

impl EquationTerm for AdaptiveSmoothingLength {
    fn set_derivatives(
        &self,
        derivatives: &mut DerivativeHolder,
        _config: &SolverConfig,
    ) -> SfResult<()> {
        derivatives.require(Box::new(VelocityDivergence::new(false)))?;
        Ok(())
    }

    fn create(&self, _storage: &mut Storage) -> SfResult<()> {
        Ok(())
    }

    fn initialize(&self, _scheduler: Scheduler, storage: &mut Storage, _t: f64) -> SfResult<()> {
        // 进入邻居搜索前把光滑长度钳到下限
        for r in storage.values_mut::<glam::DVec4>(QuantityId::Position)? {
            if r.w < self.h_min {
                r.w = self.h_min;
            }
        }
        Ok(())
    }

    fn finalize(&self, _scheduler: Scheduler, storage: &mut Storage, _t: f64) -> SfResult<()> {
        let [r_q, cs_q, n_q, divv_q] = storage.get_many_mut([
            QuantityId::Position,
            QuantityId::SoundSpeed,
            QuantityId::NeighbourCnt,
            QuantityId::VelocityDivergence,
        ])?;
        // h 作为一阶量演化, 不保留二阶导数
        for dv in r_q.d2t_mut::<glam::DVec4>()? {
            dv.w = 0.0;
        }
        let (r, v) = r_q.value_and_dt_mut::<glam::DVec4>()?;
        let cs = cs_q.values::<f64>()?;
        let n = n_q.values::<u64>()?;
        let divv = divv_q.values::<f64>()?;

        for i in 0..r.len() {
            // 贴近下限的粒子不再跟随散度收缩
            let mut dh = if r[i].w > 2.0 * self.h_min {
                r[i].w / 3.0 * divv[i]
            } else {
                0.0
            };
            // 修正项随偏差指数增长, 以声速定标
            let n_i = n[i] as f64;
            if n_i < self.neighbour_min {
                dh += (self.strength * (self.neighbour_min - n_i)).exp() * cs[i];
            } else if n_i > self.neighbour_max {
                dh -= (self.strength * (n_i - self.neighbour_max)).exp() * cs[i];
            }
            v[i].w = dh;
        }
        Ok(())
    }

    fn controls_smoothing(&self) -> bool {
        true
    }
}

/// 固定光滑长度：w 分量的导数恒为零
pub struct ConstSmoothingLength;

impl EquationTerm for ConstSmoothingLength {
    fn set_derivatives(
        &self,
        _derivatives: &mut DerivativeHolder,
        _config: &SolverConfig,
    ) -> SfResult<()> {
        Ok(())
    }

    fn create(&self, _storage: &mut Storage) -> SfResult<()> {
        Ok(())
    }

    fn finalize(&self, _scheduler: Scheduler, storage: &mut Storage, _t: f64) -> SfResult<()> {
        let position = storage.get_mut(QuantityId::Position)?;
        for v in position.dt_mut::<glam::DVec4>()? {
            v.w = 0.0;
        }
        for dv in position.d2t_mut::<glam::DVec4>()? {
            dv.w = 0.0;
        }
        Ok(())
    }

    fn controls_smoothing(&self) -> bool {
        true
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec4;
    use sf_storage::OrderEnum;

    fn smoothing_storage(neighbour_cnt: u64, divv: f64) -> Storage {
        let mut storage = Storage::new();
        storage
            .insert_values(
                QuantityId::Position,
                OrderEnum::Second,
                vec![DVec4::new(0.0, 0.0, 0.0, 2.0); 1],
            )
            .unwrap();
        storage
            .insert_uniform(QuantityId::SoundSpeed, OrderEnum::Zero, 10.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::NeighbourCnt, OrderEnum::Zero, neighbour_cnt)
            .unwrap();
        storage
            .insert_uniform(QuantityId::VelocityDivergence, OrderEnum::Zero, divv)
            .unwrap();
        storage
    }

    #[test]
    fn test_dh_follows_divergence() {
        // 邻居数在区间内: dh/dt = h/3·∇·v
        let mut storage = smoothing_storage(50, 0.3);
        let term = AdaptiveSmoothingLength::new(&SmoothingConfig::default());
        term.finalize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        let v = storage.dt::<DVec4>(QuantityId::Position).unwrap();
        assert!((v[0].w - 2.0 / 3.0 * 0.3).abs() < 1e-14);
    }

    #[test]
    fn test_too_few_neighbours_grow_h() {
        let mut storage = smoothing_storage(5, 0.0);
        let term = AdaptiveSmoothingLength::new(&SmoothingConfig::default());
        term.finalize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        let v = storage.dt::<DVec4>(QuantityId::Position).unwrap();
        assert!(v[0].w > 0.0);
    }

    #[test]
    fn test_too_many_neighbours_shrink_h() {
        let mut storage = smoothing_storage(300, 0.0);
        let term = AdaptiveSmoothingLength::new(&SmoothingConfig::default());
        term.finalize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        let v = storage.dt::<DVec4>(QuantityId::Position).unwrap();
        assert!(v[0].w < 0.0);
    }

    #[test]
    fn test_enforcement_grows_exponentially() {
        // 偏差每多 5 个邻居, 修正项放大 exp(strength·5) 倍
        let config = SmoothingConfig::default();
        let term = AdaptiveSmoothingLength::new(&config);
        let dh = |cnt: u64| {
            let mut storage = smoothing_storage(cnt, 0.0);
            term.finalize(Scheduler::Sequential, &mut storage, 0.0)
                .unwrap();
            storage.dt::<DVec4>(QuantityId::Position).unwrap()[0].w
        };
        let ratio = dh(10) / dh(15);
        assert!((ratio - (config.enforcing_strength * 5.0).exp()).abs() < 1e-10);
    }

    #[test]
    fn test_initialize_clamps_h_to_floor() {
        let mut storage = smoothing_storage(50, 0.0);
        storage.values_mut::<DVec4>(QuantityId::Position).unwrap()[0].w = -0.02;
        let config = SmoothingConfig::default();
        let term = AdaptiveSmoothingLength::new(&config);
        term.initialize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        let r = storage.values::<DVec4>(QuantityId::Position).unwrap();
        assert_eq!(r[0].w, config.h_min);

        // 贴近下限时不再跟随收缩散度
        let mut storage = smoothing_storage(50, -5.0);
        storage.values_mut::<DVec4>(QuantityId::Position).unwrap()[0].w = config.h_min;
        term.finalize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        assert_eq!(storage.dt::<DVec4>(QuantityId::Position).unwrap()[0].w, 0.0);
    }

    #[test]
    fn test_const_policy_zeroes_w() {
        let mut storage = smoothing_storage(50, 0.5);
        storage.dt_mut::<DVec4>(QuantityId::Position).unwrap()[0].w = 1.0;
        storage.d2t_mut::<DVec4>(QuantityId::Position).unwrap()[0].w = -1.0;
        ConstSmoothingLength
            .finalize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        assert_eq!(storage.dt::<DVec4>(QuantityId::Position).unwrap()[0].w, 0.0);
        assert_eq!(storage.d2t::<DVec4>(QuantityId::Position).unwrap()[0].w, 0.0);
    }
}
