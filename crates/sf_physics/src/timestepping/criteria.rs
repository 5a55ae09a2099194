// crates/sf_physics/src/timestepping/criteria.rs

//! 时间步判据
//!
//! 每个判据给出当前状态允许的最大时间步，步进器取全体判据
//! 与上限的最小值。缺少所需物理量的判据不施加约束。

use glam::DVec4;
use sf_config::TimestepConfig;
use sf_foundation::SfResult;
use sf_storage::{OrderEnum, QuantityId, Storage, ValueKind};

/// 判据标识（统计与日志用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionId {
    /// 声速判据 C·h/cs
    Courant,
    /// 加速度判据 √(h/|dv/dt|)
    Acceleration,
    /// 物理量相对变化率判据
    Derivative,
    /// 配置的时间步上限
    Maximal,
    /// 初始时间步
    Initial,
}

impl std::fmt::Display for CriterionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CriterionId::Courant => "courant",
            CriterionId::Acceleration => "acceleration",
            CriterionId::Derivative => "derivative",
            CriterionId::Maximal => "maximal",
            CriterionId::Initial => "initial",
        };
        f.write_str(name)
    }
}

/// 单个判据
pub trait TimeStepCriterion: Send + Sync {
    fn id(&self) -> CriterionId;

    /// 允许的最大时间步；不适用时返回 None
    fn compute(&self, storage: &Storage) -> SfResult<Option<f64>>;
}

/// Courant 判据：dt ≤ C·h/cs
pub struct CourantCriterion {
    courant: f64,
}

impl CourantCriterion {
    pub fn new(courant: f64) -> CourantCriterion {
        CourantCriterion { courant }
    }
}

impl TimeStepCriterion for CourantCriterion {
    fn id(&self) -> CriterionId {
        CriterionId::Courant
    }

    fn compute(&self, storage: &Storage) -> SfResult<Option<f64>> {
        if !storage.has(QuantityId::SoundSpeed) {
            return Ok(None);
        }
        let r = storage.values::<DVec4>(QuantityId::Position)?;
        let cs = storage.values::<f64>(QuantityId::SoundSpeed)?;
        let mut limit = f64::INFINITY;
        for i in 0..r.len() {
            if cs[i] > 0.0 {
                limit = limit.min(self.courant * r[i].w / cs[i]);
            }
        }
        Ok(limit.is_finite().then_some(limit))
    }
}

/// 加速度判据：dt ≤ √(h/|dv/dt|)
pub struct AccelerationCriterion;

impl TimeStepCriterion for AccelerationCriterion {
    fn id(&self) -> CriterionId {
        CriterionId::Acceleration
    }

    fn compute(&self, storage: &Storage) -> SfResult<Option<f64>> {
        let position = storage.get(QuantityId::Position)?;
        if position.order() < OrderEnum::Second {
            return Ok(None);
        }
        let r = position.values::<DVec4>()?;
        let dv = position.d2t::<DVec4>()?;
        let mut limit = f64::INFINITY;
        for i in 0..r.len() {
            let a = dv[i].truncate().length();
            if a > 0.0 {
                limit = limit.min((r[i].w / a).sqrt());
            }
        }
        Ok(limit.is_finite().then_some(limit))
    }
}

/// 导数判据：dt ≤ k·(|v| + 最小刻度)/|dv/dt|
///
/// 作用于材料声明了取值范围的标量物理量（密度、内能、损伤），
/// 防止单步内出现量级跳变。
pub struct DerivativeCriterion {
    factor: f64,
}

impl DerivativeCriterion {
    pub fn new(factor: f64) -> DerivativeCriterion {
        DerivativeCriterion { factor }
    }
}

impl TimeStepCriterion for DerivativeCriterion {
    fn id(&self) -> CriterionId {
        CriterionId::Derivative
    }

    fn compute(&self, storage: &Storage) -> SfResult<Option<f64>> {
        let mut limit = f64::INFINITY;
        for k in 0..storage.material_cnt() {
            let entry = storage.material(k);
            let range = entry.range.clone();
            for (id, bounds) in entry.material.iter_bounds() {
                if !storage.has(id) {
                    continue;
                }
                let q = storage.get(id)?;
                if q.order() < OrderEnum::First || q.kind() != ValueKind::Scalar {
                    continue;
                }
                let v = q.values::<f64>()?;
                let dv = q.dt::<f64>()?;
                for i in range.clone() {
                    if dv[i] != 0.0 {
                        limit = limit
                            .min(self.factor * (v[i].abs() + bounds.min_scale) / dv[i].abs());
                    }
                }
            }
        }
        Ok(limit.is_finite().then_some(limit))
    }
}

/// 判据组合：全体最小值，封顶 max_step
pub struct MultiCriterion {
    criteria: Vec<Box<dyn TimeStepCriterion>>,
    max_step: f64,
}

impl MultiCriterion {
    pub fn new(config: &TimestepConfig) -> MultiCriterion {
        let mut criteria: Vec<Box<dyn TimeStepCriterion>> = Vec::new();
        if config.use_courant_criterion {
            criteria.push(Box::new(CourantCriterion::new(config.courant)));
        }
        if config.use_acceleration_criterion {
            criteria.push(Box::new(AccelerationCriterion));
        }
        if config.use_derivative_criterion {
            criteria.push(Box::new(DerivativeCriterion::new(config.derivative_factor)));
        }
        MultiCriterion {
            criteria,
            max_step: config.max_step,
        }
    }

    /// 允许的时间步与限制方
    pub fn compute(&self, storage: &Storage) -> SfResult<(f64, CriterionId)> {
        let mut best = (self.max_step, CriterionId::Maximal);
        for criterion in &self.criteria {
            if let Some(limit) = criterion.compute(storage)? {
                if limit < best.0 {
                    best = (limit, criterion.id());
                }
            }
        }
        Ok(best)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with_cs(h: f64, cs: f64) -> Storage {
        let mut storage = Storage::new();
        storage
            .insert_values(
                QuantityId::Position,
                OrderEnum::Second,
                vec![DVec4::new(0.0, 0.0, 0.0, h); 4],
            )
            .unwrap();
        storage
            .insert_uniform(QuantityId::SoundSpeed, OrderEnum::Zero, cs)
            .unwrap();
        storage
    }

    #[test]
    fn test_courant_value() {
        // cs=1, h=0.1, C=0.3 -> dt = 0.03
        let storage = storage_with_cs(0.1, 1.0);
        let criterion = CourantCriterion::new(0.3);
        let dt = criterion.compute(&storage).unwrap().unwrap();
        assert!((dt - 0.03).abs() < 1e-14);
    }

    #[test]
    fn test_courant_ignores_zero_cs() {
        let storage = storage_with_cs(0.1, 0.0);
        let criterion = CourantCriterion::new(0.3);
        assert!(criterion.compute(&storage).unwrap().is_none());
    }

    #[test]
    fn test_acceleration_scaling() {
        let mut storage = storage_with_cs(0.4, 0.0);
        storage.d2t_mut::<DVec4>(QuantityId::Position).unwrap()[2] =
            DVec4::new(0.0, 0.0, -10.0, 0.0);
        let dt = AccelerationCriterion
            .compute(&storage)
            .unwrap()
            .unwrap();
        assert!((dt - (0.4_f64 / 10.0).sqrt()).abs() < 1e-14);
    }

    #[test]
    fn test_multi_takes_minimum() {
        let mut config = TimestepConfig::default();
        config.courant = 0.3;
        config.max_step = 10.0;
        let storage = storage_with_cs(0.1, 1.0);
        let multi = MultiCriterion::new(&config);
        let (dt, id) = multi.compute(&storage).unwrap();
        assert!((dt - 0.03).abs() < 1e-14);
        assert_eq!(id, CriterionId::Courant);
    }

    #[test]
    fn test_max_step_fallback() {
        let config = TimestepConfig {
            max_step: 0.5,
            ..TimestepConfig::default()
        };
        // 无声速无加速度: 上限生效
        let storage = storage_with_cs(0.1, 0.0);
        let multi = MultiCriterion::new(&config);
        let (dt, id) = multi.compute(&storage).unwrap();
        assert_eq!(dt, 0.5);
        assert_eq!(id, CriterionId::Maximal);
    }
}
