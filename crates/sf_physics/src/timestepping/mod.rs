// crates/sf_physics/src/timestepping/mod.rs

//! 自适应时间步进
//!
//! 每步先用当前 dt 推进，再按判据重算下一步的 dt，
//! 并把时间步与限制方写入统计。

pub mod criteria;
pub mod integrators;

pub use criteria::{
    AccelerationCriterion, CourantCriterion, CriterionId, DerivativeCriterion, MultiCriterion,
    TimeStepCriterion,
};
pub use integrators::Integrator;

use log::trace;
use sf_config::{IntegratorChoice, TimestepConfig};
use sf_foundation::SfResult;
use sf_storage::Storage;

use crate::solver::AsymmetricSolver;
use crate::statistics::{Statistics, StatisticsId, StatsValue};

/// 时间步进器：积分器 + 判据组合 + 当前时间步
pub struct TimeStepping {
    integrator: Integrator,
    criteria: MultiCriterion,
    dt: f64,
    limiting: CriterionId,
}

impl TimeStepping {
    pub fn new(config: &TimestepConfig) -> TimeStepping {
        let integrator = match config.integrator {
            IntegratorChoice::EulerExplicit => Integrator::EulerExplicit,
            IntegratorChoice::PredictorCorrector => Integrator::PredictorCorrector,
            IntegratorChoice::LeapFrog => Integrator::LeapFrog,
        };
        TimeStepping {
            integrator,
            criteria: MultiCriterion::new(config),
            dt: config.initial_step,
            limiting: CriterionId::Initial,
        }
    }

    /// 当前时间步 [s]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// 上一步限制时间步的判据
    pub fn limiting(&self) -> CriterionId {
        self.limiting
    }

    /// 推进一步并更新时间步，返回本步使用的 dt
    pub fn step(
        &mut self,
        solver: &mut AsymmetricSolver,
        storage: &mut Storage,
        t: f64,
        stats: &mut Statistics,
    ) -> SfResult<f64> {
        let used = self.dt;
        self.integrator.advance(solver, storage, t, used, stats)?;

        let (next, limiting) = self.criteria.compute(storage)?;
        self.dt = next;
        self.limiting = limiting;
        trace!("dt = {next:.6e} ({limiting})");
        stats.set(StatisticsId::Timestep, StatsValue::Float(used));
        stats.set(
            StatisticsId::LimitingCriterion,
            StatsValue::Text(limiting.to_string()),
        );
        Ok(used)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::{ConstSmoothingLength, ConstantAcceleration, EquationHolder};
    use glam::{DVec3, DVec4};
    use sf_config::RunConfig;
    use sf_foundation::Scheduler;
    use sf_storage::{Material, OrderEnum, QuantityId};

    fn single_particle() -> Storage {
        let mut storage = Storage::new();
        storage
            .insert_values(
                QuantityId::Position,
                OrderEnum::Second,
                vec![DVec4::new(0.0, 0.0, 0.0, 1.0)],
            )
            .unwrap();
        storage
            .insert_uniform(QuantityId::Mass, OrderEnum::Zero, 1.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::Density, OrderEnum::First, 1.0)
            .unwrap();
        let material = Material::from_body_config(&sf_config::BodyConfig::default()).unwrap();
        storage.add_material(material, 0..1).unwrap();
        storage
    }

    #[test]
    fn test_step_updates_statistics() {
        let config = RunConfig::default();
        let equations = EquationHolder::new()
            .with(Box::new(ConstantAcceleration::new(DVec3::new(
                0.0, 0.0, -9.81,
            ))))
            .with(Box::new(ConstSmoothingLength));
        let mut solver =
            AsymmetricSolver::new(Scheduler::Sequential, &config, equations).unwrap();
        let mut storage = single_particle();
        solver.create(&mut storage).unwrap();

        let mut stepping = TimeStepping::new(&config.timestep);
        let mut stats = Statistics::new();
        let used = stepping
            .step(&mut solver, &mut storage, 0.0, &mut stats)
            .unwrap();
        assert_eq!(used, config.timestep.initial_step);
        assert_eq!(stats.get_f64_or(StatisticsId::Timestep, 0.0), used);
        assert!(stats.get(StatisticsId::LimitingCriterion).is_some());
        // 单粒子自由落体: 加速度判据生效后 dt 有限
        assert!(stepping.dt() > 0.0 && stepping.dt().is_finite());
    }
}
