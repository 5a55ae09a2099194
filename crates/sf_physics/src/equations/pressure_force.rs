// crates/sf_physics/src/equations/pressure_force.rs

//! 压强力与能量方程
//!
//! 动量部分由 [`PressureGradient`] 在粒子循环中累加，
//! 内能方程 du/dt = -p/ρ ∇·v 在收尾阶段由存好的散度合成。

use sf_config::SolverConfig;
use sf_foundation::{Scheduler, SfResult};
use sf_storage::{OrderEnum, QuantityId, Storage};

use crate::derivatives::{DerivativeHolder, PressureGradient, VelocityDivergence};
use crate::equations::EquationTerm;

pub struct PressureForce;

impl EquationTerm for PressureForce {
    fn set_derivatives(
        &self,
        derivatives: &mut DerivativeHolder,
        config: &SolverConfig,
    ) -> SfResult<()> {
        derivatives.require(Box::new(PressureGradient::new(config.discretization)))?;
        derivatives.require(Box::new(VelocityDivergence::new(false)))?;
        Ok(())
    }

    fn create(&self, storage: &mut Storage) -> SfResult<()> {
        storage.insert_uniform(QuantityId::Pressure, OrderEnum::Zero, 0.0)?;
        storage.insert_uniform(QuantityId::SoundSpeed, OrderEnum::Zero, 0.0)?;
        storage.insert_uniform(QuantityId::Energy, OrderEnum::First, 0.0)?;
        Ok(())
    }

    fn finalize(&self, _scheduler: Scheduler, storage: &mut Storage, _t: f64) -> SfResult<()> {
        let [u_q, p_q, rho_q, divv_q] = storage.get_many_mut([
            QuantityId::Energy,
            QuantityId::Pressure,
            QuantityId::Density,
            QuantityId::VelocityDivergence,
        ])?;
        let du = u_q.dt_mut::<f64>()?;
        let p = p_q.values::<f64>()?;
        let rho = rho_q.values::<f64>()?;
        let divv = divv_q.values::<f64>()?;
        for i in 0..du.len() {
            du[i] -= p[i] / rho[i] * divv[i];
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

    #[test]
    fn test_compression_heats() {
        let mut storage = Storage::new();
        storage
            .insert_values(
                QuantityId::Position,
                OrderEnum::Second,
                vec![DVec4::new(0.0, 0.0, 0.0, 1.0); 3],
            )
            .unwrap();
        storage
            .insert_uniform(QuantityId::Mass, OrderEnum::Zero, 1.0)
            .unwrap();
        storage
            .insert_uniform(QuantityId::Density, OrderEnum::First, 1.0)
            .unwrap();
        let term = PressureForce;
        term.create(&mut storage).unwrap();
        storage
            .insert_uniform(QuantityId::VelocityDivergence, OrderEnum::Zero, 0.0)
            .unwrap();

        storage.values_mut::<f64>(QuantityId::Pressure).unwrap()[0] = 2.0;
        // 粒子 0 处于压缩 (∇·v < 0)
        storage
            .values_mut::<f64>(QuantityId::VelocityDivergence)
            .unwrap()[0] = -0.5;

        term.finalize(Scheduler::Sequential, &mut storage, 0.0)
            .unwrap();
        let du = storage.dt::<f64>(QuantityId::Energy).unwrap();
        // du = -p/ρ·divv = -2·(-0.5) = 1
        assert!((du[0] - 1.0).abs() < 1e-14);
        assert_eq!(du[1], 0.0);
    }
}
