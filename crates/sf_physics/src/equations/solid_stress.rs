// crates/sf_physics/src/equations/solid_stress.rs

//! 偏应力演化与弹性力
//!
//! Hooke 弹性：dS/dt = 2μ (ε̇ - tr(ε̇)/3 I)，ε̇ 为应变率
//! （速度梯度的对称部分）。动量贡献由 [`StressDivergence`]
//! 在粒子循环中累加，应力做功进入内能。

use sf_config::SolverConfig;
use sf_foundation::{Scheduler, SfResult, SymTensor3, TracelessTensor3};
use sf_storage::{OrderEnum, QuantityId, Storage};

use crate::derivatives::{
    CorrectionTensor, DerivativeHolder, StressDivergence, VelocityGradient,
};
use crate::equations::EquationTerm;

pub struct SolidStressForce;

impl EquationTerm for SolidStressForce {
    fn set_derivatives(
        &self,
        derivatives: &mut DerivativeHolder,
        config: &SolverConfig,
    ) -> SfResult<()> {
        derivatives.require(Box::new(StressDivergence::new(config.discretization)))?;
        derivatives.require(Box::new(VelocityGradient::new(config.use_correction_tensor)))?;
        if config.use_correction_tensor {
            derivatives.require(Box::new(CorrectionTensor::new()))?;
        }
        Ok(())
    }

    fn create(&self, storage: &mut Storage) -> SfResult<()> {
        storage.insert_uniform(
            QuantityId::DeviatoricStress,
            OrderEnum::First,
            TracelessTensor3::ZERO,
        )?;
        storage.insert_uniform(QuantityId::StressReducing, OrderEnum::Zero, 1.0)?;
        storage.insert_uniform(QuantityId::Flag, OrderEnum::Zero, 0u64)?;
        storage.insert_uniform(QuantityId::Energy, OrderEnum::First, 0.0)?;
        Ok(())
    }

    fn finalize(&self, _scheduler: Scheduler, storage: &mut Storage, _t: f64) -> SfResult<()> {
        let entries: Vec<_> = (0..storage.material_cnt())
            .map(|k| {
                let entry = storage.material(k);
                (entry.range.clone(), entry.material.params.shear_modulus)
            })
            .collect();

        let [s_q, u_q, rho_q, gradv_q] = storage.get_many_mut([
            QuantityId::DeviatoricStress,
            QuantityId::Energy,
            QuantityId::Density,
            QuantityId::VelocityGradient,
        ])?;
        let (s, ds) = s_q.value_and_highest_mut::<TracelessTensor3>()?;
        let du = u_q.dt_mut::<f64>()?;
        let rho = rho_q.values::<f64>()?;
        let gradv = gradv_q.values::<SymTensor3>()?;

        for (range, mu) in entries {
            for i in range {
                ds[i] += gradv[i].deviatoric() * (2.0 * mu);
                // 应力做功（应力已含屈服与损伤折减）
                du[i] += s[i].ddot(&gradv[i]) / rho[i];
            }
        }
        Ok(())
    }
}

// ============================================================
// 测试
// ============================================================
