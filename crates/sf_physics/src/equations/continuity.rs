// crates/sf_physics/src/equations/continuity.rs

//! 连续性方程 dρ/dt = -ρ ∇·v
//!
//! 固体变体对完好粒子改用速度梯度的迹：梯度只计同体未破碎
//! 的粒子对，避免跨裂缝的虚假密度变化；完全破碎的粒子退回
//! 普通散度。

use sf_config::{ContinuityChoice, SolverConfig};
use sf_foundation::{Scheduler, SfResult, SymTensor3};
use sf_storage::{OrderEnum, QuantityId, Storage};

use crate::derivatives::{DerivativeHolder, VelocityDivergence, VelocityGradient};
use crate::equations::EquationTerm;

pub struct ContinuityEquation {
    variant: ContinuityChoice,
}

impl ContinuityEquation {
    pub fn new(variant: ContinuityChoice) -> ContinuityEquation {
        ContinuityEquation { variant }
    }
}

impl EquationTerm for ContinuityEquation {
    fn set_derivatives(
        &self,
        derivatives: &mut DerivativeHolder,
        config: &SolverConfig,
    ) -> SfResult<()> {
        derivatives.require(Box::new(VelocityDivergence::new(false)))?;
        if self.variant == ContinuityChoice::Solid {
            derivatives.require(Box::new(VelocityGradient::new(
                config.use_correction_tensor,
            )))?;
        }
        Ok(())
    }

    fn create(&self, storage: &mut Storage) -> SfResult<()> {
        storage.insert_uniform(QuantityId::Density, OrderEnum::First, 0.0)?;
        Ok(())
    }

    fn finalize(&self, _scheduler: Scheduler, storage: &mut Storage, _t: f64) -> SfResult<()> {
        match self.variant {
            ContinuityChoice::Standard => {
                let [rho_q, divv_q] = storage
                    .get_many_mut([QuantityId::Density, QuantityId::VelocityDivergence])?;
                let (rho, drho) = rho_q.value_and_highest_mut::<f64>()?;
                let divv = divv_q.values::<f64>()?;
                for i in 0..rho.len() {
                    drho[i] = -rho[i] * divv[i];
                }
            }
            ContinuityChoice::Solid => {
                let [rho_q, divv_q, gradv_q, reduce_q] = storage.get_many_mut([
                    QuantityId::Density,
                    QuantityId::VelocityDivergence,
                    QuantityId::VelocityGradient,
                    QuantityId::StressReducing,
                ])?;
                let (rho, drho) = rho_q.value_and_highest_mut::<f64>()?;
                let divv = divv_q.values::<f64>()?;
                let gradv = gradv_q.values::<SymTensor3>()?;
                let reduce = reduce_q.values::<f64>()?;
                for i in 0..rho.len() {
                    let rate = if reduce[i] > 0.0 {
                        gradv[i].trace()
                    } else {
                        divv[i]
                    };
                    drho[i] = -rho[i] * rate;
                }
            }
        }
        Ok(())
    }
}

// ============================================================
// 测试
// ============================================================
