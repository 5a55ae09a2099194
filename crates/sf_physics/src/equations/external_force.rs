// crates/sf_physics/src/equations/external_force.rs

//! 均匀外力场（重力等）

use glam::{DVec3, DVec4};
use sf_config::SolverConfig;
use sf_foundation::{Scheduler, SfResult};
use sf_storage::{QuantityId, Storage};

use crate::derivatives::DerivativeHolder;
use crate::equations::EquationTerm;

pub struct ConstantAcceleration {
    g: DVec3,
}

impl ConstantAcceleration {
    pub fn new(g: DVec3) -> ConstantAcceleration {
        ConstantAcceleration { g }
    }
}

impl EquationTerm for ConstantAcceleration {
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
        let g = self.g.extend(0.0);
        for dv in storage.d2t_mut::<DVec4>(QuantityId::Position)? {
            *dv += g;
        }
        Ok(())
    }
}
