// crates/sf_physics/src/equations/viscosity.rs

//! 人工粘性方程项
//!
//! 全部物理在 [`ArtificialViscosity`] 导数中完成，本项只负责
//! 按配置装配导数与所需物理量。

use sf_config::SolverConfig;
use sf_foundation::SfResult;
use sf_storage::{OrderEnum, QuantityId, Storage};

use crate::derivatives::{
    ArtificialViscosity, DerivativeHolder, VelocityDivergence, VelocityRotation,
};
use crate::equations::EquationTerm;

pub struct MonaghanViscosity;

impl EquationTerm for MonaghanViscosity {
    fn set_derivatives(
        &self,
        derivatives: &mut DerivativeHolder,
        config: &SolverConfig,
    ) -> SfResult<()> {
        derivatives.require(Box::new(ArtificialViscosity::new(
            config.av_alpha,
            config.av_beta,
            config.use_balsara,
            config.balsara_store,
        )))?;
        if config.use_balsara {
            // 开关消费上一步存储的散度与旋度
            derivatives.require(Box::new(VelocityDivergence::new(false)))?;
            derivatives.require(Box::new(VelocityRotation::new()))?;
        }
        Ok(())
    }

    fn create(&self, storage: &mut Storage) -> SfResult<()> {
        storage.insert_uniform(QuantityId::SoundSpeed, OrderEnum::Zero, 0.0)?;
        storage.insert_uniform(QuantityId::Energy, OrderEnum::First, 0.0)?;
        Ok(())
    }
}
