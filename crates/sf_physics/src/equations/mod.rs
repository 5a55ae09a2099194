// crates/sf_physics/src/equations/mod.rs

//! 方程项
//!
//! 每个方程项声明自己需要的空间导数与物理量，并在粒子循环
//! 前后执行初始化与收尾。求解器只负责把导数喂给累加器，
//! 物理语义全部在方程项中。

pub mod continuity;
pub mod damage;
pub mod external_force;
pub mod pressure_force;
pub mod smoothing_length;
pub mod solid_stress;
pub mod viscosity;

use sf_config::SolverConfig;
use sf_foundation::{Scheduler, SfResult};
use sf_storage::Storage;

use crate::derivatives::DerivativeHolder;

pub use continuity::ContinuityEquation;
pub use damage::GradyKippDamage;
pub use external_force::ConstantAcceleration;
pub use pressure_force::PressureForce;
pub use smoothing_length::{AdaptiveSmoothingLength, ConstSmoothingLength};
pub use solid_stress::SolidStressForce;
pub use viscosity::MonaghanViscosity;

/// 单个方程项
pub trait EquationTerm: Send + Sync {
    /// 向导数集合申报所需导数
    fn set_derivatives(
        &self,
        derivatives: &mut DerivativeHolder,
        config: &SolverConfig,
    ) -> SfResult<()>;

    /// 装配阶段：插入所需物理量
    fn create(&self, storage: &mut Storage) -> SfResult<()>;

    /// 粒子循环前的准备
    fn initialize(&self, _scheduler: Scheduler, _storage: &mut Storage, _t: f64) -> SfResult<()> {
        Ok(())
    }

    /// 粒子循环后的收尾（合成最终导数）
    fn finalize(&self, _scheduler: Scheduler, _storage: &mut Storage, _t: f64) -> SfResult<()> {
        Ok(())
    }

    /// 是否为光滑长度演化策略（求解器要求恰好一个）
    fn controls_smoothing(&self) -> bool {
        false
    }
}

/// 方程项集合
#[derive(Default)]
pub struct EquationHolder {
    terms: Vec<Box<dyn EquationTerm>>,
}

impl EquationHolder {
    pub fn new() -> EquationHolder {
        EquationHolder::default()
    }

    pub fn push(&mut self, term: Box<dyn EquationTerm>) {
        self.terms.push(term);
    }

    pub fn with(mut self, term: Box<dyn EquationTerm>) -> EquationHolder {
        self.push(term);
        self
    }

    pub fn term_cnt(&self) -> usize {
        self.terms.len()
    }

    /// 光滑长度策略项的数量
    pub fn smoothing_policy_cnt(&self) -> usize {
        self.terms.iter().filter(|t| t.controls_smoothing()).count()
    }

    pub fn set_derivatives(
        &self,
        derivatives: &mut DerivativeHolder,
        config: &SolverConfig,
    ) -> SfResult<()> {
        for term in &self.terms {
            term.set_derivatives(derivatives, config)?;
        }
        Ok(())
    }

    pub fn create(&self, storage: &mut Storage) -> SfResult<()> {
        for term in &self.terms {
            term.create(storage)?;
        }
        Ok(())
    }

    pub fn initialize(&self, scheduler: Scheduler, storage: &mut Storage, t: f64) -> SfResult<()> {
        for term in &self.terms {
            term.initialize(scheduler, storage, t)?;
        }
        Ok(())
    }

    pub fn finalize(&self, scheduler: Scheduler, storage: &mut Storage, t: f64) -> SfResult<()> {
        for term in &self.terms {
            term.finalize(scheduler, storage, t)?;
        }
        Ok(())
    }
}
