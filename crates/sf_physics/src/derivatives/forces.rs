// crates/sf_physics/src/derivatives/forces.rs

//! 动量方程的压强与偏应力贡献

use glam::DVec4;
use sf_config::DiscretizationChoice;
use sf_foundation::{SfResult, TracelessTensor3};
use sf_storage::{OrderEnum, QuantityId};

use crate::accumulated::{Accumulated, BufferCategory};
use crate::derivatives::{Derivative, DerivativeKey, DerivativeKind, StorageView};

/// 压强梯度 dv/dt -= Σⱼ mⱼ f(pᵢ,pⱼ,ρᵢ,ρⱼ) ∇W
pub struct PressureGradient {
    discretization: DiscretizationChoice,
    dv_idx: usize,
}

impl PressureGradient {
    pub fn new(discretization: DiscretizationChoice) -> PressureGradient {
        PressureGradient {
            discretization,
            dv_idx: 0,
        }
    }
}

impl Derivative for PressureGradient {
    fn key(&self) -> DerivativeKey {
        DerivativeKey::new(DerivativeKind::PressureGradient, self.discretization as u32)
    }

    fn create(&mut self, acc: &mut Accumulated) -> SfResult<()> {
        self.dv_idx = acc.insert::<DVec4>(
            QuantityId::Position,
            OrderEnum::Second,
            BufferCategory::Shared,
        )?;
        Ok(())
    }

    fn eval(
        &self,
        input: &StorageView<'_>,
        i: usize,
        neighs: &[usize],
        grads: &[DVec4],
        acc: &mut Accumulated,
    ) {
        let Some(p) = input.p else {
            return;
        };
        let mut sum = DVec4::ZERO;
        for (&j, &grad) in neighs.iter().zip(grads) {
            let f = match self.discretization {
                DiscretizationChoice::Standard => {
                    p[i] / (input.rho[i] * input.rho[i]) + p[j] / (input.rho[j] * input.rho[j])
                }
                DiscretizationChoice::BenzAsphaug => {
                    (p[i] + p[j]) / (input.rho[i] * input.rho[j])
                }
            };
            sum -= grad * (input.m[j] * f);
        }
        acc.slice_mut::<DVec4>(self.dv_idx)[i] += sum;
    }
}

/// 偏应力散度 dv/dt += Σⱼ mⱼ (Sᵢ/ρᵢ² + Sⱼ/ρⱼ²)·∇W
///
/// 只作用于同体且未完全破碎的粒子对。
pub struct StressDivergence {
    discretization: DiscretizationChoice,
    dv_idx: usize,
}

impl StressDivergence {
    pub fn new(discretization: DiscretizationChoice) -> StressDivergence {
        StressDivergence {
            discretization,
            dv_idx: 0,
        }
    }
}

impl Derivative for StressDivergence {
    fn key(&self) -> DerivativeKey {
        DerivativeKey::new(DerivativeKind::StressDivergence, self.discretization as u32)
    }

    fn create(&mut self, acc: &mut Accumulated) -> SfResult<()> {
        self.dv_idx = acc.insert::<DVec4>(
            QuantityId::Position,
            OrderEnum::Second,
            BufferCategory::Shared,
        )?;
        Ok(())
    }

    fn eval(
        &self,
        input: &StorageView<'_>,
        i: usize,
        neighs: &[usize],
        grads: &[DVec4],
        acc: &mut Accumulated,
    ) {
        let Some(s) = input.s else {
            return;
        };
        let mut sum = DVec4::ZERO;
        for (&j, &grad) in neighs.iter().zip(grads) {
            if !input.bonded(i, j) {
                continue;
            }
            let t: TracelessTensor3 = match self.discretization {
                DiscretizationChoice::Standard => {
                    s[i] * (1.0 / (input.rho[i] * input.rho[i]))
                        + s[j] * (1.0 / (input.rho[j] * input.rho[j]))
                }
                DiscretizationChoice::BenzAsphaug => {
                    (s[i] + s[j]) * (1.0 / (input.rho[i] * input.rho[j]))
                }
            };
            sum += t.apply(grad.truncate()).extend(0.0) * input.m[j];
        }
        acc.slice_mut::<DVec4>(self.dv_idx)[i] += sum;
    }
}

// ============================================================
// 测试
// ============================================================
