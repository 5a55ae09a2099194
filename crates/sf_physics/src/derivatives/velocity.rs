// crates/sf_physics/src/derivatives/velocity.rs

//! 速度场导数：散度、梯度、旋度与核梯度修正张量

use glam::DVec4;
use sf_foundation::{SfError, SfResult, SymTensor3};
use sf_storage::{OrderEnum, QuantityId};

use crate::accumulated::{Accumulated, BufferCategory};
use crate::derivatives::{
    Derivative, DerivativeKey, DerivativeKind, DerivativePhase, StorageView,
};

/// 修正张量在累加器中的下标（消费方共用）
fn correction_index(acc: &Accumulated) -> SfResult<usize> {
    acc.index_of(QuantityId::CorrectionTensor, OrderEnum::Zero)
        .ok_or_else(|| SfError::setup("修正张量导数未申报"))
}

/// 速度散度 ∇·v
///
/// divv[i] = Σⱼ mⱼ/ρⱼ (vⱼ-vᵢ)·∇W
pub struct VelocityDivergence {
    use_correction: bool,
    out_idx: usize,
    correction_idx: Option<usize>,
}

impl VelocityDivergence {
    pub fn new(use_correction: bool) -> VelocityDivergence {
        VelocityDivergence {
            use_correction,
            out_idx: 0,
            correction_idx: None,
        }
    }
}

impl Derivative for VelocityDivergence {
    fn key(&self) -> DerivativeKey {
        DerivativeKey::new(DerivativeKind::VelocityDivergence, self.use_correction as u32)
    }

    fn create(&mut self, acc: &mut Accumulated) -> SfResult<()> {
        self.out_idx = acc.insert::<f64>(
            QuantityId::VelocityDivergence,
            OrderEnum::Zero,
            BufferCategory::Unique,
        )?;
        if self.use_correction {
            self.correction_idx = Some(correction_index(acc)?);
        }
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
        let correction = self.correction_idx.map(|idx| acc.slice::<SymTensor3>(idx)[i]);
        let vi = input.v[i].truncate();
        let mut sum = 0.0;
        for (&j, grad) in neighs.iter().zip(grads) {
            let g = match correction {
                Some(c) => c * grad.truncate(),
                None => grad.truncate(),
            };
            let dv = input.v[j].truncate() - vi;
            sum += input.m[j] / input.rho[j] * dv.dot(g);
        }
        acc.slice_mut::<f64>(self.out_idx)[i] += sum;
    }
}

/// 速度梯度的对称部分（应变率）
///
/// 只计同体且未完全破碎的粒子对，供应力演化与固体连续性方程用。
pub struct VelocityGradient {
    use_correction: bool,
    out_idx: usize,
    correction_idx: Option<usize>,
}

impl VelocityGradient {
    pub fn new(use_correction: bool) -> VelocityGradient {
        VelocityGradient {
            use_correction,
            out_idx: 0,
            correction_idx: None,
        }
    }
}

impl Derivative for VelocityGradient {
    fn key(&self) -> DerivativeKey {
        DerivativeKey::new(DerivativeKind::VelocityGradient, self.use_correction as u32)
    }

    fn create(&mut self, acc: &mut Accumulated) -> SfResult<()> {
        self.out_idx = acc.insert::<SymTensor3>(
            QuantityId::VelocityGradient,
            OrderEnum::Zero,
            BufferCategory::Unique,
        )?;
        if self.use_correction {
            self.correction_idx = Some(correction_index(acc)?);
        }
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
        let correction = self.correction_idx.map(|idx| acc.slice::<SymTensor3>(idx)[i]);
        let vi = input.v[i].truncate();
        let mut sum = SymTensor3::ZERO;
        for (&j, grad) in neighs.iter().zip(grads) {
            if !input.bonded(i, j) {
                continue;
            }
            let g = match correction {
                Some(c) => c * grad.truncate(),
                None => grad.truncate(),
            };
            let dv = input.v[j].truncate() - vi;
            sum += SymTensor3::symmetric_outer(dv, g) * (input.m[j] / input.rho[j]);
        }
        acc.slice_mut::<SymTensor3>(self.out_idx)[i] += sum;
    }
}

/// 速度旋度 ∇×v（Balsara 开关的输入）
pub struct VelocityRotation {
    out_idx: usize,
}

impl VelocityRotation {
    pub fn new() -> VelocityRotation {
        VelocityRotation { out_idx: 0 }
    }
}

impl Default for VelocityRotation {
    fn default() -> Self {
        Self::new()
    }
}

impl Derivative for VelocityRotation {
    fn key(&self) -> DerivativeKey {
        DerivativeKey::new(DerivativeKind::VelocityRotation, 0)
    }

    fn create(&mut self, acc: &mut Accumulated) -> SfResult<()> {
        self.out_idx = acc.insert::<DVec4>(
            QuantityId::VelocityRotation,
            OrderEnum::Zero,
            BufferCategory::Unique,
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
        let vi = input.v[i].truncate();
        let mut sum = glam::DVec3::ZERO;
        for (&j, grad) in neighs.iter().zip(grads) {
            let dv = input.v[j].truncate() - vi;
            sum += input.m[j] / input.rho[j] * grad.truncate().cross(dv);
        }
        let out = acc.slice_mut::<DVec4>(self.out_idx);
        out[i] += sum.extend(0.0);
    }
}

/// 核梯度修正张量 C = (Σⱼ mⱼ/ρⱼ (rⱼ-rᵢ) ⊗ ∇W)⁻¹
///
/// 预计算阶段产出；行列式过小（邻居退化）时退回单位张量。
pub struct CorrectionTensor {
    out_idx: usize,
}

impl CorrectionTensor {
    /// 低于该阈值视为奇异
    const MIN_DETERMINANT: f64 = 0.01;

    pub fn new() -> CorrectionTensor {
        CorrectionTensor { out_idx: 0 }
    }
}

impl Default for CorrectionTensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Derivative for CorrectionTensor {
    fn phase(&self) -> DerivativePhase {
        DerivativePhase::Precompute
    }

    fn key(&self) -> DerivativeKey {
        DerivativeKey::new(DerivativeKind::CorrectionTensor, 0)
    }

    fn create(&mut self, acc: &mut Accumulated) -> SfResult<()> {
        self.out_idx = acc.insert::<SymTensor3>(
            QuantityId::CorrectionTensor,
            OrderEnum::Zero,
            BufferCategory::Unique,
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
        let ri = input.r[i].truncate();
        let mut sum = SymTensor3::ZERO;
        for (&j, grad) in neighs.iter().zip(grads) {
            let dr = input.r[j].truncate() - ri;
            sum += SymTensor3::symmetric_outer(dr, grad.truncate())
                * (input.m[j] / input.rho[j]);
        }
        let inverse = if sum.determinant().abs() > Self::MIN_DETERMINANT {
            sum.inverse()
        } else {
            None
        };
        acc.slice_mut::<SymTensor3>(self.out_idx)[i] =
            inverse.unwrap_or(SymTensor3::IDENTITY);
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    /// 两个粒子的极简视图
    struct Pair {
        r: Vec<DVec4>,
        v: Vec<DVec4>,
        m: Vec<f64>,
        rho: Vec<f64>,
    }

    impl Pair {
        fn new(v1: DVec3) -> Pair {
            Pair {
                r: vec![
                    DVec4::new(0.0, 0.0, 0.0, 1.0),
                    DVec4::new(0.5, 0.0, 0.0, 1.0),
                ],
                v: vec![DVec4::ZERO, v1.extend(0.0)],
                m: vec![1.0; 2],
                rho: vec![1.0; 2],
            }
        }

        fn view(&self) -> StorageView<'_> {
            StorageView {
                r: &self.r,
                v: &self.v,
                m: &self.m,
                rho: &self.rho,
                p: None,
                cs: None,
                s: None,
                reduce: None,
                flag: None,
                divv: None,
                rotv: None,
            }
        }
    }

    #[test]
    fn test_divergence_sign() {
        // 邻居沿 +x 远离, 散度为正
        let pair = Pair::new(DVec3::new(1.0, 0.0, 0.0));
        let mut div = VelocityDivergence::new(false);
        let mut acc = Accumulated::new();
        div.create(&mut acc).unwrap();
        acc.initialize(2);

        // ∇W 沿 rᵢ-rⱼ 乘负的核导数, 邻居在 +x 时指向 +x
        let grad = DVec4::new(0.3, 0.0, 0.0, 0.0);
        div.eval(&pair.view(), 0, &[1], &[grad], &mut acc);
        let divv = acc.slice::<f64>(0);
        // (v1-v0)·∇W = (1,0,0)·(0.3,0,0) > 0, 权重为正
        assert!(divv[0] > 0.0);

        // 接近运动给出相反符号
        let pair2 = Pair::new(DVec3::new(-1.0, 0.0, 0.0));
        let mut acc2 = Accumulated::new();
        let mut div2 = VelocityDivergence::new(false);
        div2.create(&mut acc2).unwrap();
        acc2.initialize(2);
        div2.eval(&pair2.view(), 0, &[1], &[grad], &mut acc2);
        assert!(acc2.slice::<f64>(0)[0] < 0.0);
    }

    #[test]
    fn test_gradient_trace_matches_divergence() {
        let pair = Pair::new(DVec3::new(0.7, -0.2, 0.1));
        let grad = DVec4::new(0.3, -0.1, -0.05, 0.0);

        let mut acc = Accumulated::new();
        let mut div = VelocityDivergence::new(false);
        let mut gradv = VelocityGradient::new(false);
        div.create(&mut acc).unwrap();
        gradv.create(&mut acc).unwrap();
        acc.initialize(2);

        let view = pair.view();
        div.eval(&view, 0, &[1], &[grad], &mut acc);
        gradv.eval(&view, 0, &[1], &[grad], &mut acc);

        let divv = acc.slice::<f64>(0)[0];
        let trace = acc.slice::<SymTensor3>(1)[0].trace();
        // 无修正时 tr(∇v) 与 ∇·v 一致
        assert!((divv - trace).abs() < 1e-14);
    }

    #[test]
    fn test_correction_tensor_isolated_particle() {
        // 无邻居时退回单位张量
        let pair = Pair::new(DVec3::ZERO);
        let mut acc = Accumulated::new();
        let mut corr = CorrectionTensor::new();
        corr.create(&mut acc).unwrap();
        acc.initialize(2);
        corr.eval(&pair.view(), 0, &[], &[], &mut acc);
        assert_eq!(acc.slice::<SymTensor3>(0)[0], SymTensor3::IDENTITY);
    }

    #[test]
    fn test_rotation_shear_flow() {
        // v = (0, x, 0) 的旋度沿 +z
        let pair = Pair::new(DVec3::new(0.0, 0.5, 0.0));
        let grad = DVec4::new(0.3, 0.0, 0.0, 0.0);
        let mut acc = Accumulated::new();
        let mut rot = VelocityRotation::new();
        rot.create(&mut acc).unwrap();
        acc.initialize(2);
        rot.eval(&pair.view(), 0, &[1], &[grad], &mut acc);
        let rotv = acc.slice::<DVec4>(0)[0];
        assert!(rotv.z > 0.0);
        assert_eq!(rotv.w, 0.0);
    }
}
