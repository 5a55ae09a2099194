// crates/sf_physics/src/derivatives/av.rs

//! Monaghan 人工粘性
//!
//! 只在粒子对相互接近时生效，被耗散的动能进入内能。
//! 可选 Balsara 开关：用上一步的散度与旋度压低剪切流中的粘性。

use glam::DVec4;
use sf_foundation::SfResult;
use sf_storage::{OrderEnum, QuantityId};

use crate::accumulated::{Accumulated, BufferCategory};
use crate::derivatives::{Derivative, DerivativeKey, DerivativeKind, StorageView};

pub struct ArtificialViscosity {
    alpha: f64,
    beta: f64,
    balsara: bool,
    store_factor: bool,
    dv_idx: usize,
    du_idx: usize,
    factor_idx: Option<usize>,
}

impl ArtificialViscosity {
    /// 分母正则化系数 0.01 h̄²
    const EPS: f64 = 0.01;
    /// Balsara 开关分母中的 cs/h 正则项系数
    const BALSARA_EPS: f64 = 1e-4;

    pub fn new(alpha: f64, beta: f64, balsara: bool, store_factor: bool) -> ArtificialViscosity {
        ArtificialViscosity {
            alpha,
            beta,
            balsara,
            store_factor,
            dv_idx: 0,
            du_idx: 0,
            factor_idx: None,
        }
    }

    /// Balsara 系数 f = |∇·v| / (|∇·v| + |∇×v| + ε·cs/h)
    #[inline]
    fn balsara_factor(&self, input: &StorageView<'_>, cs: &[f64], k: usize) -> f64 {
        let divv = input.divv.map_or(0.0, |d| d[k]).abs();
        let rotv = input
            .rotv
            .map_or(0.0, |r| r[k].truncate().length());
        divv / (divv + rotv + Self::BALSARA_EPS * cs[k] / input.r[k].w)
    }
}

impl Derivative for ArtificialViscosity {
    fn key(&self) -> DerivativeKey {
        let variant = self.balsara as u32 | (self.store_factor as u32) << 1;
        DerivativeKey::new(DerivativeKind::ArtificialViscosity, variant)
    }

    fn create(&mut self, acc: &mut Accumulated) -> SfResult<()> {
        self.dv_idx = acc.insert::<DVec4>(
            QuantityId::Position,
            OrderEnum::Second,
            BufferCategory::Shared,
        )?;
        self.du_idx =
            acc.insert::<f64>(QuantityId::Energy, OrderEnum::First, BufferCategory::Shared)?;
        if self.store_factor {
            self.factor_idx = Some(acc.insert::<f64>(
                QuantityId::AvBalsara,
                OrderEnum::Zero,
                BufferCategory::Unique,
            )?);
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
        let Some(cs) = input.cs else {
            return;
        };
        let factor_i = if self.balsara {
            self.balsara_factor(input, cs, i)
        } else {
            1.0
        };

        let ri = input.r[i];
        let vi = input.v[i].truncate();
        let mut sum_dv = DVec4::ZERO;
        let mut sum_du = 0.0;
        for (&j, &grad) in neighs.iter().zip(grads) {
            let dr = ri.truncate() - input.r[j].truncate();
            let dv = vi - input.v[j].truncate();
            let dvdr = dv.dot(dr);
            // 远离的粒子对不产生粘性
            if dvdr >= 0.0 {
                continue;
            }
            let h_bar = 0.5 * (ri.w + input.r[j].w);
            let cs_bar = 0.5 * (cs[i] + cs[j]);
            let rho_bar = 0.5 * (input.rho[i] + input.rho[j]);
            let mu = h_bar * dvdr / (dr.length_squared() + Self::EPS * h_bar * h_bar);
            let mut pi_av = (-self.alpha * cs_bar * mu + self.beta * mu * mu) / rho_bar;
            if self.balsara {
                pi_av *= 0.5 * (factor_i + self.balsara_factor(input, cs, j));
            }
            sum_dv -= grad * (input.m[j] * pi_av);
            sum_du += 0.5 * input.m[j] * pi_av * dv.dot(grad.truncate());
        }
        acc.slice_mut::<DVec4>(self.dv_idx)[i] += sum_dv;
        acc.slice_mut::<f64>(self.du_idx)[i] += sum_du;
        if let Some(idx) = self.factor_idx {
            acc.slice_mut::<f64>(idx)[i] = factor_i;
        }
    }
}

// ============================================================
// 测试
// ============================================================
