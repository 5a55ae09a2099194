// crates/sf_physics/src/kernel.rs

//! SPH 核函数
//!
//! 解析核以无量纲 q = |r|/h 定义，生产路径统一经
//! [`LutKernel`] 以 q² 为横轴的查找表线性插值求值，
//! 避免热循环中的开方与分支。
//!
//! 梯度以 (1/q)·dw/dq 形式返回，核梯度向量为
//! ∇W = (rᵢ-rⱼ) · gradImpl(q²) / h⁵。

use glam::{DVec3, DVec4};

/// 解析核接口（三维归一化）
pub trait Kernel: Send + Sync {
    /// 支撑半径 κ（以 h 为单位）
    fn radius(&self) -> f64;

    /// 无量纲核值 w(q)，参数为 q²
    fn value_impl(&self, q_sqr: f64) -> f64;

    /// (1/q)·dw/dq，参数为 q²
    fn grad_impl(&self, q_sqr: f64) -> f64;
}

/// 三次样条（M4），支撑半径 2
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicSpline;

impl CubicSpline {
    const NORM: f64 = 1.0 / std::f64::consts::PI;
}

impl Kernel for CubicSpline {
    fn radius(&self) -> f64 {
        2.0
    }

    fn value_impl(&self, q_sqr: f64) -> f64 {
        let q = q_sqr.sqrt();
        if q < 1.0 {
            Self::NORM * (0.25 * (2.0 - q).powi(3) - (1.0 - q).powi(3))
        } else if q < 2.0 {
            Self::NORM * 0.25 * (2.0 - q).powi(3)
        } else {
            0.0
        }
    }

    fn grad_impl(&self, q_sqr: f64) -> f64 {
        let q = q_sqr.sqrt();
        if q == 0.0 {
            // dw/dq 在 q=0 为零, 但 (1/q)dw/dq 有有限极限
            return -3.0 * Self::NORM;
        }
        if q < 1.0 {
            (1.0 / q) * Self::NORM * (-0.75 * (2.0 - q).powi(2) + 3.0 * (1.0 - q).powi(2))
        } else if q < 2.0 {
            (1.0 / q) * Self::NORM * (-0.75 * (2.0 - q).powi(2))
        } else {
            0.0
        }
    }
}

/// 四次样条（M5），支撑半径 2.5
#[derive(Debug, Clone, Copy, Default)]
pub struct FourthOrderSpline;

impl FourthOrderSpline {
    const NORM: f64 = 1.0 / (20.0 * std::f64::consts::PI);
}

impl Kernel for FourthOrderSpline {
    fn radius(&self) -> f64 {
        2.5
    }

    fn value_impl(&self, q_sqr: f64) -> f64 {
        let q = q_sqr.sqrt();
        if q < 0.5 {
            Self::NORM
                * ((2.5 - q).powi(4) - 5.0 * (1.5 - q).powi(4) + 10.0 * (0.5 - q).powi(4))
        } else if q < 1.5 {
            Self::NORM * ((2.5 - q).powi(4) - 5.0 * (1.5 - q).powi(4))
        } else if q < 2.5 {
            Self::NORM * (2.5 - q).powi(4)
        } else {
            0.0
        }
    }

    fn grad_impl(&self, q_sqr: f64) -> f64 {
        let q = q_sqr.sqrt();
        if q == 0.0 {
            return -30.0 * Self::NORM;
        }
        if q < 0.5 {
            (1.0 / q)
                * Self::NORM
                * (-4.0 * (2.5 - q).powi(3) + 20.0 * (1.5 - q).powi(3)
                    - 40.0 * (0.5 - q).powi(3))
        } else if q < 1.5 {
            (1.0 / q) * Self::NORM * (-4.0 * (2.5 - q).powi(3) + 20.0 * (1.5 - q).powi(3))
        } else if q < 2.5 {
            (1.0 / q) * Self::NORM * (-4.0 * (2.5 - q).powi(3))
        } else {
            0.0
        }
    }
}

/// 查找表核
///
/// 以 q² 均匀采样 40000 点并线性插值；多存一个端点保证
/// 末段插值有效。
#[derive(Debug, Clone)]
pub struct LutKernel {
    values: Vec<f64>,
    grads: Vec<f64>,
    radius: f64,
    q_sqr_to_idx: f64,
}

impl LutKernel {
    const N_ENTRIES: usize = 40000;

    pub fn new(source: &dyn Kernel) -> LutKernel {
        let radius = source.radius();
        let q_sqr_to_idx = Self::N_ENTRIES as f64 / (radius * radius);
        let mut values = Vec::with_capacity(Self::N_ENTRIES + 1);
        let mut grads = Vec::with_capacity(Self::N_ENTRIES + 1);
        for i in 0..=Self::N_ENTRIES {
            let q_sqr = i as f64 / q_sqr_to_idx;
            values.push(source.value_impl(q_sqr));
            grads.push(source.grad_impl(q_sqr));
        }
        LutKernel {
            values,
            grads,
            radius,
            q_sqr_to_idx,
        }
    }

    /// 支撑半径 κ
    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    fn interpolate(table: &[f64], float_idx: f64) -> f64 {
        let idx = float_idx as usize;
        let ratio = float_idx - idx as f64;
        table[idx] * (1.0 - ratio) + table[idx + 1] * ratio
    }

    #[inline]
    fn value_impl(&self, q_sqr: f64) -> f64 {
        if q_sqr >= self.radius * self.radius {
            return 0.0;
        }
        Self::interpolate(&self.values, self.q_sqr_to_idx * q_sqr)
    }

    #[inline]
    fn grad_impl(&self, q_sqr: f64) -> f64 {
        if q_sqr >= self.radius * self.radius {
            return 0.0;
        }
        Self::interpolate(&self.grads, self.q_sqr_to_idx * q_sqr)
    }

    /// 核值 W(|dr|, h)
    #[inline]
    pub fn value(&self, dr: DVec3, h: f64) -> f64 {
        let q_sqr = dr.length_squared() / (h * h);
        self.value_impl(q_sqr) / (h * h * h)
    }

    /// 核梯度 ∇W，方向沿 dr
    #[inline]
    pub fn grad(&self, dr: DVec3, h: f64) -> DVec3 {
        let h_sqr = h * h;
        let q_sqr = dr.length_squared() / h_sqr;
        dr * (self.grad_impl(q_sqr) / (h_sqr * h_sqr * h))
    }

    /// 光滑长度对称化求值 h̄ = ½(hᵢ+hⱼ)
    #[inline]
    pub fn value_symmetrized(&self, ri: DVec4, rj: DVec4) -> f64 {
        self.value(ri.truncate() - rj.truncate(), 0.5 * (ri.w + rj.w))
    }

    /// 光滑长度对称化梯度，w 分量恒为零
    #[inline]
    pub fn grad_symmetrized(&self, ri: DVec4, rj: DVec4) -> DVec4 {
        self.grad(ri.truncate() - rj.truncate(), 0.5 * (ri.w + rj.w))
            .extend(0.0)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_spline_support() {
        let kernel = CubicSpline;
        assert!(kernel.value_impl(0.0) > 0.0);
        assert_eq!(kernel.value_impl(4.0), 0.0);
        assert_eq!(kernel.grad_impl(4.1), 0.0);
        // q=0 处核值为 1/π·(0.25·8 − 1) = 1/π
        assert!((kernel.value_impl(0.0) - 1.0 / std::f64::consts::PI).abs() < 1e-14);
    }

    #[test]
    fn test_lut_matches_analytic() {
        let analytic = CubicSpline;
        let lut = LutKernel::new(&analytic);
        for k in 0..200 {
            let q = k as f64 * 0.01;
            let q_sqr = q * q;
            assert!(
                (lut.value_impl(q_sqr) - analytic.value_impl(q_sqr)).abs() < 1e-6,
                "q={q}"
            );
            assert!(
                (lut.grad_impl(q_sqr) - analytic.grad_impl(q_sqr)).abs() < 1e-5,
                "q={q}"
            );
        }
    }

    #[test]
    fn test_normalization() {
        // ∫W dV = 4π ∫₀^κ W(r)r² dr ≈ 1
        for kernel in [&CubicSpline as &dyn Kernel, &FourthOrderSpline] {
            let lut = LutKernel::new(kernel);
            let h = 1.0;
            let n = 10000;
            let dr = lut.radius() * h / n as f64;
            let mut integral = 0.0;
            for k in 0..n {
                let r = (k as f64 + 0.5) * dr;
                integral += lut.value(DVec3::new(r, 0.0, 0.0), h) * r * r * dr;
            }
            integral *= 4.0 * std::f64::consts::PI;
            assert!((integral - 1.0).abs() < 1e-3, "integral={integral}");
        }
    }

    #[test]
    fn test_gradient_points_inward() {
        // dot(∇W, dr) ≤ 0: 核随距离递减
        let lut = LutKernel::new(&CubicSpline);
        for k in 1..20 {
            let dr = DVec3::new(0.1 * k as f64, 0.05, -0.02);
            let grad = lut.grad(dr, 1.0);
            assert!(grad.dot(dr) <= 0.0);
        }
    }

    #[test]
    fn test_symmetrized() {
        let lut = LutKernel::new(&CubicSpline);
        let ri = DVec4::new(0.0, 0.0, 0.0, 1.0);
        let rj = DVec4::new(0.5, 0.0, 0.0, 2.0);
        let w = lut.value_symmetrized(ri, rj);
        // 等价于以 h̄=1.5 求值
        assert!((w - lut.value(DVec3::new(-0.5, 0.0, 0.0), 1.5)).abs() < 1e-14);
        let grad = lut.grad_symmetrized(ri, rj);
        assert_eq!(grad.w, 0.0);
        // 对称性: 交换两端梯度反号
        let grad_ji = lut.grad_symmetrized(rj, ri);
        assert!((grad + grad_ji).length() < 1e-14);
    }

    #[test]
    fn test_fourth_order_radius() {
        assert_eq!(FourthOrderSpline.radius(), 2.5);
        let lut = LutKernel::new(&FourthOrderSpline);
        assert_eq!(lut.radius(), 2.5);
    }
}
