// crates/sf_foundation/src/tensor.rs

//! 三维对称张量与无迹张量
//!
//! SPH 固体力学中的应力、应变率和修正张量均为对称张量。
//! `SymTensor3` 存储 6 个独立分量（对角 + 非对角），
//! `TracelessTensor3` 利用零迹约束只存 5 个分量（zz 由 xx、yy 推出）。

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// 三维对称张量
///
/// `diag` = (xx, yy, zz)，`off` = (xy, xz, yz)。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SymTensor3 {
    pub diag: DVec3,
    pub off: DVec3,
}

impl SymTensor3 {
    pub const ZERO: SymTensor3 = SymTensor3 {
        diag: DVec3::ZERO,
        off: DVec3::ZERO,
    };

    pub const IDENTITY: SymTensor3 = SymTensor3 {
        diag: DVec3::ONE,
        off: DVec3::ZERO,
    };

    #[inline]
    pub fn new(diag: DVec3, off: DVec3) -> Self {
        Self { diag, off }
    }

    /// 对称外积 0.5 * (a ⊗ b + b ⊗ a)
    #[inline]
    pub fn symmetric_outer(a: DVec3, b: DVec3) -> Self {
        Self {
            diag: a * b,
            off: 0.5
                * DVec3::new(
                    a.x * b.y + a.y * b.x,
                    a.x * b.z + a.z * b.x,
                    a.y * b.z + a.z * b.y,
                ),
        }
    }

    /// 迹 tr(T) = xx + yy + zz
    #[inline]
    pub fn trace(&self) -> f64 {
        self.diag.x + self.diag.y + self.diag.z
    }

    /// 偏量部分 T - tr(T)/3 * I
    #[inline]
    pub fn deviatoric(&self) -> TracelessTensor3 {
        let m = self.trace() / 3.0;
        TracelessTensor3 {
            xx: self.diag.x - m,
            yy: self.diag.y - m,
            xy: self.off.x,
            xz: self.off.y,
            yz: self.off.z,
        }
    }

    /// 双点积 T : U = Σ Tij Uij
    #[inline]
    pub fn ddot(&self, other: &SymTensor3) -> f64 {
        self.diag.dot(other.diag) + 2.0 * self.off.dot(other.off)
    }

    /// Frobenius 范数
    #[inline]
    pub fn norm(&self) -> f64 {
        self.ddot(self).sqrt()
    }

    /// 行列式
    pub fn determinant(&self) -> f64 {
        let (xx, yy, zz) = (self.diag.x, self.diag.y, self.diag.z);
        let (xy, xz, yz) = (self.off.x, self.off.y, self.off.z);
        xx * (yy * zz - yz * yz) - xy * (xy * zz - yz * xz) + xz * (xy * yz - yy * xz)
    }

    /// 逆张量（代数余子式公式）
    ///
    /// 行列式为零或结果非有限时返回 None。
    pub fn inverse(&self) -> Option<SymTensor3> {
        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        let (xx, yy, zz) = (self.diag.x, self.diag.y, self.diag.z);
        let (xy, xz, yz) = (self.off.x, self.off.y, self.off.z);
        let inv = SymTensor3 {
            diag: DVec3::new(yy * zz - yz * yz, xx * zz - xz * xz, xx * yy - xy * xy) / det,
            off: DVec3::new(xz * yz - xy * zz, xy * yz - xz * yy, xy * xz - xx * yz) / det,
        };
        if inv.diag.is_finite() && inv.off.is_finite() {
            Some(inv)
        } else {
            None
        }
    }

    /// 特征值（Cardano 解析解），降序排列
    pub fn eigenvalues(&self) -> [f64; 3] {
        let m = self.trace() / 3.0;
        let k = SymTensor3 {
            diag: self.diag - DVec3::splat(m),
            off: self.off,
        };
        // p = Σ Kij² / 6, q = det(K) / 2
        let p = k.ddot(&k) / 6.0;
        let q = k.determinant() / 2.0;
        if p < 1e-300 {
            return [m, m, m];
        }
        let sp = p.sqrt();
        // 数值误差可能使 p³ - q² 略小于零
        let phi = (p * p * p - q * q).max(0.0).sqrt().atan2(q) / 3.0;
        let (s, c) = phi.sin_cos();
        let e1 = m + 2.0 * sp * c;
        let e2 = m - sp * (c + 3.0_f64.sqrt() * s);
        let e3 = m - sp * (c - 3.0_f64.sqrt() * s);
        let mut eigs = [e1, e2, e3];
        eigs.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        eigs
    }

    /// 最大主值
    #[inline]
    pub fn max_principal(&self) -> f64 {
        self.eigenvalues()[0]
    }

    /// 所有分量是否有限
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.diag.is_finite() && self.off.is_finite()
    }
}

impl Add for SymTensor3 {
    type Output = SymTensor3;
    #[inline]
    fn add(self, rhs: SymTensor3) -> SymTensor3 {
        SymTensor3 {
            diag: self.diag + rhs.diag,
            off: self.off + rhs.off,
        }
    }
}

impl AddAssign for SymTensor3 {
    #[inline]
    fn add_assign(&mut self, rhs: SymTensor3) {
        self.diag += rhs.diag;
        self.off += rhs.off;
    }
}

impl Sub for SymTensor3 {
    type Output = SymTensor3;
    #[inline]
    fn sub(self, rhs: SymTensor3) -> SymTensor3 {
        SymTensor3 {
            diag: self.diag - rhs.diag,
            off: self.off - rhs.off,
        }
    }
}

impl SubAssign for SymTensor3 {
    #[inline]
    fn sub_assign(&mut self, rhs: SymTensor3) {
        self.diag -= rhs.diag;
        self.off -= rhs.off;
    }
}

impl Mul<f64> for SymTensor3 {
    type Output = SymTensor3;
    #[inline]
    fn mul(self, rhs: f64) -> SymTensor3 {
        SymTensor3 {
            diag: self.diag * rhs,
            off: self.off * rhs,
        }
    }
}

impl Mul<DVec3> for SymTensor3 {
    type Output = DVec3;
    /// 张量作用于向量 T · v
    #[inline]
    fn mul(self, v: DVec3) -> DVec3 {
        DVec3::new(
            self.diag.x * v.x + self.off.x * v.y + self.off.y * v.z,
            self.off.x * v.x + self.diag.y * v.y + self.off.z * v.z,
            self.off.y * v.x + self.off.z * v.y + self.diag.z * v.z,
        )
    }
}

impl Neg for SymTensor3 {
    type Output = SymTensor3;
    #[inline]
    fn neg(self) -> SymTensor3 {
        SymTensor3 {
            diag: -self.diag,
            off: -self.off,
        }
    }
}

/// 三维无迹对称张量
///
/// 存储 (xx, yy, xy, xz, yz)，zz = -(xx + yy)。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TracelessTensor3 {
    pub xx: f64,
    pub yy: f64,
    pub xy: f64,
    pub xz: f64,
    pub yz: f64,
}

impl TracelessTensor3 {
    pub const ZERO: TracelessTensor3 = TracelessTensor3 {
        xx: 0.0,
        yy: 0.0,
        xy: 0.0,
        xz: 0.0,
        yz: 0.0,
    };

    #[inline]
    pub fn zz(&self) -> f64 {
        -(self.xx + self.yy)
    }

    /// 转为一般对称张量
    #[inline]
    pub fn to_sym(&self) -> SymTensor3 {
        SymTensor3 {
            diag: DVec3::new(self.xx, self.yy, self.zz()),
            off: DVec3::new(self.xy, self.xz, self.yz),
        }
    }

    /// 双点积 S : T
    #[inline]
    pub fn ddot(&self, other: &SymTensor3) -> f64 {
        self.to_sym().ddot(other)
    }

    /// Frobenius 范数
    #[inline]
    pub fn norm(&self) -> f64 {
        let s = self.to_sym();
        s.norm()
    }

    /// 张量作用于向量 S · v
    #[inline]
    pub fn apply(&self, v: DVec3) -> DVec3 {
        self.to_sym() * v
    }

    /// 所有分量是否有限
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xx.is_finite()
            && self.yy.is_finite()
            && self.xy.is_finite()
            && self.xz.is_finite()
            && self.yz.is_finite()
    }
}

impl From<TracelessTensor3> for SymTensor3 {
    #[inline]
    fn from(t: TracelessTensor3) -> SymTensor3 {
        t.to_sym()
    }
}

impl Add for TracelessTensor3 {
    type Output = TracelessTensor3;
    #[inline]
    fn add(self, rhs: TracelessTensor3) -> TracelessTensor3 {
        TracelessTensor3 {
            xx: self.xx + rhs.xx,
            yy: self.yy + rhs.yy,
            xy: self.xy + rhs.xy,
            xz: self.xz + rhs.xz,
            yz: self.yz + rhs.yz,
        }
    }
}

impl AddAssign for TracelessTensor3 {
    #[inline]
    fn add_assign(&mut self, rhs: TracelessTensor3) {
        self.xx += rhs.xx;
        self.yy += rhs.yy;
        self.xy += rhs.xy;
        self.xz += rhs.xz;
        self.yz += rhs.yz;
    }
}

impl Sub for TracelessTensor3 {
    type Output = TracelessTensor3;
    #[inline]
    fn sub(self, rhs: TracelessTensor3) -> TracelessTensor3 {
        TracelessTensor3 {
            xx: self.xx - rhs.xx,
            yy: self.yy - rhs.yy,
            xy: self.xy - rhs.xy,
            xz: self.xz - rhs.xz,
            yz: self.yz - rhs.yz,
        }
    }
}

impl Mul<f64> for TracelessTensor3 {
    type Output = TracelessTensor3;
    #[inline]
    fn mul(self, rhs: f64) -> TracelessTensor3 {
        TracelessTensor3 {
            xx: self.xx * rhs,
            yy: self.yy * rhs,
            xy: self.xy * rhs,
            xz: self.xz * rhs,
            yz: self.yz * rhs,
        }
    }
}

impl Neg for TracelessTensor3 {
    type Output = TracelessTensor3;
    #[inline]
    fn neg(self) -> TracelessTensor3 {
        self * -1.0
    }
}

// ============================================================
// 测试
// ============================================================
