// crates/sf_foundation/src/interval.rs

//! 闭区间
//!
//! 表示物理量取值范围 [lower, upper]，用于积分时的钳制。
//! 边界可为无穷，`Interval::UNBOUNDED` 表示不限制。

use serde::{Deserialize, Serialize};

/// 闭区间 [lower, upper]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    lower: f64,
    upper: f64,
}

impl Interval {
    /// 无限制区间
    pub const UNBOUNDED: Interval = Interval {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    /// 创建区间，要求 lower <= upper
    #[inline]
    pub fn new(lower: f64, upper: f64) -> Self {
        debug_assert!(lower <= upper);
        Self { lower, upper }
    }

    /// 仅有下界的区间
    #[inline]
    pub fn at_least(lower: f64) -> Self {
        Self::new(lower, f64::INFINITY)
    }

    #[inline]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// 是否包含给定值
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// 钳制到区间内
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    /// 是否为无限制区间
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.lower == f64::NEG_INFINITY && self.upper == f64::INFINITY
    }

    /// 区间长度
    #[inline]
    pub fn size(&self) -> f64 {
        self.upper - self.lower
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}
