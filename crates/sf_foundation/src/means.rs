// crates/sf_foundation/src/means.rs

//! 最小/最大/均值流式统计

use serde::{Deserialize, Serialize};

/// 流式累计的最小值、最大值与均值
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MinMaxMean {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
}

impl MinMaxMean {
    pub fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            count: 0,
        }
    }

    /// 累计一个样本
    #[inline]
    pub fn accumulate(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// 均值，无样本时返回 0
    #[inline]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Default for MinMaxMean {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MinMaxMean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "min={:.3} max={:.3} mean={:.3}",
            self.min,
            self.max,
            self.mean()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut stats = MinMaxMean::new();
        for v in [3.0, 1.0, 2.0] {
            stats.accumulate(v);
        }
        assert_eq!(stats.min(), 1.0);
        assert_eq!(stats.max(), 3.0);
        assert_eq!(stats.mean(), 2.0);
        assert_eq!(stats.count(), 3);
    }

    #[test]
    fn test_empty() {
        let stats = MinMaxMean::new();
        assert_eq!(stats.mean(), 0.0);
        assert_eq!(stats.count(), 0);
    }
}
