// crates/sf_index/src/bbox.rs

//! 轴对齐包围盒
//!
//! 距离度量只取粒子向量的 xyz 分量，w（光滑长度）不参与。

use glam::{DVec3, DVec4};

/// 三维轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    pub min: DVec3,
    pub max: DVec3,
}

impl Box3 {
    /// 空盒（任何 extend 都会覆盖）
    pub const EMPTY: Box3 = Box3 {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    #[inline]
    pub fn new(min: DVec3, max: DVec3) -> Box3 {
        Box3 { min, max }
    }

    /// 由粒子集合构建（取 xyz）
    pub fn from_points(points: &[DVec4]) -> Box3 {
        let mut bbox = Box3::EMPTY;
        for p in points {
            bbox.extend(p.truncate());
        }
        bbox
    }

    #[inline]
    pub fn extend(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    #[inline]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> DVec3 {
        0.5 * (self.min + self.max)
    }

    /// 最长边的轴 (0=x, 1=y, 2=z)
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    #[inline]
    pub fn axis(v: DVec3, axis: usize) -> f64 {
        match axis {
            0 => v.x,
            1 => v.y,
            _ => v.z,
        }
    }

    /// 沿轴在 split 处剖开，返回 (左盒, 右盒)
    pub fn split(&self, axis: usize, split: f64) -> (Box3, Box3) {
        let mut left = *self;
        let mut right = *self;
        match axis {
            0 => {
                left.max.x = split;
                right.min.x = split;
            }
            1 => {
                left.max.y = split;
                right.min.y = split;
            }
            _ => {
                left.max.z = split;
                right.min.z = split;
            }
        }
        (left, right)
    }
}
