// crates/sf_index/src/brute_force.rs

//! 暴力邻居查找
//!
//! O(n²) 参考实现，只用于测试与 kd 树等价性校验。

use glam::DVec4;
use sf_foundation::{Scheduler, SfResult};

use crate::finder::{compute_ranks, NeighbourFinder, NeighbourRecord};

#[derive(Debug, Default)]
pub struct BruteForceFinder {
    points: Vec<DVec4>,
    ranks: Vec<u32>,
}

impl BruteForceFinder {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_filtered(
        &self,
        point: DVec4,
        radius: f64,
        out: &mut Vec<NeighbourRecord>,
        mut accept: impl FnMut(usize) -> bool,
    ) {
        out.clear();
        let radius_sqr = radius * radius;
        for (j, p) in self.points.iter().enumerate() {
            let dist_sqr = (p.truncate() - point.truncate()).length_squared();
            if dist_sqr < radius_sqr && accept(j) {
                out.push(NeighbourRecord {
                    index: j,
                    distance_sqr: dist_sqr,
                });
            }
        }
    }
}

impl NeighbourFinder for BruteForceFinder {
    fn build(&mut self, _scheduler: Scheduler, points: &[DVec4]) -> SfResult<()> {
        self.points = points.to_vec();
        self.ranks = compute_ranks(points);
        Ok(())
    }

    fn find_all(&self, index: usize, radius: f64, out: &mut Vec<NeighbourRecord>) {
        self.find_filtered(self.points[index], radius, out, |_| true);
    }

    fn find_all_at(&self, point: DVec4, radius: f64, out: &mut Vec<NeighbourRecord>) {
        self.find_filtered(point, radius, out, |_| true);
    }

    fn find_lower_rank(&self, index: usize, radius: f64, out: &mut Vec<NeighbourRecord>) {
        let rank = self.ranks[index];
        self.find_filtered(self.points[index], radius, out, |j| self.ranks[j] < rank);
    }
}
