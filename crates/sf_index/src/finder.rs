// crates/sf_index/src/finder.rs

//! 邻居查找接口

use glam::DVec4;
use sf_foundation::{Scheduler, SfResult};

/// 一条邻居记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighbourRecord {
    pub index: usize,
    pub distance_sqr: f64,
}

/// 邻居查找接口
///
/// 查询只比较 xyz 距离，结果含查询点自身（距离 0）。
/// 半径比较为严格小于，radius = 0 时无结果。
pub trait NeighbourFinder: Send + Sync {
    /// 重建索引结构
    ///
    /// 同时按光滑长度降序（并列按下标升序）确定每个粒子的秩，
    /// 供 [`NeighbourFinder::find_lower_rank`] 过滤使用。
    fn build(&mut self, scheduler: Scheduler, points: &[DVec4]) -> SfResult<()>;

    /// 查找下标 index 粒子半径 radius 内的全部邻居
    fn find_all(&self, index: usize, radius: f64, out: &mut Vec<NeighbourRecord>);

    /// 查找任意位置半径 radius 内的全部邻居
    fn find_all_at(&self, point: DVec4, radius: f64, out: &mut Vec<NeighbourRecord>);

    /// 只返回秩严格小于查询粒子的邻居（对称求值去重用）
    fn find_lower_rank(&self, index: usize, radius: f64, out: &mut Vec<NeighbourRecord>);
}

/// 按光滑长度降序排秩，并列按下标升序
pub(crate) fn compute_ranks(points: &[DVec4]) -> Vec<u32> {
    let mut order: Vec<u32> = (0..points.len() as u32).collect();
    order.sort_by(|&a, &b| {
        let ha = points[a as usize].w;
        let hb = points[b as usize].w;
        hb.partial_cmp(&ha)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    let mut ranks = vec![0u32; points.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx as usize] = rank as u32;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_by_descending_h() {
        let points = [
            DVec4::new(0.0, 0.0, 0.0, 0.5),
            DVec4::new(1.0, 0.0, 0.0, 2.0),
            DVec4::new(2.0, 0.0, 0.0, 1.0),
        ];
        let ranks = compute_ranks(&points);
        // h 最大的秩最小
        assert_eq!(ranks, vec![2, 0, 1]);
    }

    #[test]
    fn test_ranks_tie_by_index() {
        let points = [
            DVec4::new(0.0, 0.0, 0.0, 1.0),
            DVec4::new(1.0, 0.0, 0.0, 1.0),
        ];
        let ranks = compute_ranks(&points);
        assert_eq!(ranks, vec![0, 1]);
    }
}
