// crates/sf_index/src/kd_tree.rs

//! kd 树邻居查找
//!
//! 滑动中点法构建：沿包围盒最长轴在盒心剖分，一侧为空时
//! 把分割面滑到最近的点；同一分支连续滑动超过上限后退回
//! 中位数剖分。叶节点粒子数不超过 leaf_size。
//!
//! 节点存放在连续数组中，左子紧随父节点，右子以相对偏移寻址。
//! 大子树经调度器二路并行构建，布局与串行构建完全一致。
//!
//! 查询用显式栈，沿途只更新分割轴方向的距离平方分量，
//! 累计距离超过半径平方的子树整体剪枝。

use glam::{DVec3, DVec4};
use log::debug;
use sf_foundation::{Scheduler, SfResult};

use crate::bbox::Box3;
use crate::finder::{compute_ranks, NeighbourFinder, NeighbourRecord};

/// 同一分支允许的最大滑动次数
const MAX_SLIDES: u32 = 5;

/// 子树并行构建的最小粒子数
const PARALLEL_THRESHOLD: usize = 2048;

#[derive(Debug, Clone, Copy)]
enum KdNode {
    Inner {
        axis: u8,
        split: f64,
        /// 右子相对本节点的偏移；左子固定为本节点 + 1
        right_offset: u32,
    },
    Leaf {
        from: u32,
        to: u32,
    },
}

/// kd 树
#[derive(Debug)]
pub struct KdTree {
    leaf_size: usize,
    points: Vec<DVec4>,
    /// 粒子下标的剖分排列，叶节点持有其中一段
    idxs: Vec<u32>,
    nodes: Vec<KdNode>,
    ranks: Vec<u32>,
}

impl KdTree {
    pub fn new(leaf_size: usize) -> KdTree {
        KdTree {
            leaf_size: leaf_size.max(1),
            points: Vec::new(),
            idxs: Vec::new(),
            nodes: Vec::new(),
            ranks: Vec::new(),
        }
    }

    #[inline]
    fn coord(points: &[DVec4], idx: u32, axis: usize) -> f64 {
        Box3::axis(points[idx as usize].truncate(), axis)
    }

    /// 原地划分：谓词为真的下标移到左侧，返回左侧个数
    fn partition(
        points: &[DVec4],
        idxs: &mut [u32],
        axis: usize,
        split: f64,
        inclusive: bool,
    ) -> usize {
        let mut left = 0;
        for k in 0..idxs.len() {
            let c = Self::coord(points, idxs[k], axis);
            let goes_left = if inclusive { c <= split } else { c < split };
            if goes_left {
                idxs.swap(left, k);
                left += 1;
            }
        }
        left
    }

    fn build_sub(
        points: &[DVec4],
        idxs: &mut [u32],
        offset: usize,
        bbox: Box3,
        leaf_size: usize,
        slides: u32,
        scheduler: Scheduler,
    ) -> Vec<KdNode> {
        let n = idxs.len();
        if n <= leaf_size {
            return vec![KdNode::Leaf {
                from: offset as u32,
                to: (offset + n) as u32,
            }];
        }

        let axis = bbox.longest_axis();
        let extent = Box3::axis(bbox.size(), axis);
        let mut child_slides = 0;

        let (n_left, split) = if extent <= 0.0 {
            // 退化盒（所有点重合）：按下标折半
            (n / 2, Box3::axis(bbox.center(), axis))
        } else if slides >= MAX_SLIDES {
            // 中位数回退
            let mid = n / 2;
            idxs.select_nth_unstable_by(mid, |&a, &b| {
                Self::coord(points, a, axis)
                    .partial_cmp(&Self::coord(points, b, axis))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            (mid, Self::coord(points, idxs[mid], axis))
        } else {
            let center = Box3::axis(bbox.center(), axis);
            let nl = Self::partition(points, idxs, axis, center, false);
            if nl > 0 && nl < n {
                (nl, center)
            } else if nl == 0 {
                // 全部在右侧：滑到最小坐标，含等值点划入左侧
                child_slides = slides + 1;
                let minc = idxs
                    .iter()
                    .map(|&i| Self::coord(points, i, axis))
                    .fold(f64::INFINITY, f64::min);
                let nl2 = Self::partition(points, idxs, axis, minc, true);
                if nl2 == n {
                    (n / 2, minc)
                } else {
                    (nl2, minc)
                }
            } else {
                // 全部在左侧：滑到最大坐标
                child_slides = slides + 1;
                let maxc = idxs
                    .iter()
                    .map(|&i| Self::coord(points, i, axis))
                    .fold(f64::NEG_INFINITY, f64::max);
                let nl2 = Self::partition(points, idxs, axis, maxc, false);
                if nl2 == 0 {
                    (n / 2, maxc)
                } else {
                    (nl2, maxc)
                }
            }
        };

        let (left_box, right_box) = bbox.split(axis, split);
        let (left_idxs, right_idxs) = idxs.split_at_mut(n_left);

        let mut build_left = || {
            Self::build_sub(
                points,
                left_idxs,
                offset,
                left_box,
                leaf_size,
                child_slides,
                scheduler,
            )
        };
        let mut build_right = || {
            Self::build_sub(
                points,
                right_idxs,
                offset + n_left,
                right_box,
                leaf_size,
                child_slides,
                scheduler,
            )
        };
        let (left, right) = if n > PARALLEL_THRESHOLD {
            scheduler.join(build_left, build_right)
        } else {
            (build_left(), build_right())
        };

        let mut nodes = Vec::with_capacity(1 + left.len() + right.len());
        nodes.push(KdNode::Inner {
            axis: axis as u8,
            split,
            right_offset: 1 + left.len() as u32,
        });
        nodes.extend(left);
        nodes.extend(right);
        nodes
    }

    fn query(
        &self,
        point: DVec3,
        radius: f64,
        out: &mut Vec<NeighbourRecord>,
        accept: impl Fn(usize) -> bool,
    ) {
        out.clear();
        if self.points.is_empty() || radius <= 0.0 {
            return;
        }
        let radius_sqr = radius * radius;
        // (节点, 已累计的轴向距离平方, 各轴距离分量)
        let mut stack: Vec<(u32, f64, DVec3)> = vec![(0, 0.0, DVec3::ZERO)];
        while let Some((ni, size_sqr, diff)) = stack.pop() {
            match self.nodes[ni as usize] {
                KdNode::Leaf { from, to } => {
                    for k in from..to {
                        let j = self.idxs[k as usize] as usize;
                        let dist_sqr =
                            (self.points[j].truncate() - point).length_squared();
                        if dist_sqr < radius_sqr && accept(j) {
                            out.push(NeighbourRecord {
                                index: j,
                                distance_sqr: dist_sqr,
                            });
                        }
                    }
                }
                KdNode::Inner {
                    axis,
                    split,
                    right_offset,
                } => {
                    let axis = axis as usize;
                    let d = Box3::axis(point, axis) - split;
                    let left = ni + 1;
                    let right = ni + right_offset;
                    let (near, far) = if d < 0.0 { (left, right) } else { (right, left) };
                    stack.push((near, size_sqr, diff));

                    // 只有分割轴分量变化，增量更新距离平方
                    let old = Box3::axis(diff, axis);
                    let far_sqr = size_sqr - old * old + d * d;
                    if far_sqr < radius_sqr {
                        let mut far_diff = diff;
                        match axis {
                            0 => far_diff.x = d,
                            1 => far_diff.y = d,
                            _ => far_diff.z = d,
                        }
                        stack.push((far, far_sqr, far_diff));
                    }
                }
            }
        }
    }
}

impl NeighbourFinder for KdTree {
    fn build(&mut self, scheduler: Scheduler, points: &[DVec4]) -> SfResult<()> {
        self.points = points.to_vec();
        self.ranks = compute_ranks(points);
        self.idxs = (0..points.len() as u32).collect();
        if points.is_empty() {
            self.nodes = vec![KdNode::Leaf { from: 0, to: 0 }];
            return Ok(());
        }
        let bbox = Box3::from_points(points);
        self.nodes = Self::build_sub(
            points,
            &mut self.idxs,
            0,
            bbox,
            self.leaf_size,
            0,
            scheduler,
        );
        debug!(
            "kd 树构建完成: {} 粒子, {} 节点",
            points.len(),
            self.nodes.len()
        );
        Ok(())
    }

    fn find_all(&self, index: usize, radius: f64, out: &mut Vec<NeighbourRecord>) {
        self.query(self.points[index].truncate(), radius, out, |_| true);
    }

    fn find_all_at(&self, point: DVec4, radius: f64, out: &mut Vec<NeighbourRecord>) {
        self.query(point.truncate(), radius, out, |_| true);
    }

    fn find_lower_rank(&self, index: usize, radius: f64, out: &mut Vec<NeighbourRecord>) {
        let rank = self.ranks[index];
        self.query(self.points[index].truncate(), radius, out, |j| {
            self.ranks[j] < rank
        });
    }
}

// ============================================================
// 测试
// ============================================================
