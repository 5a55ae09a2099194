// crates/sf_index/src/lib.rs

//! StoneFlow 空间索引层
//!
//! 提供 SPH 邻居查找：生产路径为滑动中点 kd 树 [`KdTree`]，
//! 另有 O(n²) 的 [`BruteForceFinder`] 作为测试参照。
//! 所有距离只计 xyz 分量，粒子向量的 w（光滑长度）不参与度量。

pub mod bbox;
pub mod brute_force;
pub mod finder;
pub mod kd_tree;

pub use bbox::Box3;
pub use brute_force::BruteForceFinder;
pub use finder::{NeighbourFinder, NeighbourRecord};
pub use kd_tree::KdTree;
