// crates/sf_index/tests/finder_equivalence.rs

//! kd 树与暴力查找的等价性
//!
//! 随机粒子云上逐粒子对比两种查找器的结果集，
//! 覆盖 find_all 与 find_lower_rank 两种模式。

use glam::DVec4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sf_foundation::Scheduler;
use sf_index::{BruteForceFinder, KdTree, NeighbourFinder, NeighbourRecord};

fn random_cloud(rng: &mut StdRng, n: usize, extent: f64) -> Vec<DVec4> {
    (0..n)
        .map(|_| {
            DVec4::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(0.05..0.3),
            )
        })
        .collect()
}

fn sorted(mut records: Vec<NeighbourRecord>) -> Vec<NeighbourRecord> {
    records.sort_by_key(|n| n.index);
    records
}

#[test]
fn kd_tree_matches_brute_force_find_all() {
    let mut rng = StdRng::seed_from_u64(42);
    for &n in &[1usize, 10, 333, 2000] {
        let points = random_cloud(&mut rng, n, 1.0);
        let mut tree = KdTree::new(25);
        let mut brute = BruteForceFinder::new();
        tree.build(Scheduler::Rayon, &points).unwrap();
        brute.build(Scheduler::Sequential, &points).unwrap();

        let mut out_tree = Vec::new();
        let mut out_brute = Vec::new();
        for i in 0..n {
            for radius in [0.0, 0.1, 0.45, 3.5] {
                tree.find_all(i, radius, &mut out_tree);
                brute.find_all(i, radius, &mut out_brute);
                assert_eq!(
                    sorted(out_tree.clone()),
                    sorted(out_brute.clone()),
                    "n={n} i={i} radius={radius}"
                );
            }
        }
    }
}

#[test]
fn kd_tree_matches_brute_force_lower_rank() {
    let mut rng = StdRng::seed_from_u64(7);
    let points = random_cloud(&mut rng, 500, 1.0);
    let mut tree = KdTree::new(25);
    let mut brute = BruteForceFinder::new();
    tree.build(Scheduler::Rayon, &points).unwrap();
    brute.build(Scheduler::Sequential, &points).unwrap();

    let mut out_tree = Vec::new();
    let mut out_brute = Vec::new();
    for i in 0..points.len() {
        tree.find_lower_rank(i, 0.4, &mut out_tree);
        brute.find_lower_rank(i, 0.4, &mut out_brute);
        assert_eq!(sorted(out_tree.clone()), sorted(out_brute.clone()), "i={i}");
    }
}

#[test]
fn lower_rank_visits_each_pair_once() {
    // 每条邻居对恰好被秩较高的一端看到一次
    let mut rng = StdRng::seed_from_u64(99);
    let points = random_cloud(&mut rng, 300, 1.0);
    let mut tree = KdTree::new(25);
    tree.build(Scheduler::Sequential, &points).unwrap();

    let radius = 0.35;
    let mut pair_cnt = 0usize;
    let mut out = Vec::new();
    for i in 0..points.len() {
        tree.find_lower_rank(i, radius, &mut out);
        pair_cnt += out.len();
    }

    let mut all_cnt = 0usize;
    for i in 0..points.len() {
        tree.find_all(i, radius, &mut out);
        // 去掉自身
        all_cnt += out.iter().filter(|n| n.index != i).count();
    }
    assert_eq!(pair_cnt * 2, all_cnt);
}

#[test]
fn duplicate_points_handled() {
    let mut points = vec![DVec4::new(0.5, 0.5, 0.5, 0.1); 60];
    points.extend((0..40).map(|i| DVec4::new(i as f64 * 0.01, 0.0, 0.0, 0.1)));
    let mut tree = KdTree::new(8);
    let mut brute = BruteForceFinder::new();
    tree.build(Scheduler::Sequential, &points).unwrap();
    brute.build(Scheduler::Sequential, &points).unwrap();

    let mut out_tree = Vec::new();
    let mut out_brute = Vec::new();
    for i in 0..points.len() {
        tree.find_all(i, 0.2, &mut out_tree);
        brute.find_all(i, 0.2, &mut out_brute);
        assert_eq!(sorted(out_tree.clone()), sorted(out_brute.clone()));
    }
}
