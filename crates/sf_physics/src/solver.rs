// crates/sf_physics/src/solver.rs

//! 非对称 SPH 求解器
//!
//! 每步流程：材料初始化（状态方程 + 流变折减）→ 重建 kd 树 →
//! 分块粒子循环（每块独占一份累加器，逐粒子查邻居、算核梯度、
//! 求值全部导数）→ 按块序归约 → 写回存储 → 方程项收尾。
//!
//! 非对称指每个粒子独立累加自己的全部邻居贡献：重复算一遍
//! 对称项换来无锁并行与可复现的归约顺序。
//!
//! 搜索半径取 ½(κhᵢ + κh_max) 并按对称化核支撑 κh̄ᵢⱼ 过滤，
//! 保证光滑长度不等的粒子对仍被对称地找到。

use glam::DVec4;
use log::debug;
use sf_config::{KernelChoice, RunConfig};
use sf_foundation::{MinMaxMean, Scheduler, SfError, SfResult};
use sf_index::{KdTree, NeighbourFinder, NeighbourRecord};
use sf_storage::{OrderEnum, QuantityId, Storage};

use crate::accumulated::Accumulated;
use crate::derivatives::{DerivativeHolder, StorageView};
use crate::equations::EquationHolder;
use crate::kernel::{CubicSpline, FourthOrderSpline, Kernel, LutKernel};
use crate::statistics::{Statistics, StatisticsId, StatsValue};

/// 每个工作分块的私有上下文
struct ChunkContext {
    acc: Accumulated,
    records: Vec<NeighbourRecord>,
    idxs: Vec<usize>,
    grads: Vec<DVec4>,
    counts: Vec<u64>,
}

pub struct AsymmetricSolver {
    scheduler: Scheduler,
    kernel: LutKernel,
    finder: KdTree,
    equations: EquationHolder,
    derivatives: DerivativeHolder,
    granularity: usize,
    h_min: f64,
}

impl AsymmetricSolver {
    pub fn new(
        scheduler: Scheduler,
        config: &RunConfig,
        equations: EquationHolder,
    ) -> SfResult<AsymmetricSolver> {
        if equations.smoothing_policy_cnt() != 1 {
            return Err(SfError::setup(format!(
                "求解器需要恰好一个光滑长度策略, 实际 {}",
                equations.smoothing_policy_cnt()
            )));
        }
        let kernel = match config.solver.kernel {
            KernelChoice::CubicSpline => LutKernel::new(&CubicSpline as &dyn Kernel),
            KernelChoice::FourthOrderSpline => LutKernel::new(&FourthOrderSpline),
        };
        let mut derivatives = DerivativeHolder::new();
        equations.set_derivatives(&mut derivatives, &config.solver)?;
        derivatives.create_layout()?;
        debug!(
            "求解器装配完成: {} 个方程项, {} 个导数",
            equations.term_cnt(),
            derivatives.derivative_cnt()
        );
        Ok(AsymmetricSolver {
            scheduler,
            kernel,
            finder: KdTree::new(config.finder.leaf_size),
            equations,
            derivatives,
            granularity: config.finder.granularity,
            h_min: config.smoothing.h_min,
        })
    }

    /// 核支撑半径 κ
    pub fn kernel_radius(&self) -> f64 {
        self.kernel.radius()
    }

    /// 光滑长度下限
    pub fn h_min(&self) -> f64 {
        self.h_min
    }

    /// 装配阶段：插入全部方程项与材料所需的物理量
    pub fn create(&self, storage: &mut Storage) -> SfResult<()> {
        storage.insert_uniform(QuantityId::NeighbourCnt, OrderEnum::Zero, 0u64)?;
        storage.create_materials()?;
        self.equations.create(storage)
    }

    /// 对当前状态求值全部时间导数
    pub fn integrate(
        &mut self,
        storage: &mut Storage,
        t: f64,
        stats: &mut Statistics,
    ) -> SfResult<()> {
        let n = storage.particle_cnt();
        storage.zero_highest_derivatives();
        storage.initialize_materials()?;
        self.equations.initialize(self.scheduler, storage, t)?;

        let kappa = self.kernel.radius();
        {
            let r = storage.values::<DVec4>(QuantityId::Position)?;
            self.finder.build(self.scheduler, r)?;
        }

        let ranges = Scheduler::partition(n, self.scheduler.chunk_count(), self.granularity);
        let mut ctxs: Vec<ChunkContext> = ranges
            .iter()
            .map(|range| {
                let mut acc = self.derivatives.prototype().clone();
                acc.initialize(n);
                ChunkContext {
                    acc,
                    records: Vec::new(),
                    idxs: Vec::new(),
                    grads: Vec::new(),
                    counts: vec![0; range.len()],
                }
            })
            .collect();

        {
            let view = StorageView::bind(storage)?;
            let max_radius = kappa * view.r.iter().map(|x| x.w).fold(0.0, f64::max);
            let finder = &self.finder;
            let kernel = &self.kernel;
            let derivatives = &self.derivatives;
            self.scheduler.run_chunked(&ranges, &mut ctxs, |range, ctx| {
                for i in range.clone() {
                    let ri = view.r[i];
                    // 大粒子也能看到小粒子: 搜索半径取到全局最大支撑的一半
                    let radius = 0.5 * (kappa * ri.w + max_radius);
                    finder.find_all(i, radius, &mut ctx.records);
                    ctx.idxs.clear();
                    ctx.grads.clear();
                    for record in &ctx.records {
                        let j = record.index;
                        if j == i {
                            continue;
                        }
                        let support = kappa * 0.5 * (ri.w + view.r[j].w);
                        if record.distance_sqr >= support * support {
                            continue;
                        }
                        ctx.idxs.push(j);
                        ctx.grads.push(kernel.grad_symmetrized(ri, view.r[j]));
                    }
                    ctx.counts[i - range.start] = ctx.idxs.len() as u64;
                    derivatives.eval_all(&view, i, &ctx.idxs, &ctx.grads, &mut ctx.acc);
                }
            });
        }

        // 按块序归约, 结果与串行一致
        let mut total = self.derivatives.prototype().clone();
        total.initialize(n);
        for ctx in &ctxs {
            total.sum(&ctx.acc);
        }
        total.store(storage)?;

        let mut means = MinMaxMean::new();
        {
            let counts = storage.values_mut::<u64>(QuantityId::NeighbourCnt)?;
            for (range, ctx) in ranges.iter().zip(&ctxs) {
                counts[range.clone()].copy_from_slice(&ctx.counts);
            }
            for &c in counts.iter() {
                means.accumulate(c as f64);
            }
        }
        stats.set(StatisticsId::ParticleCnt, StatsValue::Int(n as i64));
        stats.set(StatisticsId::NeighbourCnt, StatsValue::Means(means));

        self.equations.finalize(self.scheduler, storage, t)
    }
}

// ============================================================
// 测试
// ============================================================
