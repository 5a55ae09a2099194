// crates/sf_foundation/src/scheduler.rs

//! 并行调度抽象
//!
//! 粒子循环按连续分块划分，每块持有独立的工作上下文，
//! 归约按块序进行以保证结果可复现。
//! `Sequential` 用于调试与基准对照，`Rayon` 为默认并行后端。

use std::ops::Range;

/// 并行调度策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduler {
    /// 串行执行（单块）
    Sequential,
    /// rayon 线程池
    Rayon,
}

impl Scheduler {
    /// 可用的工作块数
    pub fn chunk_count(&self) -> usize {
        match self {
            Scheduler::Sequential => 1,
            Scheduler::Rayon => rayon::current_num_threads(),
        }
    }

    /// 将 [0, n) 均匀划分为至多 max_chunks 个连续区间
    ///
    /// 每块至少 min_chunk 个元素（最后一块例外），空区间不生成。
    pub fn partition(n: usize, max_chunks: usize, min_chunk: usize) -> Vec<Range<usize>> {
        if n == 0 {
            return Vec::new();
        }
        let chunks = max_chunks
            .max(1)
            .min((n / min_chunk.max(1)).max(1));
        let base = n / chunks;
        let rem = n % chunks;
        let mut ranges = Vec::with_capacity(chunks);
        let mut start = 0;
        for i in 0..chunks {
            let len = base + usize::from(i < rem);
            ranges.push(start..start + len);
            start += len;
        }
        ranges
    }

    /// 对每个分块并行执行 func(range, ctx)
    ///
    /// ranges 与 ctxs 一一对应；每个上下文只被一个任务独占访问。
    pub fn run_chunked<C, F>(&self, ranges: &[Range<usize>], ctxs: &mut [C], func: F)
    where
        C: Send,
        F: Fn(Range<usize>, &mut C) + Sync,
    {
        debug_assert_eq!(ranges.len(), ctxs.len());
        match self {
            Scheduler::Sequential => {
                for (range, ctx) in ranges.iter().zip(ctxs.iter_mut()) {
                    func(range.clone(), ctx);
                }
            }
            Scheduler::Rayon => {
                use rayon::prelude::*;
                ctxs.par_iter_mut()
                    .zip(ranges.par_iter())
                    .for_each(|(ctx, range)| func(range.clone(), ctx));
            }
        }
    }

    /// 二路任务划分（递归构建 kd 树用）
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        match self {
            Scheduler::Sequential => (a(), b()),
            Scheduler::Rayon => rayon::join(a, b),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::Rayon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_covers_range() {
        let ranges = Scheduler::partition(10, 3, 1);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0], 0..4);
        assert_eq!(ranges[1], 4..7);
        assert_eq!(ranges[2], 7..10);
    }

    #[test]
    fn test_partition_min_chunk() {
        // 最小块长限制了块数
        let ranges = Scheduler::partition(10, 8, 4);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], 0..5);
        assert_eq!(ranges[1], 5..10);
        // 不足一个最小块时只生成一块
        let ranges = Scheduler::partition(3, 8, 4);
        assert_eq!(ranges, vec![0..3]);
    }

    #[test]
    fn test_partition_empty() {
        assert!(Scheduler::partition(0, 4, 1).is_empty());
    }

    #[test]
    fn test_run_chunked_sequential() {
        let ranges = Scheduler::partition(100, 4, 1);
        let mut sums = vec![0usize; ranges.len()];
        Scheduler::Sequential.run_chunked(&ranges, &mut sums, |range, sum| {
            *sum = range.sum();
        });
        let total: usize = sums.iter().sum();
        assert_eq!(total, 99 * 100 / 2);
    }

    #[test]
    fn test_run_chunked_rayon_matches() {
        let ranges = Scheduler::partition(1000, 7, 1);
        let mut seq = vec![0usize; ranges.len()];
        let mut par = vec![0usize; ranges.len()];
        let body = |range: Range<usize>, sum: &mut usize| *sum = range.map(|i| i * i).sum();
        Scheduler::Sequential.run_chunked(&ranges, &mut seq, body);
        Scheduler::Rayon.run_chunked(&ranges, &mut par, body);
        assert_eq!(seq, par);
    }
}
