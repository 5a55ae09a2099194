// crates/sf_physics/src/statistics.rs

//! 运行统计
//!
//! 求解器与时间步进器把每步的诊断量写入这里，
//! 由命令行与日志消费。

use sf_foundation::MinMaxMean;

/// 统计条目标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsId {
    /// 当前时间步 [s]
    Timestep,
    /// 限制时间步的判据名称
    LimitingCriterion,
    /// 每粒子邻居数
    NeighbourCnt,
    /// 粒子总数
    ParticleCnt,
}

#[derive(Debug, Clone)]
pub enum StatsValue {
    Int(i64),
    Float(f64),
    Means(MinMaxMean),
    Text(String),
}

/// 统计容器
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    entries: Vec<(StatisticsId, StatsValue)>,
}

impl Statistics {
    pub fn new() -> Statistics {
        Statistics::default()
    }

    pub fn set(&mut self, id: StatisticsId, value: StatsValue) {
        if let Some(entry) = self.entries.iter_mut().find(|(eid, _)| *eid == id) {
            entry.1 = value;
        } else {
            self.entries.push((id, value));
        }
    }

    pub fn get(&self, id: StatisticsId) -> Option<&StatsValue> {
        self.entries
            .iter()
            .find(|(eid, _)| *eid == id)
            .map(|(_, v)| v)
    }

    /// 数值条目，缺失或非数值时返回 fallback
    pub fn get_f64_or(&self, id: StatisticsId, fallback: f64) -> f64 {
        match self.get(id) {
            Some(StatsValue::Float(v)) => *v,
            Some(StatsValue::Int(v)) => *v as f64,
            _ => fallback,
        }
    }
}
