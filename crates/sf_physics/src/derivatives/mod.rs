// crates/sf_physics/src/derivatives/mod.rs

//! 空间导数的装配与求值
//!
//! 方程项在装配阶段向 [`DerivativeHolder`] 申报所需导数，
//! 同类导数自动去重；求解器在粒子循环中对每个粒子依次求值
//! 全部导数，结果写入线程私有的 [`Accumulated`]。
//!
//! 求值分两个阶段：预计算阶段产出修正张量等中间量，
//! 求值阶段消费它们。同一粒子的两阶段在同一轮循环内完成。

pub mod av;
pub mod forces;
pub mod velocity;

use glam::DVec4;
use sf_foundation::{SfError, SfResult, TracelessTensor3};
use sf_storage::{QuantityId, Storage};

use crate::accumulated::Accumulated;

pub use av::ArtificialViscosity;
pub use forces::{PressureGradient, StressDivergence};
pub use velocity::{CorrectionTensor, VelocityDivergence, VelocityGradient, VelocityRotation};

/// 求值阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DerivativePhase {
    /// 产出中间量（核梯度修正张量等）
    Precompute = 0,
    /// 常规导数求值
    Evaluation = 1,
}

/// 导数种类（用于去重）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeKind {
    VelocityDivergence,
    VelocityGradient,
    VelocityRotation,
    CorrectionTensor,
    PressureGradient,
    StressDivergence,
    ArtificialViscosity,
}

/// 导数标识：种类 + 变体编码
///
/// 同种导数只能以一种变体出现；两个方程项要求同种不同变体
/// 属于装配冲突。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivativeKey {
    pub kind: DerivativeKind,
    pub variant: u32,
}

impl DerivativeKey {
    pub fn new(kind: DerivativeKind, variant: u32) -> DerivativeKey {
        DerivativeKey { kind, variant }
    }
}

/// 粒子循环期间对存储的只读视图
///
/// 必备量缺失在绑定时报错，可选量以 `Option` 暴露，
/// 由各导数自行决定缺失时的行为。
pub struct StorageView<'a> {
    /// 位置（w 为光滑长度）
    pub r: &'a [DVec4],
    /// 速度（w 为 dh/dt）
    pub v: &'a [DVec4],
    pub m: &'a [f64],
    pub rho: &'a [f64],
    pub p: Option<&'a [f64]>,
    pub cs: Option<&'a [f64]>,
    pub s: Option<&'a [TracelessTensor3]>,
    pub reduce: Option<&'a [f64]>,
    pub flag: Option<&'a [u64]>,
    /// 上一步存储的速度散度（Balsara 开关用）
    pub divv: Option<&'a [f64]>,
    /// 上一步存储的速度旋度
    pub rotv: Option<&'a [DVec4]>,
}

fn optional_scalar(storage: &Storage, id: QuantityId) -> SfResult<Option<&[f64]>> {
    if storage.has(id) {
        Ok(Some(storage.values::<f64>(id)?))
    } else {
        Ok(None)
    }
}

impl<'a> StorageView<'a> {
    pub fn bind(storage: &'a Storage) -> SfResult<StorageView<'a>> {
        let position = storage.get(QuantityId::Position)?;
        let view = StorageView {
            r: position.values::<DVec4>()?,
            v: position.dt::<DVec4>()?,
            m: storage.values::<f64>(QuantityId::Mass)?,
            rho: storage.values::<f64>(QuantityId::Density)?,
            p: optional_scalar(storage, QuantityId::Pressure)?,
            cs: optional_scalar(storage, QuantityId::SoundSpeed)?,
            s: if storage.has(QuantityId::DeviatoricStress) {
                Some(storage.values::<TracelessTensor3>(QuantityId::DeviatoricStress)?)
            } else {
                None
            },
            reduce: optional_scalar(storage, QuantityId::StressReducing)?,
            flag: if storage.has(QuantityId::Flag) {
                Some(storage.values::<u64>(QuantityId::Flag)?)
            } else {
                None
            },
            divv: optional_scalar(storage, QuantityId::VelocityDivergence)?,
            rotv: if storage.has(QuantityId::VelocityRotation) {
                Some(storage.values::<DVec4>(QuantityId::VelocityRotation)?)
            } else {
                None
            },
        };
        Ok(view)
    }

    /// 粒子对是否参与强度项：同体且两端均未完全折减
    #[inline]
    pub fn bonded(&self, i: usize, j: usize) -> bool {
        if let Some(flag) = self.flag {
            if flag[i] != flag[j] {
                return false;
            }
        }
        if let Some(reduce) = self.reduce {
            if reduce[i] == 0.0 || reduce[j] == 0.0 {
                return false;
            }
        }
        true
    }
}

/// 单个空间导数
///
/// `create` 在装配阶段注册输出缓冲；`eval` 对粒子 i
/// 及其全部邻居一次性求值（邻居下标与对称化核梯度等长）。
pub trait Derivative: Send + Sync {
    fn phase(&self) -> DerivativePhase {
        DerivativePhase::Evaluation
    }

    fn key(&self) -> DerivativeKey;

    fn create(&mut self, acc: &mut Accumulated) -> SfResult<()>;

    fn eval(
        &self,
        input: &StorageView<'_>,
        i: usize,
        neighs: &[usize],
        grads: &[DVec4],
        acc: &mut Accumulated,
    );
}

/// 导数集合与累加器原型
#[derive(Default)]
pub struct DerivativeHolder {
    derivatives: Vec<Box<dyn Derivative>>,
    prototype: Accumulated,
    created: bool,
}

impl DerivativeHolder {
    pub fn new() -> DerivativeHolder {
        DerivativeHolder::default()
    }

    /// 申报导数；同键去重，同种不同变体报错
    pub fn require(&mut self, derivative: Box<dyn Derivative>) -> SfResult<()> {
        let key = derivative.key();
        if let Some(existing) = self.derivatives.iter().find(|d| d.key().kind == key.kind) {
            if existing.key() == key {
                return Ok(());
            }
            return Err(SfError::setup(format!(
                "导数 {:?} 以不同变体重复申报",
                key.kind
            )));
        }
        self.derivatives.push(derivative);
        Ok(())
    }

    /// 固定求值顺序并注册全部输出缓冲
    ///
    /// 预计算导数排在前面，保证同粒子求值时中间量已就绪。
    pub fn create_layout(&mut self) -> SfResult<()> {
        if self.created {
            return Err(SfError::setup("导数布局已创建"));
        }
        self.derivatives.sort_by_key(|d| d.phase());
        for derivative in self.derivatives.iter_mut() {
            derivative.create(&mut self.prototype)?;
        }
        self.created = true;
        Ok(())
    }

    /// 累加器原型（每个工作分块克隆一份）
    pub fn prototype(&self) -> &Accumulated {
        &self.prototype
    }

    pub fn derivative_cnt(&self) -> usize {
        self.derivatives.len()
    }

    pub fn has(&self, kind: DerivativeKind) -> bool {
        self.derivatives.iter().any(|d| d.key().kind == kind)
    }

    /// 对粒子 i 求值全部导数
    #[inline]
    pub fn eval_all(
        &self,
        input: &StorageView<'_>,
        i: usize,
        neighs: &[usize],
        grads: &[DVec4],
        acc: &mut Accumulated,
    ) {
        debug_assert_eq!(neighs.len(), grads.len());
        for derivative in &self.derivatives {
            derivative.eval(input, i, neighs, grads, acc);
        }
    }
}

// ============================================================
// 测试
// ============================================================
