// crates/sf_storage/src/quantity.rs

//! 物理量缓冲
//!
//! 一个 [`Quantity`] 持有值缓冲以及 0~2 个时间导数缓冲，
//! 全部缓冲等长同类型。类型通过 [`ValueKind`] 标签区分，
//! 类型化访问经由 [`QuantityValue`] trait 在运行时校验。

use glam::DVec4;
use sf_foundation::{SfError, SfResult, SymTensor3, TracelessTensor3};

/// 物理量标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum QuantityId {
    /// 位置（w 分量为光滑长度）
    Position = 0,
    /// 粒子质量
    Mass = 1,
    /// 密度
    Density = 2,
    /// 比内能
    Energy = 3,
    /// 压强
    Pressure = 4,
    /// 声速
    SoundSpeed = 5,
    /// 偏应力张量
    DeviatoricStress = 6,
    /// 速度散度
    VelocityDivergence = 7,
    /// 速度梯度（对称部分）
    VelocityGradient = 8,
    /// 速度旋度
    VelocityRotation = 9,
    /// 屈服折减系数
    StressReducing = 10,
    /// 标量损伤
    Damage = 11,
    /// 最小激活应变
    EpsMin = 12,
    /// 缺陷数
    FlawCount = 13,
    /// 缺陷分布指数
    FlawExponent = 14,
    /// 邻居数
    NeighbourCnt = 15,
    /// 体标记（粒子属于哪个物体）
    Flag = 16,
    /// 核梯度修正张量
    CorrectionTensor = 17,
    /// Balsara 开关系数
    AvBalsara = 18,
}

impl QuantityId {
    /// 全部标识（IO 反序列化用）
    pub fn from_u32(value: u32) -> Option<QuantityId> {
        use QuantityId::*;
        const ALL: [QuantityId; 19] = [
            Position,
            Mass,
            Density,
            Energy,
            Pressure,
            SoundSpeed,
            DeviatoricStress,
            VelocityDivergence,
            VelocityGradient,
            VelocityRotation,
            StressReducing,
            Damage,
            EpsMin,
            FlawCount,
            FlawExponent,
            NeighbourCnt,
            Flag,
            CorrectionTensor,
            AvBalsara,
        ];
        ALL.get(value as usize).copied()
    }
}

impl std::fmt::Display for QuantityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QuantityId::Position => "position",
            QuantityId::Mass => "mass",
            QuantityId::Density => "density",
            QuantityId::Energy => "energy",
            QuantityId::Pressure => "pressure",
            QuantityId::SoundSpeed => "sound speed",
            QuantityId::DeviatoricStress => "deviatoric stress",
            QuantityId::VelocityDivergence => "velocity divergence",
            QuantityId::VelocityGradient => "velocity gradient",
            QuantityId::VelocityRotation => "velocity rotation",
            QuantityId::StressReducing => "stress reducing",
            QuantityId::Damage => "damage",
            QuantityId::EpsMin => "activation strain",
            QuantityId::FlawCount => "flaw count",
            QuantityId::FlawExponent => "flaw exponent",
            QuantityId::NeighbourCnt => "neighbour count",
            QuantityId::Flag => "flag",
            QuantityId::CorrectionTensor => "correction tensor",
            QuantityId::AvBalsara => "balsara factor",
        };
        f.write_str(name)
    }
}

/// 物理量阶数：携带几阶时间导数
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum OrderEnum {
    /// 无导数，由求解器直接覆盖
    Zero = 0,
    /// 一阶（值 + dv/dt）
    First = 1,
    /// 二阶（值 + dv/dt + d²v/dt²）
    Second = 2,
}

impl OrderEnum {
    #[inline]
    pub fn buffer_cnt(&self) -> usize {
        *self as usize + 1
    }

    pub fn from_u8(value: u8) -> Option<OrderEnum> {
        match value {
            0 => Some(OrderEnum::Zero),
            1 => Some(OrderEnum::First),
            2 => Some(OrderEnum::Second),
            _ => None,
        }
    }
}

/// 缓冲元素类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueKind {
    Scalar = 0,
    Vector = 1,
    SymTensor = 2,
    TracelessTensor = 3,
    Index = 4,
}

impl ValueKind {
    /// 每元素的 8 字节字数（IO 用）
    pub fn component_cnt(&self) -> usize {
        match self {
            ValueKind::Scalar | ValueKind::Index => 1,
            ValueKind::Vector => 4,
            ValueKind::SymTensor => 6,
            ValueKind::TracelessTensor => 5,
        }
    }

    pub fn from_u8(value: u8) -> Option<ValueKind> {
        match value {
            0 => Some(ValueKind::Scalar),
            1 => Some(ValueKind::Vector),
            2 => Some(ValueKind::SymTensor),
            3 => Some(ValueKind::TracelessTensor),
            4 => Some(ValueKind::Index),
            _ => None,
        }
    }
}

/// 带类型标签的缓冲区
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityBuffer {
    Scalar(Vec<f64>),
    Vector(Vec<DVec4>),
    SymTensor(Vec<SymTensor3>),
    TracelessTensor(Vec<TracelessTensor3>),
    Index(Vec<u64>),
}

impl QuantityBuffer {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            QuantityBuffer::Scalar(v) => v.len(),
            QuantityBuffer::Vector(v) => v.len(),
            QuantityBuffer::SymTensor(v) => v.len(),
            QuantityBuffer::TracelessTensor(v) => v.len(),
            QuantityBuffer::Index(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            QuantityBuffer::Scalar(_) => ValueKind::Scalar,
            QuantityBuffer::Vector(_) => ValueKind::Vector,
            QuantityBuffer::SymTensor(_) => ValueKind::SymTensor,
            QuantityBuffer::TracelessTensor(_) => ValueKind::TracelessTensor,
            QuantityBuffer::Index(_) => ValueKind::Index,
        }
    }

    /// 同类型同长度的零缓冲
    pub fn zeroed_like(&self) -> QuantityBuffer {
        QuantityBuffer::zeroed(self.kind(), self.len())
    }

    /// 指定类型与长度的零缓冲
    pub fn zeroed(kind: ValueKind, n: usize) -> QuantityBuffer {
        match kind {
            ValueKind::Scalar => QuantityBuffer::Scalar(vec![0.0; n]),
            ValueKind::Vector => QuantityBuffer::Vector(vec![DVec4::ZERO; n]),
            ValueKind::SymTensor => QuantityBuffer::SymTensor(vec![SymTensor3::ZERO; n]),
            ValueKind::TracelessTensor => {
                QuantityBuffer::TracelessTensor(vec![TracelessTensor3::ZERO; n])
            }
            ValueKind::Index => QuantityBuffer::Index(vec![0; n]),
        }
    }

    /// 原地清零
    pub fn fill_zero(&mut self) {
        match self {
            QuantityBuffer::Scalar(v) => v.fill(0.0),
            QuantityBuffer::Vector(v) => v.fill(DVec4::ZERO),
            QuantityBuffer::SymTensor(v) => v.fill(SymTensor3::ZERO),
            QuantityBuffer::TracelessTensor(v) => v.fill(TracelessTensor3::ZERO),
            QuantityBuffer::Index(v) => v.fill(0),
        }
    }

    /// 调整长度：截断或补零
    pub fn resize(&mut self, n: usize) {
        match self {
            QuantityBuffer::Scalar(v) => v.resize(n, 0.0),
            QuantityBuffer::Vector(v) => v.resize(n, DVec4::ZERO),
            QuantityBuffer::SymTensor(v) => v.resize(n, SymTensor3::ZERO),
            QuantityBuffer::TracelessTensor(v) => v.resize(n, TracelessTensor3::ZERO),
            QuantityBuffer::Index(v) => v.resize(n, 0),
        }
    }

    /// 追加另一缓冲的全部元素（类型须一致）
    pub fn extend_from(&mut self, other: &QuantityBuffer) -> SfResult<()> {
        match (self, other) {
            (QuantityBuffer::Scalar(a), QuantityBuffer::Scalar(b)) => a.extend_from_slice(b),
            (QuantityBuffer::Vector(a), QuantityBuffer::Vector(b)) => a.extend_from_slice(b),
            (QuantityBuffer::SymTensor(a), QuantityBuffer::SymTensor(b)) => a.extend_from_slice(b),
            (QuantityBuffer::TracelessTensor(a), QuantityBuffer::TracelessTensor(b)) => {
                a.extend_from_slice(b)
            }
            (QuantityBuffer::Index(a), QuantityBuffer::Index(b)) => a.extend_from_slice(b),
            _ => return Err(SfError::quantity("合并缓冲类型不一致")),
        }
        Ok(())
    }
}

/// 缓冲元素类型的运行时桥接
pub trait QuantityValue: Copy + Send + Sync + 'static {
    const KIND: ValueKind;

    fn make_buffer(n: usize, value: Self) -> QuantityBuffer;
    fn from_vec(values: Vec<Self>) -> QuantityBuffer;
    fn slice(buffer: &QuantityBuffer) -> Option<&[Self]>;
    fn slice_mut(buffer: &mut QuantityBuffer) -> Option<&mut [Self]>;
}

macro_rules! impl_quantity_value {
    ($ty:ty, $kind:expr, $variant:ident) => {
        impl QuantityValue for $ty {
            const KIND: ValueKind = $kind;

            fn make_buffer(n: usize, value: Self) -> QuantityBuffer {
                QuantityBuffer::$variant(vec![value; n])
            }

            fn from_vec(values: Vec<Self>) -> QuantityBuffer {
                QuantityBuffer::$variant(values)
            }

            fn slice(buffer: &QuantityBuffer) -> Option<&[Self]> {
                match buffer {
                    QuantityBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(buffer: &mut QuantityBuffer) -> Option<&mut [Self]> {
                match buffer {
                    QuantityBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_quantity_value!(f64, ValueKind::Scalar, Scalar);
impl_quantity_value!(DVec4, ValueKind::Vector, Vector);
impl_quantity_value!(SymTensor3, ValueKind::SymTensor, SymTensor);
impl_quantity_value!(TracelessTensor3, ValueKind::TracelessTensor, TracelessTensor);
impl_quantity_value!(u64, ValueKind::Index, Index);

/// 物理量：值缓冲 + 时间导数缓冲
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    kind: ValueKind,
    order: OrderEnum,
    /// buffers[0] 为值，buffers[1..] 为逐阶导数
    buffers: Vec<QuantityBuffer>,
}

impl Quantity {
    /// 以统一初值创建
    pub fn uniform<T: QuantityValue>(order: OrderEnum, n: usize, value: T) -> Quantity {
        let mut buffers = Vec::with_capacity(order.buffer_cnt());
        buffers.push(T::make_buffer(n, value));
        for _ in 1..order.buffer_cnt() {
            buffers.push(QuantityBuffer::zeroed(T::KIND, n));
        }
        Quantity {
            kind: T::KIND,
            order,
            buffers,
        }
    }

    /// 以给定值缓冲创建，导数缓冲清零
    pub fn from_values<T: QuantityValue>(order: OrderEnum, values: Vec<T>) -> Quantity {
        let n = values.len();
        let mut buffers = Vec::with_capacity(order.buffer_cnt());
        buffers.push(T::from_vec(values));
        for _ in 1..order.buffer_cnt() {
            buffers.push(QuantityBuffer::zeroed(T::KIND, n));
        }
        Quantity {
            kind: T::KIND,
            order,
            buffers,
        }
    }

    /// 由已有缓冲组装（IO 用），校验一致性
    pub fn from_buffers(order: OrderEnum, buffers: Vec<QuantityBuffer>) -> SfResult<Quantity> {
        if buffers.len() != order.buffer_cnt() {
            return Err(SfError::quantity(format!(
                "缓冲数 {} 与阶数 {:?} 不符",
                buffers.len(),
                order
            )));
        }
        let kind = buffers[0].kind();
        let len = buffers[0].len();
        for b in &buffers[1..] {
            if b.kind() != kind || b.len() != len {
                return Err(SfError::quantity("导数缓冲类型或长度不一致"));
            }
        }
        Ok(Quantity {
            kind,
            order,
            buffers,
        })
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    #[inline]
    pub fn order(&self) -> OrderEnum {
        self.order
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffers[0].len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn buffer(&self, idx: usize) -> &QuantityBuffer {
        &self.buffers[idx]
    }

    #[inline]
    pub fn buffer_mut(&mut self, idx: usize) -> &mut QuantityBuffer {
        &mut self.buffers[idx]
    }

    #[inline]
    pub fn buffers(&self) -> &[QuantityBuffer] {
        &self.buffers
    }

    #[inline]
    pub fn buffers_mut(&mut self) -> &mut [QuantityBuffer] {
        &mut self.buffers
    }

    fn typed<T: QuantityValue>(&self, idx: usize) -> SfResult<&[T]> {
        T::slice(&self.buffers[idx]).ok_or_else(|| {
            SfError::quantity(format!("缓冲类型不符: 期望 {:?}, 实际 {:?}", T::KIND, self.kind))
        })
    }

    fn typed_mut<T: QuantityValue>(&mut self, idx: usize) -> SfResult<&mut [T]> {
        let kind = self.kind;
        T::slice_mut(&mut self.buffers[idx]).ok_or_else(|| {
            SfError::quantity(format!("缓冲类型不符: 期望 {:?}, 实际 {:?}", T::KIND, kind))
        })
    }

    /// 值缓冲
    pub fn values<T: QuantityValue>(&self) -> SfResult<&[T]> {
        self.typed(0)
    }

    pub fn values_mut<T: QuantityValue>(&mut self) -> SfResult<&mut [T]> {
        self.typed_mut(0)
    }

    /// 一阶导数缓冲
    pub fn dt<T: QuantityValue>(&self) -> SfResult<&[T]> {
        self.require_order(OrderEnum::First)?;
        self.typed(1)
    }

    pub fn dt_mut<T: QuantityValue>(&mut self) -> SfResult<&mut [T]> {
        self.require_order(OrderEnum::First)?;
        self.typed_mut(1)
    }

    /// 二阶导数缓冲
    pub fn d2t<T: QuantityValue>(&self) -> SfResult<&[T]> {
        self.require_order(OrderEnum::Second)?;
        self.typed(2)
    }

    pub fn d2t_mut<T: QuantityValue>(&mut self) -> SfResult<&mut [T]> {
        self.require_order(OrderEnum::Second)?;
        self.typed_mut(2)
    }

    /// 值 + 一阶导数缓冲的可变视图
    pub fn value_and_dt_mut<T: QuantityValue>(&mut self) -> SfResult<(&mut [T], &mut [T])> {
        self.require_order(OrderEnum::First)?;
        let (head, tail) = self.buffers.split_at_mut(1);
        let v = T::slice_mut(&mut head[0]).ok_or_else(|| SfError::quantity("缓冲类型不符"))?;
        let d = T::slice_mut(&mut tail[0]).ok_or_else(|| SfError::quantity("缓冲类型不符"))?;
        Ok((v, d))
    }

    /// 值 + 最高阶导数缓冲的可变视图
    pub fn value_and_highest_mut<T: QuantityValue>(&mut self) -> SfResult<(&mut [T], &mut [T])> {
        if self.order == OrderEnum::Zero {
            return Err(SfError::quantity("零阶物理量没有导数缓冲"));
        }
        let last = self.buffers.len() - 1;
        let (head, tail) = self.buffers.split_at_mut(last);
        let v = T::slice_mut(&mut head[0]).ok_or_else(|| SfError::quantity("缓冲类型不符"))?;
        let d = T::slice_mut(&mut tail[0]).ok_or_else(|| SfError::quantity("缓冲类型不符"))?;
        Ok((v, d))
    }

    fn require_order(&self, at_least: OrderEnum) -> SfResult<()> {
        if self.order < at_least {
            return Err(SfError::quantity(format!(
                "阶数不足: 需要 {:?}, 实际 {:?}",
                at_least, self.order
            )));
        }
        Ok(())
    }

    /// 提升阶数，新导数缓冲清零；不会降阶
    pub fn promote_order(&mut self, order: OrderEnum) {
        while self.order < order {
            self.buffers
                .push(QuantityBuffer::zeroed(self.kind, self.len()));
            self.order = OrderEnum::from_u8(self.order as u8 + 1).unwrap_or(OrderEnum::Second);
        }
    }

    /// 最高阶导数缓冲（零阶物理量返回 None）
    pub fn highest_mut(&mut self) -> Option<&mut QuantityBuffer> {
        if self.order == OrderEnum::Zero {
            None
        } else {
            self.buffers.last_mut()
        }
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_creation() {
        let q = Quantity::uniform(OrderEnum::First, 4, 2.5);
        assert_eq!(q.kind(), ValueKind::Scalar);
        assert_eq!(q.order(), OrderEnum::First);
        assert_eq!(q.len(), 4);
        assert_eq!(q.values::<f64>().unwrap(), &[2.5; 4]);
        assert_eq!(q.dt::<f64>().unwrap(), &[0.0; 4]);
        // 无二阶导数
        assert!(q.d2t::<f64>().is_err());
    }

    #[test]
    fn test_type_mismatch() {
        let q = Quantity::uniform(OrderEnum::Zero, 3, 1.0);
        assert!(q.values::<DVec4>().is_err());
    }

    #[test]
    fn test_promote_order() {
        let mut q = Quantity::uniform(OrderEnum::Zero, 2, 7.0);
        q.promote_order(OrderEnum::Second);
        assert_eq!(q.order(), OrderEnum::Second);
        assert_eq!(q.values::<f64>().unwrap(), &[7.0, 7.0]);
        assert_eq!(q.d2t::<f64>().unwrap(), &[0.0, 0.0]);
        // 不降阶
        q.promote_order(OrderEnum::First);
        assert_eq!(q.order(), OrderEnum::Second);
    }

    #[test]
    fn test_vector_quantity() {
        let q = Quantity::uniform(OrderEnum::Second, 3, DVec4::new(1.0, 2.0, 3.0, 0.1));
        assert_eq!(q.kind(), ValueKind::Vector);
        assert_eq!(q.values::<DVec4>().unwrap()[2].w, 0.1);
    }

    #[test]
    fn test_extend_from() {
        let mut a = QuantityBuffer::Scalar(vec![1.0, 2.0]);
        let b = QuantityBuffer::Scalar(vec![3.0]);
        a.extend_from(&b).unwrap();
        assert_eq!(a.len(), 3);

        let c = QuantityBuffer::Index(vec![1]);
        assert!(a.extend_from(&c).is_err());
    }

    #[test]
    fn test_value_and_highest_mut() {
        let mut q = Quantity::uniform(OrderEnum::Second, 2, 1.0);
        {
            let (v, d2) = q.value_and_highest_mut::<f64>().unwrap();
            v[0] = 5.0;
            d2[1] = -1.0;
        }
        assert_eq!(q.values::<f64>().unwrap()[0], 5.0);
        assert_eq!(q.d2t::<f64>().unwrap()[1], -1.0);
    }

    #[test]
    fn test_id_roundtrip() {
        for raw in 0..19 {
            let id = QuantityId::from_u32(raw).unwrap();
            assert_eq!(id as u32, raw);
        }
        assert!(QuantityId::from_u32(99).is_none());
    }
}
