// crates/sf_physics/src/accumulated.rs

//! 导数累加器
//!
//! 粒子循环的写入端。每个导数在装配阶段向累加器注册输出缓冲，
//! 求值阶段按注册时拿到的下标写入。并行时每个分块持有一份
//! 累加器克隆，循环结束后按块序逐元素求和，结果可复现。

use sf_foundation::{SfError, SfResult};
use sf_storage::{OrderEnum, Quantity, QuantityBuffer, QuantityId, QuantityValue, Storage};

/// 缓冲归属
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferCategory {
    /// 唯一写者
    Unique,
    /// 多个导数共同累加（如多个力写同一加速度缓冲）
    Shared,
}

#[derive(Debug, Clone)]
struct Entry {
    id: QuantityId,
    order: OrderEnum,
    category: BufferCategory,
    buffer: QuantityBuffer,
}

/// 导数累加器
#[derive(Debug, Clone, Default)]
pub struct Accumulated {
    entries: Vec<Entry>,
}

impl Accumulated {
    pub fn new() -> Accumulated {
        Accumulated::default()
    }

    /// 注册输出缓冲，返回求值阶段使用的缓冲下标
    ///
    /// 同一 (id, order) 仅当双方都声明 Shared 时才复用，
    /// 否则视为装配冲突。
    pub fn insert<T: QuantityValue>(
        &mut self,
        id: QuantityId,
        order: OrderEnum,
        category: BufferCategory,
    ) -> SfResult<usize> {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.id == id && e.order == order)
        {
            let existing = &self.entries[pos];
            if existing.buffer.kind() != T::KIND {
                return Err(SfError::setup(format!("累加缓冲 {id} 类型冲突")));
            }
            if existing.category != BufferCategory::Shared || category != BufferCategory::Shared {
                return Err(SfError::setup(format!("累加缓冲 {id} 写者冲突")));
            }
            return Ok(pos);
        }
        self.entries.push(Entry {
            id,
            order,
            category,
            buffer: QuantityBuffer::zeroed(T::KIND, 0),
        });
        Ok(self.entries.len() - 1)
    }

    /// 重置所有缓冲为 n 个零元素
    pub fn initialize(&mut self, n: usize) {
        for entry in &mut self.entries {
            if entry.buffer.len() == n {
                entry.buffer.fill_zero();
            } else {
                entry.buffer = QuantityBuffer::zeroed(entry.buffer.kind(), n);
            }
        }
    }

    pub fn buffer_cnt(&self) -> usize {
        self.entries.len()
    }

    /// 查找已注册缓冲的下标（消费方只读中间量时使用）
    pub fn index_of(&self, id: QuantityId, order: OrderEnum) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id && e.order == order)
    }

    /// 按注册下标取可变切片
    ///
    /// 类型由注册方固定，不匹配属于装配逻辑错误。
    #[inline]
    pub fn slice_mut<T: QuantityValue>(&mut self, idx: usize) -> &mut [T] {
        match T::slice_mut(&mut self.entries[idx].buffer) {
            Some(slice) => slice,
            None => unreachable!("累加缓冲类型与注册不符"),
        }
    }

    #[inline]
    pub fn slice<T: QuantityValue>(&self, idx: usize) -> &[T] {
        match T::slice(&self.entries[idx].buffer) {
            Some(slice) => slice,
            None => unreachable!("累加缓冲类型与注册不符"),
        }
    }

    /// 逐元素累加另一份累加器（布局须相同）
    pub fn sum(&mut self, other: &Accumulated) {
        debug_assert_eq!(self.entries.len(), other.entries.len());
        for (dst, src) in self.entries.iter_mut().zip(other.entries.iter()) {
            match (&mut dst.buffer, &src.buffer) {
                (QuantityBuffer::Scalar(a), QuantityBuffer::Scalar(b)) => {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                }
                (QuantityBuffer::Vector(a), QuantityBuffer::Vector(b)) => {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += *y;
                    }
                }
                (QuantityBuffer::SymTensor(a), QuantityBuffer::SymTensor(b)) => {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += *y;
                    }
                }
                (QuantityBuffer::TracelessTensor(a), QuantityBuffer::TracelessTensor(b)) => {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += *y;
                    }
                }
                (QuantityBuffer::Index(a), QuantityBuffer::Index(b)) => {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                }
                _ => unreachable!("累加器布局不一致"),
            }
        }
    }

    /// 把累加结果写回存储
    ///
    /// 零阶缓冲写入物理量值（缺失时插入零阶物理量），
    /// 一阶/二阶缓冲写入对应阶的导数。
    pub fn store(&self, storage: &mut Storage) -> SfResult<()> {
        for entry in &self.entries {
            match entry.order {
                OrderEnum::Zero => {
                    if !storage.has(entry.id) {
                        storage
                            .insert_quantity(
                                entry.id,
                                Quantity::from_buffers(
                                    OrderEnum::Zero,
                                    vec![entry.buffer.clone()],
                                )?,
                            )?;
                        continue;
                    }
                    Self::copy_into(&entry.buffer, storage.get_mut(entry.id)?.buffer_mut(0))?;
                }
                OrderEnum::First => {
                    let q = storage.get_mut(entry.id)?;
                    if q.order() < OrderEnum::First {
                        return Err(SfError::quantity(format!("物理量 {} 无一阶导数", entry.id)));
                    }
                    Self::copy_into(&entry.buffer, q.buffer_mut(1))?;
                }
                OrderEnum::Second => {
                    let q = storage.get_mut(entry.id)?;
                    if q.order() < OrderEnum::Second {
                        return Err(SfError::quantity(format!("物理量 {} 无二阶导数", entry.id)));
                    }
                    Self::copy_into(&entry.buffer, q.buffer_mut(2))?;
                }
            }
        }
        Ok(())
    }

    fn copy_into(src: &QuantityBuffer, dst: &mut QuantityBuffer) -> SfResult<()> {
        if src.kind() != dst.kind() || src.len() != dst.len() {
            return Err(SfError::quantity("累加缓冲与存储缓冲不匹配"));
        }
        match (src, dst) {
            (QuantityBuffer::Scalar(a), QuantityBuffer::Scalar(b)) => b.copy_from_slice(a),
            (QuantityBuffer::Vector(a), QuantityBuffer::Vector(b)) => b.copy_from_slice(a),
            (QuantityBuffer::SymTensor(a), QuantityBuffer::SymTensor(b)) => b.copy_from_slice(a),
            (QuantityBuffer::TracelessTensor(a), QuantityBuffer::TracelessTensor(b)) => {
                b.copy_from_slice(a)
            }
            (QuantityBuffer::Index(a), QuantityBuffer::Index(b)) => b.copy_from_slice(a),
            _ => return Err(SfError::quantity("累加缓冲与存储缓冲类型不符")),
        }
        Ok(())
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec4;
    use sf_storage::OrderEnum;

    #[test]
    fn test_insert_and_layout() {
        let mut acc = Accumulated::new();
        let a = acc
            .insert::<DVec4>(QuantityId::Position, OrderEnum::Second, BufferCategory::Shared)
            .unwrap();
        let b = acc
            .insert::<f64>(QuantityId::Energy, OrderEnum::First, BufferCategory::Shared)
            .unwrap();
        assert_ne!(a, b);
        // Shared 复用同一缓冲
        let a2 = acc
            .insert::<DVec4>(QuantityId::Position, OrderEnum::Second, BufferCategory::Shared)
            .unwrap();
        assert_eq!(a, a2);
        assert_eq!(acc.buffer_cnt(), 2);
    }

    #[test]
    fn test_unique_conflict() {
        let mut acc = Accumulated::new();
        acc.insert::<f64>(
            QuantityId::VelocityDivergence,
            OrderEnum::Zero,
            BufferCategory::Unique,
        )
        .unwrap();
        // Unique 不允许再注册
        assert!(acc
            .insert::<f64>(
                QuantityId::VelocityDivergence,
                OrderEnum::Zero,
                BufferCategory::Unique
            )
            .is_err());
        assert!(acc
            .insert::<f64>(
                QuantityId::VelocityDivergence,
                OrderEnum::Zero,
                BufferCategory::Shared
            )
            .is_err());
    }

    #[test]
    fn test_sum_deterministic() {
        let mut a = Accumulated::new();
        let idx = a
            .insert::<f64>(QuantityId::VelocityDivergence, OrderEnum::Zero, BufferCategory::Unique)
            .unwrap();
        let mut b = a.clone();
        a.initialize(3);
        b.initialize(3);
        a.slice_mut::<f64>(idx)[0] = 1.0;
        b.slice_mut::<f64>(idx)[0] = 2.0;
        b.slice_mut::<f64>(idx)[2] = 5.0;
        a.sum(&b);
        assert_eq!(a.slice::<f64>(idx), &[3.0, 0.0, 5.0]);
    }

    #[test]
    fn test_store() {
        let mut storage = Storage::new();
        storage
            .insert_values(
                QuantityId::Position,
                OrderEnum::Second,
                vec![DVec4::new(0.0, 0.0, 0.0, 1.0); 2],
            )
            .unwrap();
        storage
            .insert_uniform(QuantityId::Density, OrderEnum::First, 1000.0)
            .unwrap();

        let mut acc = Accumulated::new();
        let i_dv = acc
            .insert::<DVec4>(QuantityId::Position, OrderEnum::Second, BufferCategory::Shared)
            .unwrap();
        let i_drho = acc
            .insert::<f64>(QuantityId::Density, OrderEnum::First, BufferCategory::Unique)
            .unwrap();
        let i_divv = acc
            .insert::<f64>(
                QuantityId::VelocityDivergence,
                OrderEnum::Zero,
                BufferCategory::Unique,
            )
            .unwrap();
        acc.initialize(2);
        acc.slice_mut::<DVec4>(i_dv)[1] = DVec4::new(0.0, 0.0, -9.8, 0.0);
        acc.slice_mut::<f64>(i_drho)[0] = -5.0;
        acc.slice_mut::<f64>(i_divv)[1] = 0.25;

        acc.store(&mut storage).unwrap();
        assert_eq!(
            storage.d2t::<DVec4>(QuantityId::Position).unwrap()[1].z,
            -9.8
        );
        assert_eq!(storage.dt::<f64>(QuantityId::Density).unwrap()[0], -5.0);
        // 缺失的零阶物理量被插入
        assert_eq!(
            storage.values::<f64>(QuantityId::VelocityDivergence).unwrap()[1],
            0.25
        );
    }
}
