// crates/sf_storage/src/storage.rs

//! 粒子存储
//!
//! [`Storage`] 是 QuantityId → [`Quantity`] 的扁平有序映射，
//! 外加按连续索引区间挂接的材料。所有缓冲长度等于粒子数。

use std::ops::Range;

use log::debug;
use sf_foundation::{SfError, SfResult};

use crate::material::Material;
use crate::quantity::{OrderEnum, Quantity, QuantityBuffer, QuantityId, QuantityValue};

/// 缓冲选择器：克隆 / 交换 / 遍历作用的缓冲子集
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSelector {
    /// 全部缓冲
    All,
    /// 各物理量的最高阶导数缓冲
    HighestDerivatives,
    /// 零阶物理量的值缓冲
    ZeroOrder,
    /// 一阶物理量的值与一阶导数缓冲
    FirstOrder,
    /// 二阶物理量的全部缓冲
    SecondOrder,
}

impl BufferSelector {
    /// 给定物理量阶数下被选中的缓冲下标
    fn selected(&self, order: OrderEnum) -> Vec<usize> {
        match self {
            BufferSelector::All => (0..order.buffer_cnt()).collect(),
            BufferSelector::HighestDerivatives => {
                if order == OrderEnum::Zero {
                    Vec::new()
                } else {
                    vec![order.buffer_cnt() - 1]
                }
            }
            BufferSelector::ZeroOrder => {
                if order == OrderEnum::Zero {
                    vec![0]
                } else {
                    Vec::new()
                }
            }
            BufferSelector::FirstOrder => {
                if order == OrderEnum::First {
                    vec![0, 1]
                } else {
                    Vec::new()
                }
            }
            BufferSelector::SecondOrder => {
                if order == OrderEnum::Second {
                    vec![0, 1, 2]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

/// 材料及其粒子索引区间
#[derive(Debug)]
pub struct MaterialEntry {
    pub material: Material,
    pub range: Range<usize>,
}

/// 粒子存储：物理量映射 + 材料区间
#[derive(Debug, Default)]
pub struct Storage {
    /// 按 QuantityId 排序
    quantities: Vec<(QuantityId, Quantity)>,
    materials: Vec<MaterialEntry>,
}

impl Storage {
    pub fn new() -> Storage {
        Storage::default()
    }

    /// 粒子数（空存储为 0）
    #[inline]
    pub fn particle_cnt(&self) -> usize {
        self.quantities.first().map_or(0, |(_, q)| q.len())
    }

    #[inline]
    pub fn quantity_cnt(&self) -> usize {
        self.quantities.len()
    }

    #[inline]
    pub fn has(&self, id: QuantityId) -> bool {
        self.find(id).is_ok()
    }

    pub fn ids(&self) -> impl Iterator<Item = QuantityId> + '_ {
        self.quantities.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuantityId, &Quantity)> {
        self.quantities.iter().map(|(id, q)| (*id, q))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (QuantityId, &mut Quantity)> {
        self.quantities.iter_mut().map(|(id, q)| (*id, q))
    }

    fn find(&self, id: QuantityId) -> Result<usize, usize> {
        self.quantities.binary_search_by_key(&id, |(qid, _)| *qid)
    }

    /// 物理量引用
    pub fn get(&self, id: QuantityId) -> SfResult<&Quantity> {
        let idx = self
            .find(id)
            .map_err(|_| SfError::quantity(format!("缺少物理量 {id}")))?;
        Ok(&self.quantities[idx].1)
    }

    pub fn get_mut(&mut self, id: QuantityId) -> SfResult<&mut Quantity> {
        let idx = self
            .find(id)
            .map_err(|_| SfError::quantity(format!("缺少物理量 {id}")))?;
        Ok(&mut self.quantities[idx].1)
    }

    /// 单次遍历取出多个互不相同物理量的可变引用
    pub fn get_many_mut<const N: usize>(
        &mut self,
        ids: [QuantityId; N],
    ) -> SfResult<[&mut Quantity; N]> {
        for (k, id) in ids.iter().enumerate() {
            if ids[k + 1..].contains(id) {
                return Err(SfError::quantity(format!("重复请求物理量 {id}")));
            }
        }
        let mut slots: [Option<&mut Quantity>; N] = std::array::from_fn(|_| None);
        for (qid, q) in self.quantities.iter_mut() {
            if let Some(pos) = ids.iter().position(|id| id == qid) {
                slots[pos] = Some(q);
            }
        }
        let mut out = Vec::with_capacity(N);
        for (k, slot) in slots.into_iter().enumerate() {
            out.push(slot.ok_or_else(|| SfError::quantity(format!("缺少物理量 {}", ids[k])))?);
        }
        out.try_into()
            .map_err(|_| SfError::quantity("物理量集合装配失败"))
    }

    /// 插入统一初值的物理量
    ///
    /// 已存在时不覆盖值，仅在新阶数更高时提升阶数；类型不符报错。
    pub fn insert_uniform<T: QuantityValue>(
        &mut self,
        id: QuantityId,
        order: OrderEnum,
        value: T,
    ) -> SfResult<()> {
        match self.find(id) {
            Ok(idx) => {
                let q = &mut self.quantities[idx].1;
                if q.kind() != T::KIND {
                    return Err(SfError::quantity(format!(
                        "物理量 {id} 类型冲突: {:?} vs {:?}",
                        q.kind(),
                        T::KIND
                    )));
                }
                q.promote_order(order);
                Ok(())
            }
            Err(idx) => {
                if self.quantities.is_empty() {
                    return Err(SfError::quantity(format!(
                        "空存储无法以统一值插入 {id}, 须先插入缓冲"
                    )));
                }
                let n = self.particle_cnt();
                self.quantities
                    .insert(idx, (id, Quantity::uniform(order, n, value)));
                Ok(())
            }
        }
    }

    /// 插入带缓冲的物理量；首个插入确定粒子数
    pub fn insert_values<T: QuantityValue>(
        &mut self,
        id: QuantityId,
        order: OrderEnum,
        values: Vec<T>,
    ) -> SfResult<()> {
        if !self.quantities.is_empty() && values.len() != self.particle_cnt() {
            return Err(SfError::SizeMismatch {
                expected: self.particle_cnt(),
                actual: values.len(),
            });
        }
        match self.find(id) {
            Ok(idx) => {
                let q = &mut self.quantities[idx].1;
                if q.kind() != T::KIND {
                    return Err(SfError::quantity(format!("物理量 {id} 类型冲突")));
                }
                q.promote_order(order);
                Ok(())
            }
            Err(idx) => {
                self.quantities
                    .insert(idx, (id, Quantity::from_values(order, values)));
                Ok(())
            }
        }
    }

    /// 组装好的物理量直接放入（IO 反序列化用）
    pub fn insert_quantity(&mut self, id: QuantityId, quantity: Quantity) -> SfResult<()> {
        if !self.quantities.is_empty() && quantity.len() != self.particle_cnt() {
            return Err(SfError::SizeMismatch {
                expected: self.particle_cnt(),
                actual: quantity.len(),
            });
        }
        match self.find(id) {
            Ok(_) => Err(SfError::quantity(format!("物理量 {id} 已存在"))),
            Err(idx) => {
                self.quantities.insert(idx, (id, quantity));
                Ok(())
            }
        }
    }

    // ============================================================
    // 类型化快捷访问
    // ============================================================

    pub fn values<T: QuantityValue>(&self, id: QuantityId) -> SfResult<&[T]> {
        self.get(id)?.values()
    }

    pub fn values_mut<T: QuantityValue>(&mut self, id: QuantityId) -> SfResult<&mut [T]> {
        self.get_mut(id)?.values_mut()
    }

    pub fn dt<T: QuantityValue>(&self, id: QuantityId) -> SfResult<&[T]> {
        self.get(id)?.dt()
    }

    pub fn dt_mut<T: QuantityValue>(&mut self, id: QuantityId) -> SfResult<&mut [T]> {
        self.get_mut(id)?.dt_mut()
    }

    pub fn d2t<T: QuantityValue>(&self, id: QuantityId) -> SfResult<&[T]> {
        self.get(id)?.d2t()
    }

    pub fn d2t_mut<T: QuantityValue>(&mut self, id: QuantityId) -> SfResult<&mut [T]> {
        self.get_mut(id)?.d2t_mut()
    }

    // ============================================================
    // 选择器操作
    // ============================================================

    /// 按选择器克隆：选中缓冲深拷贝，未选中缓冲等尺寸清零
    ///
    /// 材料不随克隆（克隆体仅作积分中间状态）。
    pub fn clone_selected(&self, selector: BufferSelector) -> Storage {
        let quantities = self
            .quantities
            .iter()
            .map(|(id, q)| {
                let selected = selector.selected(q.order());
                let buffers = q
                    .buffers()
                    .iter()
                    .enumerate()
                    .map(|(k, b)| {
                        if selected.contains(&k) {
                            b.clone()
                        } else {
                            b.zeroed_like()
                        }
                    })
                    .collect();
                // 缓冲来自合法物理量，组装不会失败
                let q2 = Quantity::from_buffers(q.order(), buffers)
                    .unwrap_or_else(|_| unreachable!());
                (*id, q2)
            })
            .collect();
        Storage {
            quantities,
            materials: Vec::new(),
        }
    }

    /// 按选择器交换缓冲；两侧物理量集合与元数据须一致
    pub fn swap_selected(&mut self, other: &mut Storage, selector: BufferSelector) -> SfResult<()> {
        if self.quantities.len() != other.quantities.len() {
            return Err(SfError::quantity("交换双方物理量数量不一致"));
        }
        for ((id_a, qa), (id_b, qb)) in self
            .quantities
            .iter_mut()
            .zip(other.quantities.iter_mut())
        {
            if id_a != id_b || qa.kind() != qb.kind() || qa.order() != qb.order() {
                return Err(SfError::quantity(format!("交换双方物理量 {id_a} 元数据不一致")));
            }
            for k in selector.selected(qa.order()) {
                std::mem::swap(qa.buffer_mut(k), qb.buffer_mut(k));
            }
        }
        Ok(())
    }

    /// 清零全部最高阶导数缓冲
    pub fn zero_highest_derivatives(&mut self) {
        for (_, q) in self.quantities.iter_mut() {
            if let Some(buf) = q.highest_mut() {
                buf.fill_zero();
            }
        }
    }

    /// 合并另一存储：逐物理量拼接缓冲，材料区间顺延
    ///
    /// 只出现在一侧的物理量在另一侧按零值补齐；双方共有的物理量
    /// 类型与阶数须一致。与空存储合并不改变本存储。
    pub fn merge(&mut self, other: Storage) -> SfResult<()> {
        for (id, qb) in other.iter() {
            if let Ok(qa) = self.get(id) {
                if qa.kind() != qb.kind() || qa.order() != qb.order() {
                    return Err(SfError::quantity(format!(
                        "合并双方物理量 {id} 元数据不一致"
                    )));
                }
            }
        }
        let offset = self.particle_cnt();
        let added = other.particle_cnt();
        // 对方独有的物理量先在本侧以零值建立
        for (id, qb) in other.iter() {
            if let Err(idx) = self.find(id) {
                let buffers = (0..qb.order().buffer_cnt())
                    .map(|_| QuantityBuffer::zeroed(qb.kind(), offset))
                    .collect();
                let zeroed = Quantity::from_buffers(qb.order(), buffers)?;
                self.quantities.insert(idx, (id, zeroed));
            }
        }
        for (id, qa) in self.quantities.iter_mut() {
            match other.find(*id) {
                Ok(idx) => {
                    let qb = &other.quantities[idx].1;
                    for k in 0..qa.order().buffer_cnt() {
                        qa.buffer_mut(k).extend_from(qb.buffer(k))?;
                    }
                }
                Err(_) => {
                    // 本侧独有: 对方的粒子按零值补齐
                    for buf in qa.buffers_mut() {
                        buf.resize(offset + added);
                    }
                }
            }
        }
        for entry in other.materials {
            self.materials.push(MaterialEntry {
                material: entry.material,
                range: entry.range.start + offset..entry.range.end + offset,
            });
        }
        debug!("合并存储: 粒子数 {} -> {}", offset, self.particle_cnt());
        Ok(())
    }

    /// 调整粒子数：缩短时截断，加长时全部缓冲按零值补齐
    ///
    /// 越过新长度的材料区间被裁剪，裁空的材料被移除。
    pub fn resize(&mut self, n: usize) {
        for (_, q) in self.quantities.iter_mut() {
            for buf in q.buffers_mut() {
                buf.resize(n);
            }
        }
        self.materials.retain_mut(|entry| {
            entry.range.end = entry.range.end.min(n);
            entry.range.start < entry.range.end
        });
    }

    // ============================================================
    // 材料
    // ============================================================

    /// 挂接材料到下一个连续粒子区间
    pub fn add_material(&mut self, material: Material, range: Range<usize>) -> SfResult<()> {
        let covered = self.materials.last().map_or(0, |m| m.range.end);
        if range.start != covered {
            return Err(SfError::setup(format!(
                "材料区间须连续: 期望起点 {covered}, 实际 {}",
                range.start
            )));
        }
        if range.end > self.particle_cnt() {
            return Err(SfError::IndexOutOfBounds {
                index: range.end,
                size: self.particle_cnt(),
            });
        }
        self.materials.push(MaterialEntry { material, range });
        Ok(())
    }

    #[inline]
    pub fn material_cnt(&self) -> usize {
        self.materials.len()
    }

    pub fn material(&self, idx: usize) -> &MaterialEntry {
        &self.materials[idx]
    }

    /// 粒子所属材料下标；区间连续有序, 二分查找
    pub fn material_of(&self, particle: usize) -> Option<usize> {
        let idx = self
            .materials
            .partition_point(|m| m.range.end <= particle);
        (idx < self.materials.len() && self.materials[idx].range.contains(&particle))
            .then_some(idx)
    }

    /// 运行各材料的装配（插入流变模型所需物理量）
    pub fn create_materials(&mut self) -> SfResult<()> {
        let materials = std::mem::take(&mut self.materials);
        let mut result = Ok(());
        for entry in &materials {
            if let Err(err) = entry.material.create(self) {
                result = Err(err);
                break;
            }
        }
        self.materials = materials;
        result
    }

    /// 运行各材料的步前初始化（状态方程求值、屈服与损伤折减）
    pub fn initialize_materials(&mut self) -> SfResult<()> {
        let materials = std::mem::take(&mut self.materials);
        let mut result = Ok(());
        for entry in &materials {
            if let Err(err) = entry.material.initialize(self, entry.range.clone()) {
                result = Err(err);
                break;
            }
        }
        self.materials = materials;
        result
    }
}

// ============================================================
// 测试
// ============================================================
