// crates/sf_io/src/state_file.rs

//! 二进制状态快照
//!
//! 小端布局，手写读写，往返逐位一致：
//!
//! ```text
//! magic "SPH\0" | version u32 | time f64 | particle_cnt u64 | quantity_cnt u32
//! 每个物理量:  id u32 | order u8 | kind u8 | (order+1) 个原始缓冲
//! ```
//!
//! 缓冲按元素逐分量写出：标量 1×f64，向量 4×f64（含 w），
//! 对称张量 6×f64，无迹张量 5×f64，索引 1×u64。
//! 材料不入快照，载入后需重新挂接。

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use glam::{DVec3, DVec4};
use log::debug;
use sf_foundation::{SfError, SfResult, SymTensor3, TracelessTensor3};
use sf_storage::{OrderEnum, Quantity, QuantityBuffer, QuantityId, Storage, ValueKind};

const MAGIC: [u8; 4] = *b"SPH\0";
const VERSION: u32 = 1;

// ============================================================
// 底层读写
// ============================================================

fn write_u32(w: &mut impl Write, value: u32) -> SfResult<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_u64(w: &mut impl Write, value: u64) -> SfResult<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_f64(w: &mut impl Write, value: f64) -> SfResult<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn read_u8(r: &mut impl Read) -> SfResult<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32(r: &mut impl Read) -> SfResult<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> SfResult<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> SfResult<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn write_buffer(w: &mut impl Write, buffer: &QuantityBuffer) -> SfResult<()> {
    match buffer {
        QuantityBuffer::Scalar(values) => {
            for &v in values {
                write_f64(w, v)?;
            }
        }
        QuantityBuffer::Vector(values) => {
            for v in values {
                write_f64(w, v.x)?;
                write_f64(w, v.y)?;
                write_f64(w, v.z)?;
                write_f64(w, v.w)?;
            }
        }
        QuantityBuffer::SymTensor(values) => {
            for t in values {
                write_f64(w, t.diag.x)?;
                write_f64(w, t.diag.y)?;
                write_f64(w, t.diag.z)?;
                write_f64(w, t.off.x)?;
                write_f64(w, t.off.y)?;
                write_f64(w, t.off.z)?;
            }
        }
        QuantityBuffer::TracelessTensor(values) => {
            for t in values {
                write_f64(w, t.xx)?;
                write_f64(w, t.yy)?;
                write_f64(w, t.xy)?;
                write_f64(w, t.xz)?;
                write_f64(w, t.yz)?;
            }
        }
        QuantityBuffer::Index(values) => {
            for &v in values {
                write_u64(w, v)?;
            }
        }
    }
    Ok(())
}

fn read_buffer(r: &mut impl Read, kind: ValueKind, n: usize) -> SfResult<QuantityBuffer> {
    let buffer = match kind {
        ValueKind::Scalar => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(read_f64(r)?);
            }
            QuantityBuffer::Scalar(values)
        }
        ValueKind::Vector => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                let x = read_f64(r)?;
                let y = read_f64(r)?;
                let z = read_f64(r)?;
                let w = read_f64(r)?;
                values.push(DVec4::new(x, y, z, w));
            }
            QuantityBuffer::Vector(values)
        }
        ValueKind::SymTensor => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                let dx = read_f64(r)?;
                let dy = read_f64(r)?;
                let dz = read_f64(r)?;
                let ox = read_f64(r)?;
                let oy = read_f64(r)?;
                let oz = read_f64(r)?;
                values.push(SymTensor3::new(
                    DVec3::new(dx, dy, dz),
                    DVec3::new(ox, oy, oz),
                ));
            }
            QuantityBuffer::SymTensor(values)
        }
        ValueKind::TracelessTensor => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                let xx = read_f64(r)?;
                let yy = read_f64(r)?;
                let xy = read_f64(r)?;
                let xz = read_f64(r)?;
                let yz = read_f64(r)?;
                values.push(TracelessTensor3 { xx, yy, xy, xz, yz });
            }
            QuantityBuffer::TracelessTensor(values)
        }
        ValueKind::Index => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(read_u64(r)?);
            }
            QuantityBuffer::Index(values)
        }
    };
    Ok(buffer)
}

// ============================================================
// 快照读写
// ============================================================

/// 把存储的全部物理量与当前时间写入快照文件
pub fn save_state<P: AsRef<Path>>(path: P, storage: &Storage, time: f64) -> SfResult<()> {
    let file = File::create(path.as_ref())?;
    let mut w = BufWriter::new(file);

    w.write_all(&MAGIC)?;
    write_u32(&mut w, VERSION)?;
    write_f64(&mut w, time)?;
    write_u64(&mut w, storage.particle_cnt() as u64)?;
    write_u32(&mut w, storage.quantity_cnt() as u32)?;

    for (id, q) in storage.iter() {
        write_u32(&mut w, id as u32)?;
        w.write_all(&[q.order() as u8, q.kind() as u8])?;
        for buffer in q.buffers() {
            write_buffer(&mut w, buffer)?;
        }
    }
    w.flush()?;
    debug!(
        "快照已写入 {}: {} 粒子, {} 物理量",
        path.as_ref().display(),
        storage.particle_cnt(),
        storage.quantity_cnt()
    );
    Ok(())
}

/// 从快照文件恢复存储与时间；材料不在快照中，需另行挂接
pub fn load_state<P: AsRef<Path>>(path: P) -> SfResult<(Storage, f64)> {
    let file = File::open(path.as_ref())?;
    let mut r = BufReader::new(file);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SfError::format(format!("快照魔数不符: {magic:?}")));
    }
    let version = read_u32(&mut r)?;
    if version != VERSION {
        return Err(SfError::format(format!("不支持的快照版本 {version}")));
    }
    let time = read_f64(&mut r)?;
    let n = read_u64(&mut r)? as usize;
    let quantity_cnt = read_u32(&mut r)?;

    let mut storage = Storage::new();
    for _ in 0..quantity_cnt {
        let raw_id = read_u32(&mut r)?;
        let id = QuantityId::from_u32(raw_id)
            .ok_or_else(|| SfError::format(format!("未知物理量标识 {raw_id}")))?;
        let raw_order = read_u8(&mut r)?;
        let order = OrderEnum::from_u8(raw_order)
            .ok_or_else(|| SfError::format(format!("非法阶数 {raw_order}")))?;
        let raw_kind = read_u8(&mut r)?;
        let kind = ValueKind::from_u8(raw_kind)
            .ok_or_else(|| SfError::format(format!("非法缓冲类型 {raw_kind}")))?;

        let mut buffers = Vec::with_capacity(order.buffer_cnt());
        for _ in 0..order.buffer_cnt() {
            buffers.push(read_buffer(&mut r, kind, n)?);
        }
        storage.insert_quantity(id, Quantity::from_buffers(order, buffers)?)?;
    }
    debug!(
        "快照已载入 {}: t = {time}, {n} 粒子",
        path.as_ref().display()
    );
    Ok((storage, time))
}

// ============================================================
// 测试
// ============================================================
