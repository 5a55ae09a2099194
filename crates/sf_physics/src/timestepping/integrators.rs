// crates/sf_physics/src/timestepping/integrators.rs

//! 时间积分器
//!
//! 积分器对存储中的物理量按阶数统一推进：一阶量 x += dx·dt，
//! 二阶量先推进速度再推进值。推进后对材料声明的取值范围钳制，
//! 钳在边界上且导数仍指向界外时将导数清零，避免下一步继续
//! 往外推。

use sf_foundation::{SfError, SfResult};
use sf_storage::{
    BufferSelector, OrderEnum, QuantityBuffer, QuantityId, Storage, ValueKind,
};

use crate::solver::AsymmetricSolver;
use crate::statistics::Statistics;

/// dst += src · factor（逐元素）
fn buffer_axpy(dst: &mut QuantityBuffer, src: &QuantityBuffer, factor: f64) -> SfResult<()> {
    match (dst, src) {
        (QuantityBuffer::Scalar(a), QuantityBuffer::Scalar(b)) => {
            for (x, y) in a.iter_mut().zip(b) {
                *x += y * factor;
            }
        }
        (QuantityBuffer::Vector(a), QuantityBuffer::Vector(b)) => {
            for (x, y) in a.iter_mut().zip(b) {
                *x += *y * factor;
            }
        }
        (QuantityBuffer::SymTensor(a), QuantityBuffer::SymTensor(b)) => {
            for (x, y) in a.iter_mut().zip(b) {
                *x += *y * factor;
            }
        }
        (QuantityBuffer::TracelessTensor(a), QuantityBuffer::TracelessTensor(b)) => {
            for (x, y) in a.iter_mut().zip(b) {
                *x += *y * factor;
            }
        }
        _ => return Err(SfError::quantity("积分缓冲类型不符")),
    }
    Ok(())
}

/// dst += (a - b) · factor（预估-校正的校正项）
fn buffer_correct(
    dst: &mut QuantityBuffer,
    a: &QuantityBuffer,
    b: &QuantityBuffer,
    factor: f64,
) -> SfResult<()> {
    match (dst, a, b) {
        (QuantityBuffer::Scalar(d), QuantityBuffer::Scalar(x), QuantityBuffer::Scalar(y)) => {
            for ((v, p), q) in d.iter_mut().zip(x).zip(y) {
                *v += (p - q) * factor;
            }
        }
        (QuantityBuffer::Vector(d), QuantityBuffer::Vector(x), QuantityBuffer::Vector(y)) => {
            for ((v, p), q) in d.iter_mut().zip(x).zip(y) {
                *v += (*p - *q) * factor;
            }
        }
        (
            QuantityBuffer::SymTensor(d),
            QuantityBuffer::SymTensor(x),
            QuantityBuffer::SymTensor(y),
        ) => {
            for ((v, p), q) in d.iter_mut().zip(x).zip(y) {
                *v += (*p - *q) * factor;
            }
        }
        (
            QuantityBuffer::TracelessTensor(d),
            QuantityBuffer::TracelessTensor(x),
            QuantityBuffer::TracelessTensor(y),
        ) => {
            for ((v, p), q) in d.iter_mut().zip(x).zip(y) {
                *v += (*p - *q) * factor;
            }
        }
        _ => return Err(SfError::quantity("校正缓冲类型不符")),
    }
    Ok(())
}

/// 一阶量推进 x += dx·dt
fn step_first_order(storage: &mut Storage, dt: f64) -> SfResult<()> {
    for (_, q) in storage.iter_mut() {
        if q.order() != OrderEnum::First {
            continue;
        }
        let (value, rest) = q.buffers_mut().split_at_mut(1);
        buffer_axpy(&mut value[0], &rest[0], dt)?;
    }
    Ok(())
}

/// 二阶量的速度推进 v += dv·dt
fn kick_second_order(storage: &mut Storage, dt: f64) -> SfResult<()> {
    for (_, q) in storage.iter_mut() {
        if q.order() != OrderEnum::Second {
            continue;
        }
        let (head, tail) = q.buffers_mut().split_at_mut(2);
        buffer_axpy(&mut head[1], &tail[0], dt)?;
    }
    Ok(())
}

/// 二阶量的位置推进 x += v·dt
fn drift_second_order(storage: &mut Storage, dt: f64) -> SfResult<()> {
    for (_, q) in storage.iter_mut() {
        if q.order() != OrderEnum::Second {
            continue;
        }
        let (value, rest) = q.buffers_mut().split_at_mut(1);
        buffer_axpy(&mut value[0], &rest[0], dt)?;
    }
    Ok(())
}

/// 按材料取值范围钳制，边界上指向界外的导数清零；
/// 光滑长度（位置 w 分量）另行钳到全局下限 h_min
pub(crate) fn clamp_bounded(storage: &mut Storage, h_min: f64) -> SfResult<()> {
    let entries: Vec<_> = (0..storage.material_cnt())
        .map(|k| {
            let entry = storage.material(k);
            (
                entry.range.clone(),
                entry.material.iter_bounds().collect::<Vec<_>>(),
            )
        })
        .collect();
    for (range, bounds) in entries {
        for (id, b) in bounds {
            if !storage.has(id) {
                continue;
            }
            let q = storage.get_mut(id)?;
            if q.kind() != ValueKind::Scalar {
                continue;
            }
            if q.order() >= OrderEnum::First {
                let (v, dv) = q.value_and_dt_mut::<f64>()?;
                for i in range.clone() {
                    let clamped = b.range.clamp(v[i]);
                    if clamped != v[i] {
                        if (clamped > v[i] && dv[i] < 0.0) || (clamped < v[i] && dv[i] > 0.0) {
                            dv[i] = 0.0;
                        }
                        v[i] = clamped;
                    }
                }
            } else {
                let v = q.values_mut::<f64>()?;
                for i in range.clone() {
                    v[i] = b.range.clamp(v[i]);
                }
            }
        }
    }

    let position = storage.get_mut(QuantityId::Position)?;
    let (r, v) = position.value_and_dt_mut::<glam::DVec4>()?;
    for i in 0..r.len() {
        if r[i].w < h_min {
            r[i].w = h_min;
            if v[i].w < 0.0 {
                v[i].w = 0.0;
            }
        }
    }
    Ok(())
}

/// 积分器
pub enum Integrator {
    /// 半隐式欧拉：v += a·dt, x += v·dt
    EulerExplicit,
    /// 预估-校正（二阶）
    PredictorCorrector,
    /// 蛙跳 KDK
    LeapFrog,
}

impl Integrator {
    /// 推进一个时间步：求导数并更新全部物理量
    pub fn advance(
        &self,
        solver: &mut AsymmetricSolver,
        storage: &mut Storage,
        t: f64,
        dt: f64,
        stats: &mut Statistics,
    ) -> SfResult<()> {
        match self {
            Integrator::EulerExplicit => {
                solver.integrate(storage, t, stats)?;
                kick_second_order(storage, dt)?;
                drift_second_order(storage, dt)?;
                step_first_order(storage, dt)?;
            }
            Integrator::PredictorCorrector => {
                // 预估: 用上一步的导数外推
                drift_second_order(storage, dt)?;
                for (_, q) in storage.iter_mut() {
                    if q.order() == OrderEnum::Second {
                        let (value, rest) = q.buffers_mut().split_at_mut(1);
                        buffer_axpy(&mut value[0], &rest[1], 0.5 * dt * dt)?;
                    }
                }
                kick_second_order(storage, dt)?;
                step_first_order(storage, dt)?;

                let old = storage.clone_selected(BufferSelector::HighestDerivatives);
                solver.integrate(storage, t + dt, stats)?;

                // 校正
                for (id, q) in storage.iter_mut() {
                    let Ok(prev) = old.get(id) else {
                        continue;
                    };
                    match q.order() {
                        OrderEnum::Zero => {}
                        OrderEnum::First => {
                            let (value, rest) = q.buffers_mut().split_at_mut(1);
                            buffer_correct(&mut value[0], &rest[0], prev.buffer(1), 0.5 * dt)?;
                        }
                        OrderEnum::Second => {
                            let (head, tail) = q.buffers_mut().split_at_mut(2);
                            buffer_correct(
                                &mut head[0],
                                &tail[0],
                                prev.buffer(2),
                                dt * dt / 3.0,
                            )?;
                            buffer_correct(&mut head[1], &tail[0], prev.buffer(2), 0.5 * dt)?;
                        }
                    }
                }
            }
            Integrator::LeapFrog => {
                // kick-drift 用上一步的加速度
                kick_second_order(storage, 0.5 * dt)?;
                drift_second_order(storage, dt)?;
                solver.integrate(storage, t + dt, stats)?;
                step_first_order(storage, dt)?;
                kick_second_order(storage, 0.5 * dt)?;
            }
        }
        clamp_bounded(storage, solver.h_min())
    }
}

// ============================================================
// 测试
// ============================================================
