// apps/sf_cli/src/commands/info.rs

//! 快照信息命令
//!
//! 打印二进制快照的时间、粒子数与逐物理量的摘要。

use anyhow::{Context, Result};
use clap::Args;
use glam::DVec4;
use std::path::PathBuf;

use sf_storage::{QuantityId, Storage, ValueKind};

/// 快照信息参数
#[derive(Args)]
pub struct InfoArgs {
    /// 快照文件路径
    pub snapshot: PathBuf,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    let (storage, time) = sf_io::load_state(&args.snapshot)
        .with_context(|| format!("无法载入 {}", args.snapshot.display()))?;

    println!("快照: {}", args.snapshot.display());
    println!("时间: {time:.6e} s");
    println!("粒子数: {}", storage.particle_cnt());
    println!("物理量 ({}):", storage.quantity_cnt());
    for (id, q) in storage.iter() {
        println!(
            "  {:<20} {:?} 阶数 {:?}",
            id.to_string(),
            q.kind(),
            q.order()
        );
    }

    print_scalar_range(&storage, QuantityId::Density);
    print_scalar_range(&storage, QuantityId::Energy);
    print_scalar_range(&storage, QuantityId::Damage);
    print_smoothing_range(&storage);
    Ok(())
}

fn print_scalar_range(storage: &Storage, id: QuantityId) {
    let Ok(q) = storage.get(id) else {
        return;
    };
    if q.kind() != ValueKind::Scalar {
        return;
    }
    let Ok(values) = q.values::<f64>() else {
        return;
    };
    if values.is_empty() {
        return;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    println!("{id}: [{min:.4e}, {max:.4e}]");
}

fn print_smoothing_range(storage: &Storage) {
    let Ok(r) = storage.values::<DVec4>(QuantityId::Position) else {
        return;
    };
    if r.is_empty() {
        return;
    }
    let min = r.iter().map(|x| x.w).fold(f64::INFINITY, f64::min);
    let max = r.iter().map(|x| x.w).fold(f64::NEG_INFINITY, f64::max);
    println!("光滑长度: [{min:.4e}, {max:.4e}]");
}
