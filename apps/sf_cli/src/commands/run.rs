// apps/sf_cli/src/commands/run.rs

//! 运行模拟命令
//!
//! 载入 TOML 配置，在球体内生成立方点阵初始条件，
//! 装配方程项与求解器，循环推进到终止时刻，按间隔输出快照。

use anyhow::{Context, Result};
use clap::Args;
use glam::DVec4;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use sf_config::{BodyConfig, KernelChoice, RheologyChoice, RunConfig};
use sf_foundation::Scheduler;
use sf_physics::{
    AdaptiveSmoothingLength, AsymmetricSolver, ConstSmoothingLength, ContinuityEquation,
    CubicSpline, EquationHolder, FourthOrderSpline, GradyKippDamage, Kernel, MonaghanViscosity,
    PressureForce, SolidStressForce, Statistics, StatisticsId, StatsValue, TimeStepping,
};
use sf_storage::{Material, OrderEnum, QuantityId, Storage};

/// 运行模拟参数
#[derive(Args)]
pub struct RunArgs {
    /// 运行配置文件 (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 物体配置文件 (TOML)
    #[arg(short, long)]
    pub body: Option<PathBuf>,

    /// 输出目录（覆盖配置）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 终止时刻 [s]（覆盖配置）
    #[arg(short = 't', long)]
    pub end_time: Option<f64>,

    /// 单线程运行
    #[arg(long)]
    pub sequential: bool,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== StoneFlow 模拟启动 ===");

    let mut config = load_run_config(args.config.as_deref())?;
    let body = load_body_config(args.body.as_deref())?;
    if let Some(output) = args.output {
        config.run.output_dir = output;
    }
    if let Some(end_time) = args.end_time {
        config.run.end_time = end_time;
    }
    config.validate().context("运行配置无效")?;
    body.validate().context("物体配置无效")?;

    let scheduler = if args.sequential {
        Scheduler::Sequential
    } else {
        Scheduler::Rayon
    };

    let mut storage = lattice_sphere(&body)?;
    let n = storage.particle_cnt();
    info!(
        "初始条件: {} 粒子, 半径 {} m, 密度 {} kg/m³",
        n, body.radius, body.density
    );

    let equations = assemble_equations(&config, &body);
    let mut solver = AsymmetricSolver::new(scheduler, &config, equations)
        .context("求解器装配失败")?;
    solver.create(&mut storage).context("物理量装配失败")?;

    std::fs::create_dir_all(&config.run.output_dir)?;

    let mut stepping = TimeStepping::new(&config.timestep);
    let mut stats = Statistics::new();
    // 预估-校正与蛙跳从上一步的导数出发, 起步前先求值一次
    solver
        .integrate(&mut storage, 0.0, &mut stats)
        .context("初始导数求值失败")?;

    let start = Instant::now();
    let mut t = 0.0;
    let mut step_cnt = 0usize;
    let mut snapshot_cnt = 0usize;
    let mut last_snapshot = 0.0;

    info!(
        "开始模拟: 终止时刻 {} s, 初始 dt {} s",
        config.run.end_time, config.timestep.initial_step
    );

    while t < config.run.end_time {
        let used = match stepping.step(&mut solver, &mut storage, t, &mut stats) {
            Ok(used) => used,
            Err(err) => {
                warn!("t = {t:.4e} s 推进失败: {err}");
                break;
            }
        };
        t += used;
        step_cnt += 1;

        if step_cnt % 100 == 0 {
            log_progress(t, &stepping, &stats);
        }

        if config.run.snapshot_interval > 0.0 && t - last_snapshot >= config.run.snapshot_interval
        {
            let path = config
                .run
                .output_dir
                .join(format!("state_{snapshot_cnt:04}.sph"));
            sf_io::save_state(&path, &storage, t).context("快照写入失败")?;
            info!("快照 {} @ t = {t:.4e} s", path.display());
            last_snapshot = t;
            snapshot_cnt += 1;
        }
    }

    let final_path = config.run.output_dir.join("state_final.sph");
    sf_io::save_state(&final_path, &storage, t).context("末态快照写入失败")?;

    let elapsed = start.elapsed();
    info!("=== 模拟完成 ===");
    info!("总步数: {step_cnt}, 模拟时间: {t:.4e} s");
    info!("计算耗时: {:.2} s", elapsed.as_secs_f64());
    info!("末态快照: {}", final_path.display());
    Ok(())
}

fn load_run_config(path: Option<&std::path::Path>) -> Result<RunConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取 {}", path.display()))?;
            toml::from_str(&content).context("运行配置解析失败")
        }
        None => Ok(RunConfig::default()),
    }
}

fn load_body_config(path: Option<&std::path::Path>) -> Result<BodyConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取 {}", path.display()))?;
            toml::from_str(&content).context("物体配置解析失败")
        }
        None => Ok(BodyConfig::default()),
    }
}

/// 按配置装配方程项
fn assemble_equations(config: &RunConfig, body: &BodyConfig) -> EquationHolder {
    let mut equations = EquationHolder::new()
        .with(Box::new(PressureForce))
        .with(Box::new(ContinuityEquation::new(config.solver.continuity)));

    if config.solver.use_av {
        equations.push(Box::new(MonaghanViscosity));
    }
    if body.rheology == RheologyChoice::VonMises && body.shear_modulus > 0.0 {
        equations.push(Box::new(SolidStressForce));
    }
    if body.use_damage {
        let kernel_radius = match config.solver.kernel {
            KernelChoice::CubicSpline => CubicSpline.radius(),
            KernelChoice::FourthOrderSpline => FourthOrderSpline.radius(),
        };
        equations.push(Box::new(GradyKippDamage::new(kernel_radius)));
    }
    if config.smoothing.adaptive {
        equations.push(Box::new(AdaptiveSmoothingLength::new(&config.smoothing)));
    } else {
        equations.push(Box::new(ConstSmoothingLength));
    }
    equations
}

/// 球体内立方点阵初始条件
fn lattice_sphere(body: &BodyConfig) -> Result<Storage> {
    let r = body.radius;
    let volume = 4.0 / 3.0 * std::f64::consts::PI * r.powi(3);
    let spacing = (volume / body.particle_count as f64).cbrt();
    let h = 1.3 * spacing;

    let half = (r / spacing).ceil() as i64;
    let mut positions = Vec::new();
    for ix in -half..=half {
        for iy in -half..=half {
            for iz in -half..=half {
                let x = ix as f64 * spacing;
                let y = iy as f64 * spacing;
                let z = iz as f64 * spacing;
                if x * x + y * y + z * z <= r * r {
                    positions.push(DVec4::new(x, y, z, h));
                }
            }
        }
    }
    let n = positions.len();
    anyhow::ensure!(n > 0, "点阵为空: 半径或粒子数过小");
    let mass = body.density * volume / n as f64;

    let mut storage = Storage::new();
    storage.insert_values(QuantityId::Position, OrderEnum::Second, positions)?;
    storage.insert_uniform(QuantityId::Mass, OrderEnum::Zero, mass)?;
    storage.insert_uniform(QuantityId::Density, OrderEnum::First, body.density)?;
    storage.insert_uniform(QuantityId::Energy, OrderEnum::First, body.initial_energy)?;
    storage.insert_uniform(QuantityId::Flag, OrderEnum::Zero, 0u64)?;

    let material = Material::from_body_config(body)?;
    storage.add_material(material, 0..n)?;
    Ok(storage)
}

fn log_progress(t: f64, stepping: &TimeStepping, stats: &Statistics) {
    let neighbours = match stats.get(StatisticsId::NeighbourCnt) {
        Some(StatsValue::Means(m)) => format!(
            "邻居 {:.0}/{:.1}/{:.0}",
            m.min(),
            m.mean(),
            m.max()
        ),
        _ => String::from("邻居 -"),
    };
    info!(
        "t = {t:.4e} s, dt = {:.4e} s ({}), {neighbours}",
        stepping.dt(),
        stepping.limiting()
    );
}
