// apps/sf_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 解析并校验运行/物体配置；不给文件时打印默认配置。

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use sf_config::{BodyConfig, RunConfig};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 运行配置文件 (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 物体配置文件 (TOML)
    #[arg(short, long)]
    pub body: Option<PathBuf>,

    /// 打印默认配置
    #[arg(long)]
    pub defaults: bool,
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    if args.defaults || (args.config.is_none() && args.body.is_none()) {
        print_defaults()?;
        return Ok(());
    }

    let mut failures = 0usize;
    if let Some(path) = &args.config {
        match check_run_config(path) {
            Ok(()) => info!("运行配置有效: {}", path.display()),
            Err(err) => {
                eprintln!("运行配置无效: {err:#}");
                failures += 1;
            }
        }
    }
    if let Some(path) = &args.body {
        match check_body_config(path) {
            Ok(()) => info!("物体配置有效: {}", path.display()),
            Err(err) => {
                eprintln!("物体配置无效: {err:#}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("验证失败: {failures} 个文件存在问题");
    }
    Ok(())
}

fn check_run_config(path: &PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取 {}", path.display()))?;
    let config: RunConfig = toml::from_str(&content).context("TOML 解析失败")?;
    config.validate().context("参数校验失败")?;
    Ok(())
}

fn check_body_config(path: &PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取 {}", path.display()))?;
    let body: BodyConfig = toml::from_str(&content).context("TOML 解析失败")?;
    body.validate().context("参数校验失败")?;
    Ok(())
}

fn print_defaults() -> Result<()> {
    println!("# 默认运行配置");
    println!("{}", toml::to_string_pretty(&RunConfig::default())?);
    println!("# 默认物体配置");
    println!("{}", toml::to_string_pretty(&BodyConfig::default())?);
    Ok(())
}
