// apps/hc_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示系统信息、默认配置或指定配置的网格摘要。

use anyhow::{Context, Result};
use clap::Args;
use hc_config::ModelConfig;
use std::path::PathBuf;
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 显示系统信息
    #[arg(long)]
    pub system: bool,

    /// 以 JSON 输出默认配置
    #[arg(long)]
    pub defaults: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== HydroCouple 信息 ===");

    if args.system {
        print_system_info();
    }
    if args.defaults {
        let json = serde_json::to_string_pretty(&ModelConfig::default())?;
        println!("{}", json);
    }
    if let Some(path) = &args.config {
        let config = ModelConfig::from_file(path)
            .with_context(|| format!("无法加载配置: {}", path.display()))?;
        print_model_summary(&config);
    }
    if args.config.is_none() && !args.system && !args.defaults {
        print_system_info();
        println!();
        print_model_summary(&ModelConfig::default());
    }
    Ok(())
}

fn print_system_info() {
    println!("=== 系统信息 ===");
    println!("HydroCouple CLI 版本: {}", env!("CARGO_PKG_VERSION"));
    println!("目标平台: {}", std::env::consts::ARCH);
    println!("操作系统: {}", std::env::consts::OS);
    let threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    println!("可用线程: {}", threads);
}

fn print_model_summary(config: &ModelConfig) {
    let g = &config.grid;
    let depth: f64 = g.dz.iter().sum();
    println!("=== 模型配置 ===");
    println!("网格: {} x {} x {} (dx={} m, dy={} m)", g.nx, g.ny, g.nz, g.dx, g.dy);
    println!("土层总厚: {:.3} m", depth);
    println!("子域划分: {} x {}", g.npx, g.npy);
    println!(
        "时间步: 初始 {} s, 范围 [{}, {}] s, 结束 {} s",
        config.time.dt_init, config.time.dt_min, config.time.dt_max, config.time.t_end
    );
    println!(
        "土壤: α={} 1/m, n={}, Ks=({:.2e}, {:.2e}, {:.2e}) m/s, θs={}, θr={}",
        config.soil.alpha,
        config.soil.n_vg,
        config.soil.ks_x,
        config.soil.ks_y,
        config.soil.ks_z,
        config.soil.wcs,
        config.soil.wcr
    );
    println!(
        "地表: Manning={}, 最小水深={} m",
        config.surface.manning, config.surface.min_depth
    );
    let p = &config.physics;
    println!(
        "物理开关: 地下水={}, 地表水={}, 三维={}, 再分配={}",
        p.groundwater, p.shallow_water, p.full_3d, p.reallocate
    );
}
