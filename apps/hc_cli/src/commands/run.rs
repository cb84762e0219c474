// apps/hc_cli/src/commands/run.rs

//! 运行模拟命令
//!
//! 子域数大于 1 时每个子域一个线程，经进程内通信层同步。

use anyhow::{bail, Context, Result};
use clap::Args;
use hc_config::ModelConfig;
use hc_physics::engine::{CoupledModel, InitialCondition, WaterBudget};
use hc_physics::forcing::ForcingSet;
use hc_physics::transport::{LocalCluster, SerialTransport, Transport};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// 运行模拟参数
#[derive(Args)]
pub struct RunArgs {
    /// 模型配置文件 (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// 强迫数据文件 (JSON)
    #[arg(short, long)]
    pub forcing: Option<PathBuf>,

    /// 模拟结束时间 [秒]，缺省取配置中的 time.t_end
    #[arg(short = 't', long)]
    pub end_time: Option<f64>,

    /// 初始地下水位埋深 [m]
    #[arg(long, default_value = "1.0")]
    pub water_table: f64,

    /// 初始积水深 [m]
    #[arg(long, default_value = "0.0")]
    pub ponding_depth: f64,

    /// 每隔多少步输出一次摘要
    #[arg(long, default_value = "10")]
    pub report_every: usize,
}

/// 单个子域的运行结果
struct RankOutcome {
    steps: usize,
    time: f64,
    before: WaterBudget,
    after: WaterBudget,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== HydroCouple 模拟启动 ===");

    let config = ModelConfig::from_file(&args.config)
        .with_context(|| format!("无法加载配置: {}", args.config.display()))?;
    let forcing = match &args.forcing {
        Some(path) => ForcingSet::from_file(path)
            .with_context(|| format!("无法加载强迫数据: {}", path.display()))?,
        None => ForcingSet::default(),
    };
    let t_end = args.end_time.unwrap_or(config.time.t_end);
    if t_end <= 0.0 {
        bail!("结束时间必须为正: {}", t_end);
    }
    let initial = InitialCondition {
        water_table: args.water_table,
        ponding_depth: args.ponding_depth,
    };
    let report_every = args.report_every.max(1);

    let g = &config.grid;
    info!(
        "网格: {}x{}x{}, 子域 {}x{}, 地下水={}, 地表水={}",
        g.nx, g.ny, g.nz, g.npx, g.npy, config.physics.groundwater, config.physics.shallow_water
    );
    info!("开始模拟: 结束时间={} s, dt_init={} s", t_end, config.time.dt_init);

    let start = Instant::now();
    let n_ranks = config.grid.n_subdomains();
    let outcome = if n_ranks == 1 {
        run_rank(&config, &forcing, initial, Box::new(SerialTransport), t_end, report_every)?
    } else {
        let results: Vec<Result<RankOutcome>> = std::thread::scope(|s| {
            let handles: Vec<_> = LocalCluster::new(n_ranks)
                .into_iter()
                .map(|t| {
                    let (config, forcing) = (&config, &forcing);
                    s.spawn(move || {
                        run_rank(config, forcing, initial, Box::new(t), t_end, report_every)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(_) => Err(anyhow::anyhow!("子域线程异常退出")),
                })
                .collect()
        });
        let mut outcomes = results.into_iter().collect::<Result<Vec<_>>>()?;
        outcomes.swap_remove(0)
    };

    let elapsed = start.elapsed();
    let (before, after) = (outcome.before, outcome.after);
    let drift = after.total() - before.total();
    info!("=== 模拟完成 ===");
    info!("总步数: {}, 模拟时间: {:.3} s", outcome.steps, outcome.time);
    info!("计算时间: {:.2} s", elapsed.as_secs_f64());
    info!(
        "水量: 地下 {:.6e} m³, 地表 {:.6e} m³, 损失 {:.3e} m³, 变化 {:.3e} m³",
        after.subsurface, after.surface, after.loss, drift
    );
    Ok(())
}

fn run_rank(
    config: &ModelConfig,
    forcing: &ForcingSet,
    initial: InitialCondition,
    transport: Box<dyn Transport>,
    t_end: f64,
    report_every: usize,
) -> Result<RankOutcome> {
    let is_root = transport.rank() == 0;
    let mut model = CoupledModel::builder(config.clone())
        .forcing(forcing.clone())
        .initial(initial)
        .build(transport)
        .context("构建耦合模型失败")?;

    let before = model.water_budget()?;
    let mut count = 0usize;
    let steps = model
        .run_until(t_end, |report| {
            count += 1;
            if is_root && count % report_every == 0 {
                info!("{}", report.summary());
            }
        })
        .context("时间推进失败")?;
    let after = model.water_budget()?;

    Ok(RankOutcome {
        steps,
        time: model.time(),
        before,
        after,
    })
}
