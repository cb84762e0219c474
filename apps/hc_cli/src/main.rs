// apps/hc_cli/src/main.rs

//! HydroCouple 命令行界面
//!
//! 读取 JSON 配置与强迫文件，驱动地下水/地表水耦合模型。

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::FmtSubscriber;

/// HydroCouple 耦合水文模型命令行工具
#[derive(Parser)]
#[command(name = "hc_cli")]
#[command(author = "HydroCouple Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Coupled groundwater / shallow water model", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行模拟
    Run(commands::run::RunArgs),
    /// 显示信息
    Info(commands::info::InfoArgs),
    /// 验证配置
    Validate(commands::validate::ValidateArgs),
}

fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 物理核心用 log 宏输出，try_init 同时桥接 log 记录
    FmtSubscriber::builder()
        .with_max_level(parse_level(&cli.log_level))
        .with_target(false)
        .finish()
        .try_init()?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("unknown"), Level::INFO);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["hc_cli", "run", "--config", "model.json", "-t", "60"])
            .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.end_time, Some(60.0));
                assert!(args.forcing.is_none());
            }
            _ => panic!("应解析为 run"),
        }
    }
}
