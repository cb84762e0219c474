// apps/hc_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 解析配置与强迫文件并执行完整校验，另给出若干数值上的警告。

use anyhow::{bail, Result};
use clap::Args;
use hc_config::ModelConfig;
use hc_physics::forcing::ForcingSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 强迫数据文件路径
    #[arg(short, long)]
    pub forcing: Option<PathBuf>,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== HydroCouple 配置验证 ===");

    if args.config.is_none() && args.forcing.is_none() {
        println!("用法: hc_cli validate --config <配置文件> [--forcing <强迫文件>]");
        return Ok(());
    }

    let mut result = ValidationResult::default();
    if let Some(path) = &args.config {
        validate_config(path, &mut result);
    }
    if let Some(path) = &args.forcing {
        validate_forcing(path, &mut result);
    }
    print_validation_result(&result, args.strict)
}

fn validate_config(path: &Path, result: &mut ValidationResult) {
    println!("\n检查配置文件: {}", path.display());
    let config = match ModelConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            result.add_error(format!("配置无效: {}", e));
            return;
        }
    };
    check_config_warnings(&config, result);
    println!("  ✓ 配置文件有效");
}

fn check_config_warnings(config: &ModelConfig, result: &mut ValidationResult) {
    let soil = &config.soil;
    if soil.n_vg < 1.1 {
        result.add_warning(format!("van Genuchten n = {} 接近 1，曲线极陡", soil.n_vg));
    }
    if soil.wcs - soil.wcr < 0.05 {
        result.add_warning("θs - θr 过小，含水量对水头不敏感");
    }
    if config.surface.min_depth > 0.01 {
        result.add_warning(format!(
            "最小水深 {} m 较大，薄层水体会被直接移除",
            config.surface.min_depth
        ));
    }
    if config.time.dt_max / config.time.dt_min > 1e8 {
        result.add_warning("dt_max/dt_min 跨度过大");
    }
    if config.physics.density_flow {
        result.add_warning("density_flow 已启用，密度因子需由调用方提供");
    }
}

fn validate_forcing(path: &Path, result: &mut ValidationResult) {
    println!("\n检查强迫文件: {}", path.display());
    match ForcingSet::from_file(path) {
        Ok(forcing) => {
            if forcing.rain.is_none() && forcing.tides.is_empty() && forcing.inflows.is_empty() {
                result.add_warning("强迫文件中没有降雨、潮位或入流");
            }
            println!("  ✓ 强迫文件有效");
        }
        Err(e) => result.add_error(format!("强迫数据无效: {}", e)),
    }
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!("\n=== 验证结果 ===");

    if !result.errors.is_empty() {
        println!("\n错误 ({}):", result.errors.len());
        for err in &result.errors {
            error!("  ✗ {}", err);
        }
    }
    if !result.warnings.is_empty() {
        println!("\n警告 ({}):", result.warnings.len());
        for warning in &result.warnings {
            warn!("  ⚠ {}", warning);
        }
    }

    if result.is_ok(strict) {
        println!("\n✓ 验证通过");
        Ok(())
    } else {
        println!("\n✗ 验证失败");
        bail!(
            "验证失败：发现 {} 个错误，{} 个警告",
            result.errors.len(),
            result.warnings.len()
        )
    }
}
