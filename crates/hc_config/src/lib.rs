// crates/hc_config/src/lib.rs

//! HydroCouple Config Layer
//!
//! 配置层：模型运行期不变的参数（网格、时间步、求解器、土壤、地表水、
//! 边界代码、物理开关），全部使用 f64 并以 JSON 序列化。
//!
//! # 模块概览
//!
//! - [`model_config`]: `ModelConfig` 及其各分节
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! hc_cli      ─> ModelConfig::from_file
//! hc_config   ─> ModelConfig, ConfigError (本层)
//! hc_physics  ─> 只读消费 ModelConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod model_config;

pub use error::ConfigError;
pub use model_config::{
    BoundaryConfig, FaceCode, GridConfig, ModelConfig, PhysicsSwitches, PreconditionerKind,
    SoilConfig, SolverSettings, SurfaceConfig, TimeConfig,
};
