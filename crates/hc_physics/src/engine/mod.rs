// crates/hc_physics/src/engine/mod.rs

//! 求解引擎
//!
//! # 模块结构
//!
//! - `linear_solve` - 线性求解适配器（预条件器选择、不收敛映射）
//! - `timestep` - 质量不平衡 + Courant 自适应时间步
//! - `driver` - 耦合步驱动与重算

pub mod driver;
pub mod linear_solve;
pub mod timestep;

pub use driver::{CoupledModel, CoupledModelBuilder, InitialCondition, StepReport, WaterBudget};
pub use linear_solve::{LinearSolveAdapter, LinearSystem, SolveStats};
pub use timestep::AdaptiveStepController;
