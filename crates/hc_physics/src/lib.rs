// crates/hc_physics/src/lib.rs

//! 地表-地下耦合水流物理核心
//!
//! - 三维变饱和地下水：Richards 方程预测-校正，越界含水量再分配
//! - 二维浅水：交错网格半隐式自由面
//! - 两域通过逐柱缓冲交换渗流与积水
//!
//! # 模块
//!
//! - [`grid`]: 结构化网格、方向枚举、子域与 halo
//! - [`material`]: van Genuchten–Mualem 闭合关系
//! - [`numerics`]: CSR 矩阵、预条件器与 PCG
//! - [`subsurface`] / [`surface`]: 两个求解域
//! - [`boundary`]: 边界条件施加
//! - [`coupling`]: 耦合缓冲
//! - [`forcing`]: 时间序列强迫
//! - [`transport`]: 子域间通信
//! - [`engine`]: 线性求解适配、自适应时间步、耦合步驱动
//!
//! # 单步顺序
//!
//! ```text
//! 强迫 → 地表高程 → 地下水 → (重算?) → 渗流施加 → 地表流速 → 时间步
//! ```
//!
//! 每个子域单线程执行，跨子域读取之前先做 halo 交换。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod coupling;
pub mod engine;
pub mod error;
pub mod forcing;
pub mod grid;
pub mod material;
pub mod numerics;
pub mod subsurface;
pub mod surface;
pub mod transport;

pub use coupling::CouplingBuffer;
pub use engine::{
    AdaptiveStepController, CoupledModel, CoupledModelBuilder, InitialCondition,
    LinearSolveAdapter, LinearSystem, StepReport, WaterBudget,
};
pub use error::{PhysicsError, PhysicsResult};
pub use forcing::{ForcingSet, ForcingSnapshot, TimeSeries};
pub use grid::{CellId, Direction, GridTopology, StructuredGrid2D, StructuredGrid3D, Subdomain};
pub use material::{DensityFactors, VanGenuchten};
pub use subsurface::{SubsurfaceSolver, SubsurfaceState};
pub use surface::{SurfaceSolver, SurfaceState};
pub use transport::{LocalCluster, LocalTransport, SerialTransport, Transport};

/// 常用类型
pub mod prelude {
    pub use crate::engine::{CoupledModel, InitialCondition, StepReport};
    pub use crate::error::{PhysicsError, PhysicsResult};
    pub use crate::forcing::{ForcingSet, TimeSeries};
    pub use crate::grid::{Direction, GridTopology};
    pub use crate::transport::{SerialTransport, Transport};
}
