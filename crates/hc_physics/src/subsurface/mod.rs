// crates/hc_physics/src/subsurface/mod.rs

//! 三维变饱和地下水（Richards 方程）
//!
//! 预测-校正格式：隐式求解压力水头，再由面通量显式更新含水量，
//! 越界含水量通过再分配修复。

pub mod assembly;
pub mod coefficients;
pub mod flux;
pub mod params;
pub mod reallocation;
pub mod solver;
pub mod state;

pub use assembly::{assemble, stencil_row, StencilRow};
pub use coefficients::face_conductivity;
pub use flux::{check_room, face_fluxes, update_water_content, volume_by_flux};
pub use params::{SubsurfaceParams, TopBoundary};
pub use reallocation::{
    finalize_moisture, head_gradients, reallocate, ReallocationOutcome, SplitRatio,
};
pub use solver::{SubsurfaceSolver, SubsurfaceStepReport};
pub use state::{SubsurfaceState, INACTIVE_HEAD};
