// crates/hc_physics/src/surface/mod.rs

//! 二维半隐式浅水（交错网格）
//!
//! `u[c]` 位于单元 `c` 的 +x 面，`v[c]` 位于 +y 面；面上的深度、面积与体积
//! 同样按 + 面存放。自由面高程隐式求解，动量显式项与拖曳半隐式处理。

pub mod assembly;
pub mod momentum;
pub mod solver;
pub mod state;
pub mod velocity;
pub mod wetting;

pub use assembly::{
    assemble as assemble_elevation, classify_rows, surface_row, RowKind, SurfaceRow,
};
pub use momentum::momentum_source;
pub use solver::{SurfaceSolver, SurfaceStepReport};
pub use state::SurfaceState;
pub use velocity::{check_cfl, interp_velocity, update_flows, update_velocity, volume_by_flux};
pub use wetting::{
    cfl_limiter, evaprain, update_depth, update_drag, update_geometry, waterfall_location,
};
