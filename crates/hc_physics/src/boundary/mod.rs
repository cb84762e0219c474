// crates/hc_physics/src/boundary/mod.rs

//! 边界条件施加
//!
//! 每次求解后由各求解器调用，把 ghost 单元与边界面设置为边界给出的值。

pub mod subsurface;
pub mod surface;

pub use subsurface::{enforce_head_bc, enforce_moisture_bc};
pub use surface::{enforce_surf_bc, enforce_velo_bc};
