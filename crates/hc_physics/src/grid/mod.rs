// crates/hc_physics/src/grid/mod.rs

//! 结构化网格、方向枚举与子域划分

pub mod direction;
pub mod partition;
pub mod structured;

pub use direction::{Axis, Direction};
pub use partition::{HaloLink, HaloPlan, Subdomain};
pub use structured::{CellId, GridTopology, StructuredGrid2D, StructuredGrid3D};
