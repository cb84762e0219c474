// crates/hc_physics/src/boundary/subsurface.rs

//! 地下水 ghost 单元赋值
//!
//! - 侧面：零梯度复制；定水头侧面保持给定的 ghost 水头
//! - 底面：定水头取 `head_bottom`，否则复制
//! - 顶面：耦合时取地表水深，不耦合定水头取 `head_top`，否则复制

use hc_config::FaceCode;

use crate::coupling::CouplingBuffer;
use crate::grid::{Direction, GridTopology, StructuredGrid3D};
use crate::subsurface::{SubsurfaceParams, SubsurfaceState};

/// 水头边界
pub fn enforce_head_bc(
    grid: &StructuredGrid3D,
    params: &SubsurfaceParams,
    state: &mut SubsurfaceState,
    coupling: &CouplingBuffer,
) {
    for &c in grid.interior_cells() {
        for side in grid.physical_sides(c) {
            if params.side_code(side) == FaceCode::FixedHead {
                continue;
            }
            if let Some(g) = grid.neighbor(c, side) {
                state.h[g] = state.h[c];
            }
        }
        if grid.is_bottom(c) {
            if let Some(g) = grid.neighbor(c, Direction::ZPlus) {
                state.h[g] = if params.bc.bottom == FaceCode::FixedHead {
                    params.bc.head_bottom
                } else {
                    state.h[c]
                };
            }
        }
    }

    for col in grid.interior_columns() {
        let Some(top) = grid.top_cell(col) else {
            continue;
        };
        let Some(above) = grid.neighbor(top, Direction::ZMinus) else {
            continue;
        };
        let boundary = params.top_boundary(coupling, col);
        state.h[above] = boundary
            .ghost_head(params.bc.head_top, coupling.depth[col])
            .unwrap_or(state.h[top]);
    }
}

/// 含水量边界（ghost 复制，定水头侧面由其水头给出）
pub fn enforce_moisture_bc(
    grid: &StructuredGrid3D,
    params: &SubsurfaceParams,
    state: &mut SubsurfaceState,
) {
    for &c in grid.interior_cells() {
        for side in grid.physical_sides(c) {
            if let Some(g) = grid.neighbor(c, side) {
                state.wc[g] = if params.side_code(side) == FaceCode::FixedHead {
                    params.vg.moisture_from_head(state.h[g])
                } else {
                    state.wc[c]
                };
            }
        }
        if grid.is_bottom(c) {
            if let Some(g) = grid.neighbor(c, Direction::ZPlus) {
                state.wc[g] = state.wc[c];
            }
        }
    }
    for col in grid.interior_columns() {
        if let Some(top) = grid.top_cell(col) {
            if let Some(above) = grid.neighbor(top, Direction::ZMinus) {
                if !grid.is_interior(above) {
                    state.wc[above] = state.wc[top];
                }
            }
        }
    }
}
