// crates/hc_physics/src/boundary/surface.rs

//! 地表水边界
//!
//! - 水位：不低于底面；潮位单元取给定潮位；物理边界 ghost 复制内部
//! - 流速：物理边界为闭边界（法向流速为零）；潮位单元所在边界面的
//!   法向流速由单元连续方程反推

use crate::forcing::{ForcingLayout, ForcingSnapshot};
use crate::grid::{Direction, GridTopology, StructuredGrid2D};
use crate::surface::{update_flows, SurfaceState};

/// 水位边界
///
/// 低于底面的水位抬回底面，补入的水量从累积损失中扣除。
pub fn enforce_surf_bc(
    grid: &StructuredGrid2D,
    layout: &ForcingLayout,
    snapshot: &ForcingSnapshot,
    state: &mut SurfaceState,
) {
    let area = grid.area();
    for &c in grid.interior_cells() {
        if state.eta[c] < state.bottom[c] {
            state.loss -= (state.bottom[c] - state.eta[c]) * area;
            state.eta[c] = state.bottom[c];
        }
    }
    for (cells, &tide) in layout.tide_cells.iter().zip(&snapshot.tide) {
        for &c in cells {
            state.eta[c] = tide.max(state.bottom[c]);
        }
    }
    for side in Direction::LATERAL {
        for (g, c) in grid.physical_ghosts(side) {
            state.eta[g] = state.eta[c];
        }
    }
}

/// 流速边界，返回经开边界流入的体积 [m³]
pub fn enforce_velo_bc(
    grid: &StructuredGrid2D,
    layout: &ForcingLayout,
    dt: f64,
    state: &mut SurfaceState,
) -> f64 {
    for side in Direction::LATERAL {
        for (g, c) in grid.physical_ghosts(side) {
            state.u[g] = state.u[c];
            state.v[g] = state.v[c];
        }
    }

    // 闭边界
    for &c in grid.interior_cells() {
        for side in Direction::LATERAL {
            if grid.on_physical_side(c, side) {
                if let Some((field, face)) = normal_face(grid, c, side) {
                    set_face(state, field, face, 0.0);
                }
            }
        }
    }
    update_flows(grid, dt, state);

    // 潮位开边界
    let mut inflow = 0.0;
    for &c in layout.tide_cells.iter().flatten() {
        let storage = (state.eta[c] - state.etan[c]) * state.area_z[c] / dt;
        for side in Direction::LATERAL {
            if !grid.on_physical_side(c, side) {
                continue;
            }
            let Some((field, face)) = normal_face(grid, c, side) else {
                continue;
            };
            let xm = grid.neighbor(c, Direction::XMinus).unwrap_or(c);
            let ym = grid.neighbor(c, Direction::YMinus).unwrap_or(c);
            let (fx, fy) = (&state.flow_x, &state.flow_y);
            // 边界面流量（沿 + 方向为正）
            let flow = match side {
                Direction::XMinus => storage + fx[c] + fy[c] - fy[ym],
                Direction::XPlus => fx[xm] + fy[ym] - fy[c] - storage,
                Direction::YMinus => storage + fy[c] + fx[c] - fx[xm],
                Direction::YPlus => fy[ym] + fx[xm] - fx[c] - storage,
                Direction::ZPlus | Direction::ZMinus => continue,
            };
            let area = match field {
                Field::U => state.area_x[face],
                Field::V => state.area_y[face],
            };
            let vel = if area > 0.0 { flow / area } else { 0.0 };
            set_face(state, field, face, vel);
            let flow = vel * area;
            match field {
                Field::U => state.flow_x[face] = flow,
                Field::V => state.flow_y[face] = flow,
            }
            let entering = if side.is_plus() { -flow } else { flow };
            inflow += entering * dt;
        }
    }
    update_flows(grid, dt, state);
    inflow
}

#[derive(Debug, Clone, Copy)]
enum Field {
    U,
    V,
}

/// 内部单元在 `side` 侧边界面的存放位置
fn normal_face(grid: &StructuredGrid2D, c: usize, side: Direction) -> Option<(Field, usize)> {
    match side {
        Direction::XPlus => Some((Field::U, c)),
        Direction::YPlus => Some((Field::V, c)),
        Direction::XMinus => grid.neighbor(c, side).map(|g| (Field::U, g)),
        Direction::YMinus => grid.neighbor(c, side).map(|g| (Field::V, g)),
        Direction::ZPlus | Direction::ZMinus => None,
    }
}

#[inline]
fn set_face(state: &mut SurfaceState, field: Field, face: usize, value: f64) {
    match field {
        Field::U => state.u[face] = value,
        Field::V => state.v[face] = value,
    }
}
