// crates/hc_physics/src/subsurface/flux.rs

//! 面通量、含水量校正与体积诊断

use hc_config::FaceCode;

use super::assembly::effective_top_flux;
use super::params::{SubsurfaceParams, TopBoundary};
use super::state::SubsurfaceState;
use crate::coupling::CouplingBuffer;
use crate::grid::{Direction, GridTopology, StructuredGrid3D};

/// 由求解后的水头计算全部面通量，并把柱顶交换量记入耦合缓冲
pub fn face_fluxes(
    grid: &StructuredGrid3D,
    params: &SubsurfaceParams,
    state: &mut SubsurfaceState,
    coupling: &mut CouplingBuffer,
    dt: f64,
) {
    let (dx, dy) = (grid.dx, grid.dy);
    state.qx.fill(0.0);
    state.qy.fill(0.0);
    state.qz.fill(0.0);

    for &c in grid.interior_cells() {
        let (pi, pj, _) = grid.coords(c);
        if let Some(xp) = grid.neighbor(c, Direction::XPlus) {
            state.qx[c] = state.kx[c] * (state.h[xp] - state.h[c]) / dx;
        }
        if let Some(yp) = grid.neighbor(c, Direction::YPlus) {
            state.qy[c] = state.ky[c] * (state.h[yp] - state.h[c]) / dy;
        }
        if pi == 1 {
            if let Some(xm) = grid.neighbor(c, Direction::XMinus) {
                state.qx[xm] = state.kx[xm] * (state.h[c] - state.h[xm]) / dx;
            }
        }
        if pj == 1 {
            if let Some(ym) = grid.neighbor(c, Direction::YMinus) {
                state.qy[ym] = state.ky[ym] * (state.h[c] - state.h[ym]) / dy;
            }
        }

        let rho = state.density.r_rho[c];
        let kz = state.kz[c];
        state.qz[c] = match (grid.is_bottom(c), params.bc.bottom) {
            (true, FaceCode::FixedFlux) => params.bc.flux_bottom,
            (true, FaceCode::FreeDrainage) => -kz * rho,
            (true, FaceCode::FixedHead) => {
                kz * (params.bc.head_bottom - state.h[c]) / (0.5 * grid.dz(c)) - kz * rho
            }
            (true, FaceCode::NoFlow) => 0.0,
            (false, _) => match grid.neighbor(c, Direction::ZPlus) {
                Some(zp) => kz * (state.h[zp] - state.h[c]) / grid.dzf(c) - kz * rho,
                None => 0.0,
            },
        };
        if grid.is_bottom(c) {
            state.qbc_bottom[grid.column(c)] = state.qz[c];
        }
    }

    for col in grid.interior_columns() {
        let Some(top) = grid.top_cell(col) else {
            continue;
        };
        let Some(above) = grid.neighbor(top, Direction::ZMinus) else {
            continue;
        };
        let (q, evaporation) = top_flux(grid, params, state, coupling, top, above, col, dt);
        state.qz[above] = q;
        state.qbc_top[col] = q;
        if params.coupled {
            coupling.record_seepage(col, (q - evaporation) * dt);
        }
    }
}

/// 柱顶面通量，返回 (通量, 其中的蒸发部分)
#[allow(clippy::too_many_arguments)]
fn top_flux(
    grid: &StructuredGrid3D,
    params: &SubsurfaceParams,
    state: &SubsurfaceState,
    coupling: &CouplingBuffer,
    top: usize,
    above: usize,
    col: usize,
    dt: f64,
) -> (f64, f64) {
    let kz = state.kz[above];
    let rho = state.density.r_rho[above];
    let dzm = 0.5 * grid.dz(top);
    let gradient = |h_above: f64| kz * (state.h[top] - h_above) / dzm - kz * rho;
    let wc = state.wc[top];

    match params.top_boundary(coupling, col) {
        TopBoundary::Ponded { depth } => {
            let mut q = gradient(depth);
            // 入渗不能超过现有积水
            if q < 0.0 && -q * dt > depth {
                q = -depth / dt;
            }
            (q, 0.0)
        }
        TopBoundary::Dry(FaceCode::FixedFlux) => {
            let mut q = gradient(0.0).max(0.0);
            let qtop = coupling.qtop[col];
            let mut evaporation = 0.0;
            if qtop > 0.0 && wc > params.vg.wcr + qtop * dt / grid.dz(top) {
                evaporation = qtop;
                q += qtop;
            }
            (q, evaporation)
        }
        TopBoundary::Dry(FaceCode::FreeDrainage) | TopBoundary::Uncoupled(FaceCode::FreeDrainage) => {
            (-kz * rho, 0.0)
        }
        TopBoundary::Dry(FaceCode::FixedHead) => (gradient(coupling.depth[col].max(0.0)), 0.0),
        TopBoundary::Uncoupled(FaceCode::FixedHead) => (gradient(params.bc.head_top), 0.0),
        TopBoundary::Uncoupled(FaceCode::FixedFlux) => {
            let q = effective_top_flux(params, coupling.qtop[col], wc);
            (q, q.max(0.0))
        }
        TopBoundary::Dry(FaceCode::NoFlow) | TopBoundary::Uncoupled(FaceCode::NoFlow) => (0.0, 0.0),
    }
}

/// 通量校正后的含水量
///
/// `θ = (θⁿ + dt·∇·q) / (1 + Ss·(h - hⁿ)/θs)`；未启用校正时直接取 θ(h)。
/// 分母中比储水项吸收的体积 `(coef - 1)·θ·V` 累加到 `vss`。
pub fn update_water_content(
    grid: &StructuredGrid3D,
    params: &SubsurfaceParams,
    state: &mut SubsurfaceState,
    dt: f64,
) {
    let vg = &params.vg;
    for &c in grid.interior_cells() {
        if !grid.is_active(c) {
            continue;
        }
        if !params.use_corrector {
            state.wc[c] = vg.moisture_from_head(state.h[c]);
            continue;
        }
        let div = flux_divergence(grid, state, c);
        let coef = 1.0 + params.soil.specific_storage * (state.h[c] - state.hn[c]) / vg.wcs;
        state.wc[c] = (state.wcn[c] + dt * div) / coef;
        state.vss[c] += (coef - 1.0) * state.wc[c] * grid.volume(c);
    }
}

/// 单元净流入通量 [1/s]
fn flux_divergence(grid: &StructuredGrid3D, state: &SubsurfaceState, c: usize) -> f64 {
    let m = |dir| grid.neighbor(c, dir).unwrap_or(c);
    let (xm, ym, zm) = (m(Direction::XMinus), m(Direction::YMinus), m(Direction::ZMinus));
    (state.qx[c] - state.qx[xm]) / grid.dx
        + (state.qy[c] - state.qy[ym]) / grid.dy
        + (state.qz[c] - state.qz[zm]) / grid.dz(c)
}

/// 剩余可容纳体积
pub fn check_room(grid: &StructuredGrid3D, params: &SubsurfaceParams, state: &mut SubsurfaceState) {
    for &c in grid.interior_cells() {
        state.room[c] = if grid.is_active(c) {
            (params.vg.wcs - state.wc[c]) * grid.volume(c)
        } else {
            0.0
        };
    }
}

/// 由通量推算的含水体积 `Vg + dt·Σ(面通量·面积)`
pub fn volume_by_flux(grid: &StructuredGrid3D, state: &mut SubsurfaceState, dt: f64) {
    let (dx, dy) = (grid.dx, grid.dy);
    for &c in grid.interior_cells() {
        if !grid.is_active(c) {
            state.vg_flux[c] = 0.0;
            continue;
        }
        let dz = grid.dz(c);
        let m = |dir| grid.neighbor(c, dir).unwrap_or(c);
        let (xm, ym, zm) = (m(Direction::XMinus), m(Direction::YMinus), m(Direction::ZMinus));
        state.vg_flux[c] = state.vg[c]
            + dt * ((state.qx[c] - state.qx[xm]) * dy * dz
                + (state.qy[c] - state.qy[ym]) * dx * dz
                + (state.qz[c] - state.qz[zm]) * dx * dy);
    }
}
