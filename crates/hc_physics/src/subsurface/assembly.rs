// crates/hc_physics/src/subsurface/assembly.rs

//! Richards 方程隐式有限体积组装
//!
//! 每行乘以层厚 dz，使变层厚网格上的矩阵仍然对称：
//!
//! ```text
//! G±x = -K·dt·dz/dx²      G±y = -K·dt·dz/dy²
//! G+z = -Kz[c]·dt/dzf[c]  G-z = -Kz[上]·dt/dzf[上]（柱顶取 0.5·dz）
//! Ct  = S·dz - ΣG
//! ```
//!
//! 非激活单元写单位行。非对角项只连接本子域内部的激活邻居，
//! ghost 邻居以 hⁿ 移到右端项。

use hc_config::FaceCode;

use super::coefficients::storage_coefficient;
use super::params::{SubsurfaceParams, TopBoundary};
use super::state::SubsurfaceState;
use crate::coupling::CouplingBuffer;
use crate::engine::LinearSystem;
use crate::grid::{CellId, Direction, GridTopology, StructuredGrid3D};
use crate::numerics::linear_algebra::CsrBuilder;

/// 对角项下限，低于此值按单位行处理
const DIAG_FLOOR: f64 = 1e-300;

/// 单行模板系数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StencilRow {
    /// 六个方向的耦合系数（按 [`Direction::index`] 排列）
    pub g: [f64; 6],
    /// 对角项
    pub diagonal: f64,
    /// 右端项
    pub rhs: f64,
}

/// 柱顶给定通量的有效值（蒸发需有余水，入渗需未饱和）
pub fn effective_top_flux(params: &SubsurfaceParams, qtop: f64, wc: f64) -> f64 {
    if (qtop < 0.0 && wc < params.vg.wcs) || (qtop > 0.0 && wc > params.vg.wcr) {
        qtop
    } else {
        0.0
    }
}

/// 计算单个激活内部单元的模板系数
pub fn stencil_row(
    grid: &StructuredGrid3D,
    params: &SubsurfaceParams,
    state: &SubsurfaceState,
    coupling: &CouplingBuffer,
    cell: CellId,
    dt: f64,
) -> StencilRow {
    let dz = grid.dz(cell);
    let (dx, dy) = (grid.dx, grid.dy);
    let rho = &state.density;
    let mut row = StencilRow::default();

    let above = grid.neighbor(cell, Direction::ZMinus);
    let minus = |dir: Direction| grid.neighbor(cell, dir).unwrap_or(cell);
    let xm = minus(Direction::XMinus);
    let ym = minus(Direction::YMinus);
    let zm = above.unwrap_or(cell);

    row.g[Direction::XPlus.index()] = -state.kx[cell] * dt * dz / (dx * dx);
    row.g[Direction::XMinus.index()] = -state.kx[xm] * dt * dz / (dx * dx);
    row.g[Direction::YPlus.index()] = -state.ky[cell] * dt * dz / (dy * dy);
    row.g[Direction::YMinus.index()] = -state.ky[ym] * dt * dz / (dy * dy);
    row.g[Direction::ZPlus.index()] = -state.kz[cell] * dt / grid.dzf(cell);
    let is_top = grid.is_top(cell);
    let dzm = if is_top { 0.5 * dz } else { grid.dzf(zm) };
    row.g[Direction::ZMinus.index()] = -state.kz[zm] * dt / dzm;

    let storage = storage_coefficient(params, state, cell) * dz;
    let lateral: f64 = Direction::LATERAL.iter().map(|d| row.g[d.index()]).sum();
    let gzp = row.g[Direction::ZPlus.index()];
    let gzm = row.g[Direction::ZMinus.index()];

    row.diagonal = storage - lateral;
    row.rhs = storage * state.hn[cell]
        - dt * (state.kz[cell] * rho.r_rho[cell] - state.kz[zm] * rho.r_rho[zm])
        - state.wc[cell] * (rho.r_rho[cell] - rho.r_rho_prev[cell]) * dz;

    // 侧向 ghost 邻居以 hⁿ 进入右端项
    for dir in Direction::LATERAL {
        if let Some(n) = grid.neighbor(cell, dir) {
            if !grid.is_interior(n) {
                row.rhs -= row.g[dir.index()] * state.hn[n];
            }
        }
    }

    // 底面
    if grid.is_bottom(cell) {
        match params.bc.bottom {
            FaceCode::FixedHead => {
                row.diagonal -= gzp;
                row.rhs -= gzp * params.bc.head_bottom;
            }
            FaceCode::FixedFlux => {
                row.rhs += dt * params.bc.flux_bottom + dt * state.kz[cell] * rho.r_rho[cell];
            }
            FaceCode::FreeDrainage | FaceCode::NoFlow => {}
        }
    } else {
        row.diagonal -= gzp;
    }

    // 顶面
    if is_top {
        let col = grid.column(cell);
        let boundary = params.top_boundary(coupling, col);
        if boundary.is_head_coupled() {
            row.diagonal -= gzm;
        }
        let gravity_top = dt * state.kz[zm] * rho.r_rho[zm];
        match boundary {
            TopBoundary::Ponded { depth } => row.rhs -= gzm * depth,
            TopBoundary::Dry(FaceCode::FixedHead) => {
                row.rhs -= gzm * coupling.depth[col].max(0.0)
            }
            TopBoundary::Uncoupled(FaceCode::FixedHead) => row.rhs -= gzm * params.bc.head_top,
            TopBoundary::Dry(FaceCode::FixedFlux) => {
                // 无积水时只允许蒸发
                let q = effective_top_flux(params, coupling.qtop[col].max(0.0), state.wc[cell]);
                row.rhs -= dt * q + gravity_top;
            }
            TopBoundary::Uncoupled(FaceCode::FixedFlux) => {
                let q = effective_top_flux(params, coupling.qtop[col], state.wc[cell]);
                row.rhs -= dt * q + gravity_top;
            }
            _ => {}
        }
    } else {
        row.diagonal -= gzm;
    }

    row
}

/// 组装线性系统
pub fn assemble(
    grid: &StructuredGrid3D,
    params: &SubsurfaceParams,
    state: &SubsurfaceState,
    coupling: &CouplingBuffer,
    dt: f64,
) -> LinearSystem {
    let n = grid.n_rows();
    let mut builder = CsrBuilder::new_square(n);
    let mut rhs = vec![0.0; n];

    for (r, &c) in grid.interior_cells().iter().enumerate() {
        if !grid.is_active(c) {
            builder.set_identity_row(r);
            rhs[r] = state.hn[c];
            continue;
        }
        let row = stencil_row(grid, params, state, coupling, c, dt);
        if row.diagonal.abs() < DIAG_FLOOR {
            builder.set_identity_row(r);
            rhs[r] = state.hn[c];
            continue;
        }
        builder.set(r, r, row.diagonal);
        for dir in Direction::ALL {
            let g = row.g[dir.index()];
            if g == 0.0 {
                continue;
            }
            if let Some(col) = grid.active_interior_neighbor(c, dir).and_then(|n| grid.row_of(n)) {
                builder.set(r, col, g);
            }
        }
        rhs[r] = row.rhs;
    }

    LinearSystem {
        matrix: builder.build(),
        rhs,
    }
}

/// 初值：上一步水头
pub fn initial_guess(grid: &StructuredGrid3D, state: &SubsurfaceState) -> Vec<f64> {
    grid.interior_cells().iter().map(|&c| state.hn[c]).collect()
}

/// 把解写回水头场
pub fn scatter_solution(grid: &StructuredGrid3D, state: &mut SubsurfaceState, x: &[f64]) {
    for (r, &c) in grid.interior_cells().iter().enumerate() {
        state.h[c] = x[r];
    }
}
