// crates/hc_physics/src/surface/velocity.rs

//! 面流速更新
//!
//! 动力波：`u = D·(E - g·dt·(Ax/Vx)·(η_i+1 - η_i))`
//! 扩散波：`u = -g·(Ax/Vx)·(η_i+1 - η_i)·D`
//!
//! 随后依次施加限制：过流面积过小置零，干单元不向外出流，
//! CFL 限制器干化的单元四面置零。

use hc_config::SurfaceConfig;

use super::momentum::diffusive_drag;
use super::state::{Around, SurfaceState};
use crate::forcing::{ForcingLayout, ForcingSnapshot};
use crate::grid::{Direction, GridTopology, StructuredGrid2D};

/// 更新内部面流速、流量与 CFL 数
pub fn update_velocity(
    grid: &StructuredGrid2D,
    config: &SurfaceConfig,
    dt: f64,
    state: &mut SurfaceState,
) {
    state.un.copy_from_slice(&state.u);
    state.vn.copy_from_slice(&state.v);
    let g = config.gravity;
    let ratio = |a: f64, v: f64| if v > 0.0 { a / v } else { 0.0 };

    for &c in grid.interior_cells() {
        let a = Around::of(grid, c);
        let eff_x = ratio(state.area_x[c], state.vol_x[c]);
        let eff_y = ratio(state.area_y[c], state.vol_y[c]);
        let grad_x = state.eta[a.xp] - state.eta[c];
        let grad_y = state.eta[a.yp] - state.eta[c];
        if config.diffusive_wave {
            (state.drag_x[c], state.drag_y[c]) = diffusive_drag(grid, config, state, c, &a);
            state.u[c] = -g * eff_x * grad_x * state.drag_x[c];
            state.v[c] = -g * eff_y * grad_y * state.drag_y[c];
        } else {
            state.u[c] = (state.ex[c] - g * dt * eff_x * grad_x) * state.drag_x[c];
            state.v[c] = (state.ey[c] - g * dt * eff_y * grad_y) * state.drag_y[c];
        }
    }

    let wtfh = config.waterfall_depth;
    for &c in grid.interior_cells() {
        let a = Around::of(grid, c);
        if state.area_x[c] < wtfh * grid.dy {
            state.u[c] = 0.0;
        }
        if state.area_y[c] < wtfh * grid.dx {
            state.v[c] = 0.0;
        }
        if state.depth[c] < wtfh {
            if state.u[c] > 0.0 {
                state.u[c] = 0.0;
            }
            if state.u[a.xm] < 0.0 {
                state.u[a.xm] = 0.0;
            }
            if state.v[c] > 0.0 {
                state.v[c] = 0.0;
            }
            if state.v[a.ym] < 0.0 {
                state.v[a.ym] = 0.0;
            }
        }
        if std::mem::take(&mut state.cfl_active[c]) {
            state.u[c] = 0.0;
            state.u[a.xm] = 0.0;
            state.v[c] = 0.0;
            state.v[a.ym] = 0.0;
        }
    }

    update_flows(grid, dt, state);
}

/// 由流速计算面流量与 CFL 数（含 ghost 面）
pub fn update_flows(grid: &StructuredGrid2D, dt: f64, state: &mut SurfaceState) {
    for c in 0..grid.n_cells() {
        state.flow_x[c] = state.u[c] * state.area_x[c];
        state.flow_y[c] = state.v[c] * state.area_y[c];
        state.cfl_x[c] = (state.u[c] * dt / grid.dx).abs();
        state.cfl_y[c] = (state.v[c] * dt / grid.dy).abs();
    }
}

/// 超过 1 的 CFL 逐单元告警，返回内部最大 CFL
pub fn check_cfl(grid: &StructuredGrid2D, state: &SurfaceState) -> f64 {
    let mut max_cfl = 0.0_f64;
    for &c in grid.interior_cells() {
        let (cx, cy) = (state.cfl_x[c], state.cfl_y[c]);
        if cx > 1.0 || cy > 1.0 {
            let (pi, pj) = grid.coords(c);
            log::warn!(
                "地表 CFL = {:.3}, {:.3}（子域 {} 单元 ({}, {})）",
                cx,
                cy,
                grid.sub.rank,
                pi,
                pj
            );
        }
        max_cfl = max_cfl.max(cx).max(cy);
    }
    max_cfl
}

/// 把面流速插值到正交面：`uy` 位于 y 面，`vx` 位于 x 面
pub fn interp_velocity(grid: &StructuredGrid2D, state: &mut SurfaceState) {
    for &c in grid.interior_cells() {
        let a = Around::of(grid, c);
        let yp_xm = grid.neighbor(a.yp, Direction::XMinus).unwrap_or(a.yp);
        let xp_ym = grid.neighbor(a.xp, Direction::YMinus).unwrap_or(a.xp);
        state.uy[c] = 0.25 * (state.u[c] + state.u[a.xm] + state.u[a.yp] + state.u[yp_xm]);
        state.vx[c] = 0.25 * (state.v[c] + state.v[a.ym] + state.v[a.xp] + state.v[xp_ym]);
    }
}

/// 由面流量推算的体积（诊断），返回与几何体积的最大偏差 [m³]
///
/// `V_flux = V_prev + dt·(Fx⁻ - Fx⁺ + Fy⁻ - Fy⁺) + 入流`，
/// 不含降雨、蒸发、渗流与限制器的作用。
pub fn volume_by_flux(
    grid: &StructuredGrid2D,
    layout: &ForcingLayout,
    snapshot: &ForcingSnapshot,
    dt: f64,
    state: &mut SurfaceState,
) -> f64 {
    let mut worst = 0.0_f64;
    for &c in grid.interior_cells() {
        let a = Around::of(grid, c);
        let net = state.flow_x[a.xm] - state.flow_x[c] + state.flow_y[a.ym] - state.flow_y[c];
        state.vol_flux[c] = state.vol_prev[c] + dt * net + layout.inflow_volume(snapshot, c, dt);
        worst = worst.max((state.vol_flux[c] - state.vol[c]).abs());
    }
    worst
}
