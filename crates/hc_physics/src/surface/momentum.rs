// crates/hc_physics/src/surface/momentum.rs

//! 动量显式项与半隐式拖曳
//!
//! 动力波模式：
//!
//! ```text
//! D = 1 / (1 + 0.5·dt·C_D·|u|·Az/V)
//! E = D·(u + dt·(扩散 - 对流) + 风应力)
//! ```
//!
//! 扩散波模式忽略惯性，E = 0，D 由水面坡度给出的流速反推。

use glam::DVec2;
use hc_config::SurfaceConfig;

use super::state::{Around, SurfaceState};
use crate::forcing::ForcingSnapshot;
use crate::grid::{Direction, StructuredGrid2D};

/// 对流项开始衰减的 CFL
const ADVECTION_DAMP_START: f64 = 0.5;
/// 对流项关闭的 CFL
const ADVECTION_CUTOFF: f64 = 0.7;

/// 计算全部内部面的 E 与 D
pub fn momentum_source(
    grid: &StructuredGrid2D,
    config: &SurfaceConfig,
    snapshot: &ForcingSnapshot,
    dt: f64,
    state: &mut SurfaceState,
) {
    for &c in grid.interior_cells() {
        let a = Around::of(grid, c);
        if config.diffusive_wave {
            (state.drag_x[c], state.drag_y[c]) = diffusive_drag(grid, config, state, c, &a);
            state.ex[c] = 0.0;
            state.ey[c] = 0.0;
            continue;
        }

        let (adv_x, adv_y) = if config.advection {
            advection(grid, state, c, &a)
        } else {
            (0.0, 0.0)
        };
        let (dif_x, dif_y) = diffusion(grid, config, state, c, &a);

        let speed_x = (state.u[c].powi(2) + state.vx[c].powi(2)).sqrt();
        let speed_y = (state.uy[c].powi(2) + state.v[c].powi(2)).sqrt();
        let fac_x = ratio(state.area_zx[c], state.vol_x[c]);
        let fac_y = ratio(state.area_zy[c], state.vol_y[c]);
        state.drag_x[c] = 1.0 / (0.5 * dt * state.cd_x[c] * speed_x * fac_x + 1.0);
        state.drag_y[c] = 1.0 / (0.5 * dt * state.cd_y[c] * speed_y * fac_y + 1.0);

        let mut e = DVec2::new(
            state.u[c] + dt * (dif_x - adv_x),
            state.v[c] + dt * (dif_y - adv_y),
        );
        if snapshot.has_wind() {
            e += wind_source(config, snapshot, state, c, dt);
        }
        state.ex[c] = e.x * state.drag_x[c];
        state.ey[c] = e.y * state.drag_y[c];
        // 闭边界面
        if grid.on_physical_side(c, Direction::XPlus) {
            state.ex[c] = 0.0;
        }
        if grid.on_physical_side(c, Direction::YPlus) {
            state.ey[c] = 0.0;
        }
    }
}

/// `num / den`，分母非正时为 0
#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// 一阶迎风对流，CFL 超过 0.5 线性衰减，超过 0.7 关闭
fn advection(grid: &StructuredGrid2D, s: &SurfaceState, c: usize, a: &Around) -> (f64, f64) {
    let (dx, dy) = (grid.dx, grid.dy);
    let upwind = |vel: f64, f: &[f64], m: usize, p: usize| {
        (vel + vel.abs()) * (f[c] - f[m]) + (vel - vel.abs()) * (f[p] - f[c])
    };
    let mut adv_x = 0.5 / dx * upwind(s.u[c], &s.u, a.xm, a.xp)
        + 0.5 / dy * upwind(s.vx[c], &s.u, a.ym, a.yp);
    let mut adv_y = 0.5 / dx * upwind(s.uy[c], &s.v, a.xm, a.xp)
        + 0.5 / dy * upwind(s.v[c], &s.v, a.ym, a.yp);

    let damp = |adv: f64, vel: f64, cfl: f64| {
        if vel == 0.0 || cfl > ADVECTION_CUTOFF {
            0.0
        } else if cfl > ADVECTION_DAMP_START {
            adv * (ADVECTION_CUTOFF - cfl) / (ADVECTION_CUTOFF - ADVECTION_DAMP_START)
        } else {
            adv
        }
    };
    adv_x = damp(adv_x, s.u[c], s.cfl_x[c]);
    adv_y = damp(adv_y, s.v[c], s.cfl_y[c]);
    (adv_x, adv_y)
}

/// 水平粘性扩散
fn diffusion(
    grid: &StructuredGrid2D,
    config: &SurfaceConfig,
    s: &SurfaceState,
    c: usize,
    a: &Around,
) -> (f64, f64) {
    let (dx, dy) = (grid.dx, grid.dy);
    let (nu_x, nu_y) = (config.viscosity_x, config.viscosity_y);
    let mut dif_x = 0.0;
    let mut dif_y = 0.0;
    if s.vol_x[c] > 0.0 && (nu_x != 0.0 || nu_y != 0.0) {
        dif_x = nu_x / s.vol_x[c] / dx
            * (s.area_x[c] * (s.u[a.xp] - s.u[c]) - s.area_x[c] * (s.u[c] - s.u[a.xm]))
            + nu_y / s.vol_x[c] / dy
                * (s.area_y[c] * (s.u[a.yp] - s.u[c]) - s.area_y[a.ym] * (s.u[c] - s.u[a.ym]));
    }
    if s.vol_y[c] > 0.0 && (nu_x != 0.0 || nu_y != 0.0) {
        dif_y = nu_x / s.vol_y[c] / dx
            * (s.area_x[c] * (s.v[a.xp] - s.v[c]) - s.area_x[a.xm] * (s.v[c] - s.v[a.xm]))
            + nu_y / s.vol_y[c] / dy
                * (s.area_y[c] * (s.v[a.yp] - s.v[c]) - s.area_y[c] * (s.v[c] - s.v[a.ym]));
    }
    (dif_x, dif_y)
}

/// 风应力增量（含薄层衰减）
fn wind_source(
    config: &SurfaceConfig,
    snapshot: &ForcingSnapshot,
    s: &SurfaceState,
    c: usize,
    dt: f64,
) -> DVec2 {
    let dir = DVec2::from_angle(snapshot.wind_direction.to_radians());
    let relative = snapshot.wind_speed - DVec2::new(s.u[c], s.v[c]).dot(dir);
    let tau = config.rho_air * config.wind_drag * relative * relative;
    let hd = config.drag_transition_depth;
    let thin = |h: f64| {
        if h < hd {
            tau * (config.wind_thin_layer * (h - hd) / hd).exp()
        } else {
            tau
        }
    };
    let push = |h: f64, component: f64| {
        if h > 0.0 {
            dt * thin(h) * component / (h * config.rho_water)
        } else {
            0.0
        }
    };
    DVec2::new(push(s.depth_x[c], dir.x), push(s.depth_y[c], dir.y))
}

/// 扩散波模式的 D：由坡度 `|∇η|` 反推的流速
pub(crate) fn diffusive_drag(
    grid: &StructuredGrid2D,
    config: &SurfaceConfig,
    s: &SurfaceState,
    c: usize,
    a: &Around,
) -> (f64, f64) {
    let min_depth = config.min_depth;
    let mut grad2 = 0.0;
    for (n, spacing) in [(a.xp, grid.dx), (a.yp, grid.dy)] {
        let rise = s.eta[n] - s.eta[c];
        let wet = if rise > 0.0 {
            s.depth[n] > min_depth
        } else {
            rise < 0.0 && s.depth[c] > min_depth
        };
        if wet {
            grad2 += (rise / spacing).powi(2);
        }
    }
    let grad = grad2.sqrt().max(min_depth / grid.dx);

    let one = |vol: f64, az: f64, cd: f64| {
        let fac = ratio(vol, az);
        if fac == 0.0 || cd == 0.0 {
            return 1.0;
        }
        let speed = (2.0 * config.gravity * grad * fac / cd).sqrt();
        if speed == 0.0 {
            1.0
        } else {
            fac / (0.5 * cd * speed)
        }
    };
    (
        one(s.vol_x[c], s.area_zx[c], s.cd_x[c]),
        one(s.vol_y[c], s.area_zy[c], s.cd_y[c]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridTopology, Subdomain};
    use crate::surface::wetting::{update_depth, update_drag, update_geometry};
    use hc_config::GridConfig;

    fn setup() -> (StructuredGrid2D, SurfaceState, SurfaceConfig) {
        let config = GridConfig::uniform(4, 4, 1, 1.0, 1.0, 1.0);
        let grid = StructuredGrid2D::new(&config, Subdomain::serial(&config)).unwrap();
        let state = SurfaceState::from_elevation(&grid, |_| 0.0, |_| 0.5);
        (grid, state, SurfaceConfig::default())
    }

    #[test]
    fn test_still_water_has_no_source() {
        let (grid, mut state, config) = setup();
        update_drag(&grid, &config, &mut state);
        momentum_source(&grid, &config, &ForcingSnapshot::default(), 1.0, &mut state);
        for &c in grid.interior_cells() {
            assert_eq!(state.ex[c], 0.0);
            assert_eq!(state.drag_x[c], 1.0);
        }
    }

    #[test]
    fn test_drag_factor_reduces_flow() {
        let (grid, mut state, config) = setup();
        update_drag(&grid, &config, &mut state);
        let c = grid.index(2, 2);
        state.u.fill(1.0);
        momentum_source(&grid, &config, &ForcingSnapshot::default(), 1.0, &mut state);
        assert!(state.drag_x[c] < 1.0);
        assert!(state.ex[c] > 0.0 && state.ex[c] < 1.0);
    }

    #[test]
    fn test_wind_pushes_downwind() {
        let (grid, mut state, config) = setup();
        let snapshot = ForcingSnapshot {
            wind_speed: 10.0,
            wind_direction: 0.0,
            ..ForcingSnapshot::default()
        };
        momentum_source(&grid, &config, &snapshot, 1.0, &mut state);
        let c = grid.index(2, 2);
        assert!(state.ex[c] > 0.0);
        assert!(state.ey[c].abs() < 1e-15);
    }

    #[test]
    fn test_diffusive_mode_zeroes_explicit_term() {
        let (grid, mut state, mut config) = setup();
        config.diffusive_wave = true;
        let c = grid.index(2, 2);
        state.eta[grid.index(3, 2)] = 0.6;
        update_depth(&grid, &mut state);
        update_geometry(&grid, &mut state);
        update_drag(&grid, &config, &mut state);
        momentum_source(&grid, &config, &ForcingSnapshot::default(), 1.0, &mut state);
        assert_eq!(state.ex[c], 0.0);
        assert!(state.drag_x[c] > 0.0 && state.drag_x[c] != 1.0);
    }
}
