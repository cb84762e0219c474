// crates/hc_physics/src/surface/wetting.rs

//! 干湿处理与几何量
//!
//! 无子网格数据时，体积与过流面积直接由水深给出：
//!
//! ```text
//! V   = h·dx·dy          Az = dx·dy（湿）/ 0（干）
//! Ax  = hx·dy            hx = max(η_i, η_i+1) - max(b_i, b_i+1)
//! Vx  = (V_i + V_i+1)/2  Azx = (Az_i + Az_i+1)/2
//! ```

use hc_config::SurfaceConfig;

use super::state::{Around, SurfaceState};
use crate::grid::{Direction, GridTopology, StructuredGrid2D};

/// 更新单元与面水深（含 ghost）
pub fn update_depth(grid: &StructuredGrid2D, state: &mut SurfaceState) {
    for c in 0..grid.n_cells() {
        state.depth[c] = (state.eta[c] - state.bottom[c]).max(0.0);
        state.depth_x[c] = face_depth(state, c, grid.neighbor(c, Direction::XPlus));
        state.depth_y[c] = face_depth(state, c, grid.neighbor(c, Direction::YPlus));
    }
}

#[inline]
fn face_depth(state: &SurfaceState, c: usize, n: Option<usize>) -> f64 {
    n.map_or(0.0, |n| {
        (state.eta[c].max(state.eta[n]) - state.bottom[c].max(state.bottom[n])).max(0.0)
    })
}

/// 更新体积、面积及面平均量
pub fn update_geometry(grid: &StructuredGrid2D, state: &mut SurfaceState) {
    let area = grid.area();
    let flat_x = grid.nx == 1 && grid.sub.npx == 1;
    let flat_y = grid.ny == 1 && grid.sub.npy == 1;
    for c in 0..grid.n_cells() {
        state.vol_prev[c] = state.vol[c];
        state.vol[c] = state.depth[c] * area;
        state.area_z[c] = if state.depth[c] > 0.0 { area } else { 0.0 };
        state.area_x[c] = if flat_x { 0.0 } else { state.depth_x[c] * grid.dy };
        state.area_y[c] = if flat_y { 0.0 } else { state.depth_y[c] * grid.dx };
    }
    for c in 0..grid.n_cells() {
        let (xp, yp) = (
            grid.neighbor(c, Direction::XPlus),
            grid.neighbor(c, Direction::YPlus),
        );
        (state.vol_x[c], state.area_zx[c]) = match xp {
            Some(n) => (
                0.5 * (state.vol[c] + state.vol[n]),
                0.5 * (state.area_z[c] + state.area_z[n]),
            ),
            None => (0.0, 0.0),
        };
        (state.vol_y[c], state.area_zy[c]) = match yp {
            Some(n) => (
                0.5 * (state.vol[c] + state.vol[n]),
                0.5 * (state.area_z[c] + state.area_z[n]),
            ),
            None => (0.0, 0.0),
        };
    }
    // 物理边界 -x/-y ghost 面取内部单元的值
    for (g, c) in grid.physical_ghosts(Direction::XMinus) {
        state.vol_x[g] = state.vol[c];
        state.area_zx[g] = state.area_z[c];
    }
    for (g, c) in grid.physical_ghosts(Direction::YMinus) {
        state.vol_y[g] = state.vol[c];
        state.area_zy[g] = state.area_z[c];
    }
}

/// 更新拖曳系数 `C_D = g·n² / h^p`，浅于过渡水深时 p = 2/3，否则 1/3
///
/// 干单元保留原值。
pub fn update_drag(grid: &StructuredGrid2D, config: &SurfaceConfig, state: &mut SurfaceState) {
    let coef = config.gravity * config.manning * config.manning;
    let area = grid.area();
    for &c in grid.interior_cells() {
        if state.vol[c] <= 0.0 {
            continue;
        }
        let h = state.vol[c] / area;
        let expo = if h < config.drag_transition_depth {
            2.0 / 3.0
        } else {
            1.0 / 3.0
        };
        let cd = coef / h.powf(expo);
        state.cd_x[c] = cd;
        state.cd_y[c] = cd;
    }
}

/// CFL 限制器
///
/// 1. 上一步干、本步变湿且四邻均干的单元强制回到底面，并标记为 CFL 激活；
/// 2. 小于 `min_depth` 的水深清零。
///
/// 去掉的水量计入损失，返回被强制干化的单元数。
pub fn cfl_limiter(grid: &StructuredGrid2D, min_depth: f64, state: &mut SurfaceState) -> usize {
    let area = grid.area();
    let mut forced = 0;
    for &c in grid.interior_cells() {
        let diff = state.eta[c] - state.bottom[c];
        if state.depth[c] > 0.0 || diff <= 0.0 {
            continue;
        }
        let a = Around::of(grid, c);
        let isolated = [a.xp, a.xm, a.yp, a.ym]
            .iter()
            .all(|&n| state.depth[n] <= 0.0);
        if isolated {
            state.loss += diff * area;
            state.eta[c] = state.bottom[c];
            state.cfl_active[c] = true;
            forced += 1;
        }
    }
    for &c in grid.interior_cells() {
        let diff = state.eta[c] - state.bottom[c];
        if diff > 0.0 && diff < min_depth {
            state.loss += diff * area;
            state.eta[c] = state.bottom[c];
        }
    }
    forced
}

/// 降雨与蒸发
///
/// 降雨先累积，超过 `min_depth` 后一次性加到非物理边缘单元上并清零；
/// 蒸发只在无雨时作用，水深不足时截断到底面。
pub fn evaprain(
    grid: &StructuredGrid2D,
    min_depth: f64,
    rain: f64,
    evaporation: f64,
    dt: f64,
    state: &mut SurfaceState,
) {
    state.rain_sum += rain * dt;
    if state.rain_sum > min_depth {
        let add = std::mem::take(&mut state.rain_sum);
        for &c in grid.interior_cells() {
            if !grid.is_physical_edge(c) {
                state.eta[c] += add;
            }
        }
    }
    if rain != 0.0 {
        return;
    }
    let area = grid.area();
    for &c in grid.interior_cells() {
        state.eta[c] -= evaporation * dt;
        let diff = state.eta[c] - state.bottom[c];
        if diff < min_depth {
            // 不足一层的薄水膜直接移除
            if diff > 0.0 {
                state.loss += diff * area;
            }
            state.eta[c] = state.bottom[c];
        }
    }
}

/// 跌水位置：低于面底高程的单元旁边有高出 `waterfall_depth` 的水体
///
/// 返回被标记的面数。
pub fn waterfall_location(grid: &StructuredGrid2D, wtfh: f64, state: &mut SurfaceState) -> usize {
    state.waterfall_x.fill(0);
    state.waterfall_y.fill(0);
    let bx = |s: &SurfaceState, c: usize, n: usize| s.bottom[c].max(s.bottom[n]);
    for &c in grid.interior_cells() {
        let a = Around::of(grid, c);
        let b = bx(state, c, a.xp);
        if state.eta[c] < b && state.eta[a.xp] - b > wtfh {
            state.waterfall_x[c] = -1;
        }
        let b = bx(state, c, a.yp);
        if state.eta[c] < b && state.eta[a.yp] - b > wtfh {
            state.waterfall_y[c] = -1;
        }
    }
    for &c in grid.interior_cells() {
        let a = Around::of(grid, c);
        let b = bx(state, a.xm, c);
        if state.eta[c] < b && state.eta[a.xm] - b > wtfh {
            state.waterfall_x[c] = 1;
        }
        let b = bx(state, a.ym, c);
        if state.eta[c] < b && state.eta[a.ym] - b > wtfh {
            state.waterfall_y[c] = 1;
        }
    }
    grid.interior_cells()
        .iter()
        .map(|&c| (state.waterfall_x[c] != 0) as usize + (state.waterfall_y[c] != 0) as usize)
        .sum()
}
