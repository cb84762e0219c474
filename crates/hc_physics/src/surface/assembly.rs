// crates/hc_physics/src/surface/assembly.rs

//! 自由面高程的半隐式组装
//!
//! ```text
//! S±x = c·Ax²·D/Vx        c = g·dt²（扩散波为 g·dt）
//! Ct  = Az + ΣS
//! b   = η·Az - dt·Σ±(A·E) + Q·dt/n
//! ```
//!
//! 行分三类：
//!
//! - 自由行：按上式组装
//! - 定值行：潮位单元、孤立干单元（无水且四面流速为零）与退化行，
//!   写单位行 `η = 给定值`
//! - 邻居为定值行或子域 ghost 时，耦合项以该处 η 移到右端项，矩阵保持对称
//!
//! 物理边界面不参与组装（闭边界）。

use hc_config::SurfaceConfig;

use super::state::{Around, SurfaceState};
use crate::engine::LinearSystem;
use crate::forcing::{ForcingLayout, ForcingSnapshot};
use crate::grid::{CellId, Direction, GridTopology, StructuredGrid2D};
use crate::numerics::linear_algebra::CsrBuilder;

/// 对角项下限
const DIAG_FLOOR: f64 = 1e-300;

/// 行类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// 正常组装
    Free,
    /// 给定值
    Fixed,
}

/// 单行系数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceRow {
    /// [+x, -x, +y, -y] 耦合系数（正值，矩阵中取负）
    pub s: [f64; 4],
    /// 对角项
    pub diagonal: f64,
    /// 右端项
    pub rhs: f64,
}

const SIDES: [Direction; 4] = [
    Direction::XPlus,
    Direction::XMinus,
    Direction::YPlus,
    Direction::YMinus,
];

/// 面耦合系数 `c·A²·D/V`
#[inline]
fn face_coefficient(coef: f64, area: f64, drag: f64, vol: f64) -> f64 {
    if vol > 0.0 {
        coef * area * area * drag / vol
    } else {
        0.0
    }
}

/// 单元的模板系数（物理边界面为 0）
pub fn surface_row(
    grid: &StructuredGrid2D,
    config: &SurfaceConfig,
    state: &SurfaceState,
    layout: &ForcingLayout,
    snapshot: &ForcingSnapshot,
    cell: CellId,
    dt: f64,
) -> SurfaceRow {
    let coef = if config.diffusive_wave {
        config.gravity * dt
    } else {
        config.gravity * dt * dt
    };
    let a = Around::of(grid, cell);
    let s = state;
    let mut row = SurfaceRow {
        s: [
            face_coefficient(coef, s.area_x[cell], s.drag_x[cell], s.vol_x[cell]),
            face_coefficient(coef, s.area_x[a.xm], s.drag_x[a.xm], s.vol_x[a.xm]),
            face_coefficient(coef, s.area_y[cell], s.drag_y[cell], s.vol_y[cell]),
            face_coefficient(coef, s.area_y[a.ym], s.drag_y[a.ym], s.vol_y[a.ym]),
        ],
        ..SurfaceRow::default()
    };
    for (k, side) in SIDES.into_iter().enumerate() {
        if grid.on_physical_side(cell, side) {
            row.s[k] = 0.0;
        }
    }

    if s.depth[cell] > 0.0 {
        row.diagonal = s.area_z[cell];
        row.rhs = s.eta[cell] * s.area_z[cell]
            - dt * (s.area_x[cell] * s.ex[cell] - s.area_x[a.xm] * s.ex[a.xm]
                + s.area_y[cell] * s.ey[cell]
                - s.area_y[a.ym] * s.ey[a.ym]);
    } else {
        // 干单元以整个平面面积作储量
        row.diagonal = grid.area();
        row.rhs = s.eta[cell] * grid.area();
    }
    row.diagonal += row.s.iter().sum::<f64>();
    row.rhs += layout.inflow_volume(snapshot, cell, dt);
    row
}

/// 行分类
pub fn classify_rows(
    grid: &StructuredGrid2D,
    state: &SurfaceState,
    layout: &ForcingLayout,
    snapshot: &ForcingSnapshot,
) -> Vec<RowKind> {
    let mut kinds = vec![RowKind::Free; grid.n_cells()];
    for &c in grid.interior_cells() {
        if layout.is_tide_cell(c) {
            kinds[c] = RowKind::Fixed;
            continue;
        }
        let a = Around::of(grid, c);
        let still = state.u[c] == 0.0
            && state.u[a.xm] == 0.0
            && state.v[c] == 0.0
            && state.v[a.ym] == 0.0;
        let fed = layout.inflow_volume(snapshot, c, 1.0) != 0.0;
        if state.depth[c] == 0.0 && still && !fed {
            kinds[c] = RowKind::Fixed;
        }
    }
    kinds
}

/// 组装线性系统
pub fn assemble(
    grid: &StructuredGrid2D,
    config: &SurfaceConfig,
    state: &SurfaceState,
    layout: &ForcingLayout,
    snapshot: &ForcingSnapshot,
    dt: f64,
) -> LinearSystem {
    let n = grid.n_rows();
    let mut builder = CsrBuilder::new_square(n);
    let mut rhs = vec![0.0; n];
    let mut kinds = classify_rows(grid, state, layout, snapshot);
    let rows: Vec<SurfaceRow> = grid
        .interior_cells()
        .iter()
        .map(|&c| surface_row(grid, config, state, layout, snapshot, c, dt))
        .collect();
    for (r, &c) in grid.interior_cells().iter().enumerate() {
        if rows[r].diagonal.abs() < DIAG_FLOOR {
            kinds[c] = RowKind::Fixed;
        }
    }

    for (r, &c) in grid.interior_cells().iter().enumerate() {
        if kinds[c] == RowKind::Fixed {
            builder.set_identity_row(r);
            rhs[r] = state.eta[c];
            continue;
        }
        let row = &rows[r];
        builder.set(r, r, row.diagonal);
        rhs[r] = row.rhs;
        for (k, side) in SIDES.into_iter().enumerate() {
            let s = row.s[k];
            if s == 0.0 {
                continue;
            }
            let Some(nb) = grid.neighbor(c, side) else {
                continue;
            };
            match grid.row_of(nb) {
                Some(col) if kinds[nb] == RowKind::Free => builder.set(r, col, -s),
                _ => rhs[r] += s * state.eta[nb],
            }
        }
    }

    LinearSystem {
        matrix: builder.build(),
        rhs,
    }
}

/// 初值：上一步水位
pub fn initial_guess(grid: &StructuredGrid2D, state: &SurfaceState) -> Vec<f64> {
    grid.interior_cells().iter().map(|&c| state.eta[c]).collect()
}

/// 把解写回水位
pub fn scatter_solution(grid: &StructuredGrid2D, state: &mut SurfaceState, x: &[f64]) {
    for (r, &c) in grid.interior_cells().iter().enumerate() {
        state.eta[c] = x[r];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcing::{ForcingSet, InflowSource, TideBoundary, TimeSeries};
    use crate::grid::Subdomain;
    use crate::surface::wetting::update_drag;
    use hc_config::GridConfig;

    fn grid(nx: usize, ny: usize) -> StructuredGrid2D {
        let config = GridConfig::uniform(nx, ny, 1, 1.0, 1.0, 1.0);
        StructuredGrid2D::new(&config, Subdomain::serial(&config)).unwrap()
    }

    fn sloped(g: &StructuredGrid2D) -> SurfaceState {
        let mut state = SurfaceState::from_elevation(
            g,
            |c| 0.01 * g.coords(c).0 as f64,
            |c| 0.3 + 0.02 * g.coords(c).1 as f64,
        );
        update_drag(g, &SurfaceConfig::default(), &mut state);
        state
    }

    #[test]
    fn test_matrix_is_symmetric_and_dominant() {
        let g = grid(4, 3);
        let state = sloped(&g);
        let layout = ForcingLayout::default();
        let snap = ForcingSnapshot::default();
        let sys = assemble(&g, &SurfaceConfig::default(), &state, &layout, &snap, 5.0);
        assert!(sys.matrix.is_symmetric(1e-12));
        for r in 0..sys.n_rows() {
            let diag = sys.matrix.get(r, r);
            let off: f64 = sys
                .matrix
                .row(r)
                .iter()
                .filter(|&(col, _)| col != r)
                .map(|(_, v)| v.abs())
                .sum();
            assert!(diag > off, "row {} 不是严格对角占优", r);
        }
    }

    #[test]
    fn test_still_water_is_fixed_point() {
        let g = grid(3, 3);
        let state = SurfaceState::from_elevation(&g, |_| 0.0, |_| 0.4);
        let sys = assemble(
            &g,
            &SurfaceConfig::default(),
            &state,
            &ForcingLayout::default(),
            &ForcingSnapshot::default(),
            10.0,
        );
        let x = vec![0.4; sys.n_rows()];
        let mut y = vec![0.0; sys.n_rows()];
        sys.matrix.mul_vec(&x, &mut y);
        for r in 0..sys.n_rows() {
            assert!((y[r] - sys.rhs[r]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tide_and_isolated_dry_rows_are_fixed() {
        let g = grid(3, 1);
        let forcing = ForcingSet {
            tides: vec![TideBoundary {
                cells: vec![[0, 0]],
                elevation: TimeSeries::constant(0.5),
            }],
            ..ForcingSet::default()
        };
        let layout = forcing.localize(&g);
        let snap = forcing.update(0.0);
        let mut state = SurfaceState::from_elevation(
            &g,
            |c| if g.coords(c).0 == 3 { 1.0 } else { 0.0 },
            |_| 0.5,
        );
        state.eta[g.index(1, 1)] = 0.5;
        let kinds = classify_rows(&g, &state, &layout, &snap);
        assert_eq!(kinds[g.index(1, 1)], RowKind::Fixed);
        assert_eq!(kinds[g.index(2, 1)], RowKind::Free);
        assert_eq!(kinds[g.index(3, 1)], RowKind::Fixed);

        let sys = assemble(&g, &SurfaceConfig::default(), &state, &layout, &snap, 1.0);
        assert_eq!(sys.matrix.row(0).nnz(), 1);
        assert_eq!(sys.rhs[0], 0.5);
        assert!(sys.matrix.is_symmetric(1e-14));
    }

    #[test]
    fn test_inflow_adds_volume_to_rhs() {
        let g = grid(2, 1);
        let forcing = ForcingSet {
            inflows: vec![InflowSource {
                cells: vec![[0, 0], [1, 0]],
                discharge: TimeSeries::constant(2.0),
            }],
            ..ForcingSet::default()
        };
        let layout = forcing.localize(&g);
        let snap = forcing.update(0.0);
        let state = SurfaceState::from_elevation(&g, |_| 0.0, |_| 0.0);
        // 干单元有入流时不被固定
        let kinds = classify_rows(&g, &state, &layout, &snap);
        assert_eq!(kinds[g.index(1, 1)], RowKind::Free);
        let sys = assemble(&g, &SurfaceConfig::default(), &state, &layout, &snap, 3.0);
        assert!((sys.rhs[0] - 3.0).abs() < 1e-12);
    }
}
