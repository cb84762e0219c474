// crates/hc_physics/src/subsurface/coefficients.rs

//! 面导水率
//!
//! 面值取两侧单元 K(θ) 的算术平均，乘以变密度修正 rρ·rvisc；
//! 任一侧非激活则为零。每步在组装前计算一次，通量与再分配沿用同一组值。

use hc_config::FaceCode;

use super::params::{SubsurfaceParams, TopBoundary};
use super::state::SubsurfaceState;
use crate::coupling::CouplingBuffer;
use crate::grid::{CellId, Direction, GridTopology, StructuredGrid3D};

/// 单元在 `dir` 方向上的导水率 K(θ)·rρ·rvisc
#[inline]
fn cell_k(params: &SubsurfaceParams, state: &SubsurfaceState, cell: CellId, dir: Direction) -> f64 {
    params.vg.conductivity(params.ks(dir), state.wc[cell]) * state.density.k_factor(cell)
}

/// 两单元之间的面值
#[inline]
fn face_k(
    grid: &StructuredGrid3D,
    params: &SubsurfaceParams,
    state: &SubsurfaceState,
    a: CellId,
    b: CellId,
    dir: Direction,
) -> f64 {
    if !grid.is_active(a) || !grid.is_active(b) {
        return 0.0;
    }
    0.5 * (cell_k(params, state, a, dir) + cell_k(params, state, b, dir))
}

/// 调和平均
#[inline]
fn harmonic(a: f64, b: f64) -> f64 {
    if a + b > 0.0 {
        2.0 * a * b / (a + b)
    } else {
        0.0
    }
}

/// 计算全部面导水率（kx / ky / kz）
pub fn face_conductivity(
    grid: &StructuredGrid3D,
    params: &SubsurfaceParams,
    state: &mut SubsurfaceState,
    coupling: &CouplingBuffer,
) {
    state.kx.fill(0.0);
    state.ky.fill(0.0);
    state.kz.fill(0.0);

    for &c in grid.interior_cells() {
        let (pi, pj, _) = grid.coords(c);
        for (dir, minus) in [(Direction::XPlus, Direction::XMinus), (Direction::YPlus, Direction::YMinus)] {
            let Some(n) = grid.neighbor(c, dir) else {
                continue;
            };
            let k = face_k(grid, params, state, c, n, dir);
            // 子域左/下边界的 - 面由本子域负责
            let first = if dir == Direction::XPlus { pi == 1 } else { pj == 1 };
            let km = match (first, grid.neighbor(c, minus)) {
                (true, Some(m)) => Some((m, face_k(grid, params, state, m, c, dir))),
                _ => None,
            };
            let field = if dir == Direction::XPlus {
                &mut state.kx
            } else {
                &mut state.ky
            };
            field[c] = k;
            if let Some((m, k)) = km {
                field[m] = k;
            }
        }

        if !grid.is_active(c) {
            continue;
        }
        state.kz[c] = match grid.neighbor(c, Direction::ZPlus) {
            Some(_) if grid.is_bottom(c) => cell_k(params, state, c, Direction::ZPlus),
            Some(n) => face_k(grid, params, state, c, n, Direction::ZPlus),
            None => 0.0,
        };
    }

    // 封闭的物理侧面
    for &c in grid.interior_cells() {
        for side in grid.physical_sides(c) {
            if params.side_code(side) != FaceCode::NoFlow {
                continue;
            }
            match side {
                Direction::XPlus => state.kx[c] = 0.0,
                Direction::YPlus => state.ky[c] = 0.0,
                Direction::XMinus => {
                    if let Some(m) = grid.neighbor(c, side) {
                        state.kx[m] = 0.0;
                    }
                }
                Direction::YMinus => {
                    if let Some(m) = grid.neighbor(c, side) {
                        state.ky[m] = 0.0;
                    }
                }
                Direction::ZPlus | Direction::ZMinus => {}
            }
        }
        if grid.is_bottom(c) && params.bc.bottom == FaceCode::NoFlow {
            state.kz[c] = 0.0;
        }
    }

    // 柱顶面（存放在柱顶上方单元）
    for col in grid.interior_columns() {
        let Some(top) = grid.top_cell(col) else {
            continue;
        };
        let Some(above) = grid.neighbor(top, Direction::ZMinus) else {
            continue;
        };
        let kp = cell_k(params, state, top, Direction::ZMinus);
        let ksurf = params.soil.ks_surface * state.density.k_factor(top);
        state.kz[above] = match params.top_boundary(coupling, col) {
            TopBoundary::Ponded { .. } => harmonic(ksurf, kp),
            TopBoundary::Dry(FaceCode::NoFlow) | TopBoundary::Uncoupled(FaceCode::NoFlow) => 0.0,
            TopBoundary::Uncoupled(FaceCode::FixedHead) => ksurf,
            _ => kp,
        };
    }

    // 非饱和区只保留垂向流动
    if !params.full_3d {
        for &c in grid.interior_cells() {
            if !grid.is_active(c) || state.wc[c] >= params.vg.wcs {
                continue;
            }
            state.kx[c] = 0.0;
            state.ky[c] = 0.0;
            if let Some(m) = grid.neighbor(c, Direction::XMinus) {
                state.kx[m] = 0.0;
            }
            if let Some(m) = grid.neighbor(c, Direction::YMinus) {
                state.ky[m] = 0.0;
            }
        }
    }
}

/// 存储项系数 (C(hⁿ) + Ss·θⁿ/θs)·rρ
#[inline]
pub fn storage_coefficient(params: &SubsurfaceParams, state: &SubsurfaceState, cell: CellId) -> f64 {
    let vg = &params.vg;
    (vg.capacity(state.hn[cell]) + params.soil.specific_storage * state.wcn[cell] / vg.wcs)
        * state.density.r_rho[cell]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Subdomain;
    use hc_config::{BoundaryConfig, GridConfig, ModelConfig};

    fn setup(full_3d: bool) -> (StructuredGrid3D, SubsurfaceParams, SubsurfaceState) {
        let mut config = ModelConfig {
            grid: GridConfig::uniform(3, 2, 3, 1.0, 1.0, 1.0),
            boundary: BoundaryConfig::closed(),
            ..ModelConfig::default()
        };
        config.physics.full_3d = full_3d;
        config.physics.shallow_water = false;
        let grid = StructuredGrid3D::new(&config.grid, Subdomain::serial(&config.grid)).unwrap();
        let params = SubsurfaceParams::from_config(&config);
        let state = SubsurfaceState::from_head(&grid, &params.vg, |_| -0.5);
        (grid, params, state)
    }

    #[test]
    fn test_closed_boundaries_zero_faces() {
        let (grid, params, mut state) = setup(true);
        let buf = CouplingBuffer::new(grid.px * grid.py);
        face_conductivity(&grid, &params, &mut state, &buf);

        let k = params.vg.conductivity(params.soil.ks_x, state.wc[grid.index(1, 1, 1)]);
        assert!((state.kx[grid.index(1, 1, 1)] - k).abs() < 1e-20);
        assert_eq!(state.kx[grid.index(3, 1, 1)], 0.0);
        assert_eq!(state.kx[grid.index(0, 1, 1)], 0.0);
        assert_eq!(state.ky[grid.index(1, 0, 2)], 0.0);
        assert_eq!(state.kz[grid.index(1, 1, 3)], 0.0);
        assert_eq!(state.kz[grid.index(1, 1, 0)], 0.0);
    }

    #[test]
    fn test_unsaturated_lateral_suppressed() {
        let (grid, params, mut state) = setup(false);
        let buf = CouplingBuffer::new(grid.px * grid.py);
        face_conductivity(&grid, &params, &mut state, &buf);
        assert!(state.kx.iter().all(|&k| k == 0.0));
        assert!(state.kz[grid.index(2, 1, 1)] > 0.0);
    }

    #[test]
    fn test_inactive_neighbour_blocks_face() {
        let config = GridConfig::uniform(2, 1, 2, 1.0, 1.0, 1.0);
        let grid = StructuredGrid3D::with_mask(&config, Subdomain::serial(&config), |gi, _, _| gi == 0)
            .unwrap();
        let mut model = ModelConfig::default();
        model.physics.full_3d = true;
        model.physics.shallow_water = false;
        let params = SubsurfaceParams::from_config(&model);
        let mut state = SubsurfaceState::from_head(&grid, &params.vg, |_| 0.0);
        face_conductivity(&grid, &params, &mut state, &CouplingBuffer::new(grid.px * grid.py));
        assert_eq!(state.kx[grid.index(1, 1, 1)], 0.0);
        assert_eq!(state.kz[grid.index(2, 1, 1)], 0.0);
    }

    #[test]
    fn test_ponded_top_uses_harmonic_blend() {
        let mut config = ModelConfig {
            grid: GridConfig::uniform(1, 1, 2, 1.0, 1.0, 1.0),
            ..ModelConfig::default()
        };
        config.soil.ks_surface = 1e-6;
        let grid = StructuredGrid3D::new(&config.grid, Subdomain::serial(&config.grid)).unwrap();
        let params = SubsurfaceParams::from_config(&config);
        let mut state = SubsurfaceState::from_head(&grid, &params.vg, |_| 0.0);
        let mut buf = CouplingBuffer::new(grid.px * grid.py);
        let col = grid.column(grid.index(1, 1, 1));
        buf.depth[col] = 0.1;
        face_conductivity(&grid, &params, &mut state, &buf);
        let expected = 2.0 * 1e-6 * params.soil.ks_z / (1e-6 + params.soil.ks_z);
        assert!((state.kz[grid.index(1, 1, 0)] - expected).abs() < 1e-20);
    }
}
