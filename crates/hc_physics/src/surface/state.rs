// crates/hc_physics/src/surface/state.rs

//! 地表水状态（交错网格）
//!
//! 水位、水深、体积在单元中心；`u[c]` 位于 c 与 +x 邻居之间的面，
//! `v[c]` 位于 c 与 +y 邻居之间的面。面上的量（水深、面积、体积、拖曳）
//! 同样按 + 面存放。

use hc_foundation::KahanSum;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::grid::{CellId, Direction, GridTopology, StructuredGrid2D};

/// 单元四邻居（越出填充数组时回落到自身）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Around {
    pub xp: CellId,
    pub xm: CellId,
    pub yp: CellId,
    pub ym: CellId,
}

impl Around {
    #[inline]
    pub(crate) fn of(grid: &StructuredGrid2D, c: CellId) -> Self {
        let n = |dir| grid.neighbor(c, dir).unwrap_or(c);
        Self {
            xp: n(Direction::XPlus),
            xm: n(Direction::XMinus),
            yp: n(Direction::YPlus),
            ym: n(Direction::YMinus),
        }
    }
}

/// 地表水状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurfaceState {
    /// 自由面高程 [m]
    pub eta: Vec<f64>,
    /// 上一步自由面高程
    pub etan: Vec<f64>,
    /// 底高程 [m]
    pub bottom: Vec<f64>,
    /// 单元水深 [m]
    pub depth: Vec<f64>,
    /// x 面水深
    pub depth_x: Vec<f64>,
    /// y 面水深
    pub depth_y: Vec<f64>,
    /// x 面流速 [m/s]
    pub u: Vec<f64>,
    /// y 面流速
    pub v: Vec<f64>,
    /// 上一步 x 面流速
    pub un: Vec<f64>,
    /// 上一步 y 面流速
    pub vn: Vec<f64>,
    /// 插值到 y 面的 u
    pub uy: Vec<f64>,
    /// 插值到 x 面的 v
    pub vx: Vec<f64>,
    /// x 动量显式项
    pub ex: Vec<f64>,
    /// y 动量显式项
    pub ey: Vec<f64>,
    /// x 面半隐式拖曳因子
    pub drag_x: Vec<f64>,
    /// y 面半隐式拖曳因子
    pub drag_y: Vec<f64>,
    /// x 向拖曳系数
    pub cd_x: Vec<f64>,
    /// y 向拖曳系数
    pub cd_y: Vec<f64>,
    /// 单元水体积 [m³]
    pub vol: Vec<f64>,
    /// 上一次几何更新前的体积
    pub vol_prev: Vec<f64>,
    /// x 面体积（两侧平均）
    pub vol_x: Vec<f64>,
    /// y 面体积
    pub vol_y: Vec<f64>,
    /// x 面过流面积 [m²]
    pub area_x: Vec<f64>,
    /// y 面过流面积
    pub area_y: Vec<f64>,
    /// 单元湿润平面面积 [m²]
    pub area_z: Vec<f64>,
    /// x 面平面面积（两侧平均）
    pub area_zx: Vec<f64>,
    /// y 面平面面积
    pub area_zy: Vec<f64>,
    /// x 面流量 [m³/s]
    pub flow_x: Vec<f64>,
    /// y 面流量
    pub flow_y: Vec<f64>,
    /// x 面 CFL 数
    pub cfl_x: Vec<f64>,
    /// y 面 CFL 数
    pub cfl_y: Vec<f64>,
    /// 被 CFL 限制器强制干化的单元
    pub cfl_active: Vec<bool>,
    /// x 向跌水标记（-1 流向 +x 侧低处，1 来自 -x 侧高处）
    pub waterfall_x: Vec<i8>,
    /// y 向跌水标记
    pub waterfall_y: Vec<i8>,
    /// 由面流量推算的体积 [m³]
    pub vol_flux: Vec<f64>,
    /// 尚未施加的累积降雨 [m]
    pub rain_sum: f64,
    /// 累积损失体积 [m³]（正为移出系统）
    pub loss: f64,
}

impl SurfaceState {
    /// 全零状态
    pub fn new(grid: &StructuredGrid2D) -> Self {
        let n = grid.n_cells();
        let z = || vec![0.0; n];
        Self {
            eta: z(),
            etan: z(),
            bottom: z(),
            depth: z(),
            depth_x: z(),
            depth_y: z(),
            u: z(),
            v: z(),
            un: z(),
            vn: z(),
            uy: z(),
            vx: z(),
            ex: z(),
            ey: z(),
            drag_x: vec![1.0; n],
            drag_y: vec![1.0; n],
            cd_x: z(),
            cd_y: z(),
            vol: z(),
            vol_prev: z(),
            vol_x: z(),
            vol_y: z(),
            area_x: z(),
            area_y: z(),
            area_z: z(),
            area_zx: z(),
            area_zy: z(),
            flow_x: z(),
            flow_y: z(),
            cfl_x: z(),
            cfl_y: z(),
            cfl_active: vec![false; n],
            waterfall_x: vec![0; n],
            waterfall_y: vec![0; n],
            vol_flux: z(),
            rain_sum: 0.0,
            loss: 0.0,
        }
    }

    /// 由底高程与初始水位创建（水位低于底面时取底面）
    ///
    /// 物理边界 ghost 的底高程复制相邻内部单元。
    pub fn from_elevation(
        grid: &StructuredGrid2D,
        bottom: impl Fn(CellId) -> f64,
        eta: impl Fn(CellId) -> f64,
    ) -> Self {
        let mut state = Self::new(grid);
        for c in 0..grid.n_cells() {
            state.bottom[c] = bottom(c);
            state.eta[c] = eta(c).max(state.bottom[c]);
        }
        for side in Direction::LATERAL {
            for (g, c) in grid.physical_ghosts(side) {
                state.bottom[g] = state.bottom[c];
                state.eta[g] = state.eta[c];
            }
        }
        state.etan.copy_from_slice(&state.eta);
        super::wetting::update_depth(grid, &mut state);
        super::wetting::update_geometry(grid, &mut state);
        state.vol_prev.copy_from_slice(&state.vol);
        state
    }

    /// 检查数组长度
    pub fn validate(&self, grid: &StructuredGrid2D) -> PhysicsResult<()> {
        let n = grid.n_cells();
        for (name, len) in [
            ("eta", self.eta.len()),
            ("bottom", self.bottom.len()),
            ("u", self.u.len()),
            ("v", self.v.len()),
            ("area_x", self.area_x.len()),
            ("cfl_active", self.cfl_active.len()),
        ] {
            PhysicsError::check_size(name, n, len)?;
        }
        Ok(())
    }

    /// 内部单元总水量 [m³]
    pub fn total_volume(&self, grid: &StructuredGrid2D) -> f64 {
        let area = grid.area();
        KahanSum::sum_iter(grid.interior_cells().iter().map(|&c| self.depth[c] * area))
    }

    /// 内部单元最大 CFL 数
    pub fn max_cfl(&self, grid: &StructuredGrid2D) -> f64 {
        grid.interior_cells()
            .iter()
            .map(|&c| self.cfl_x[c].max(self.cfl_y[c]))
            .fold(0.0, f64::max)
    }

    /// 湿单元数
    pub fn wet_cells(&self, grid: &StructuredGrid2D) -> usize {
        grid.interior_cells()
            .iter()
            .filter(|&&c| self.depth[c] > 0.0)
            .count()
    }
}
