// crates/hc_physics/src/subsurface/state.rs

//! 地下水状态（填充数组）

use hc_foundation::KahanSum;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::grid::{CellId, GridTopology, StructuredGrid3D};
use crate::material::{DensityFactors, VanGenuchten};

/// 非激活单元的水头标记值 [m]
pub const INACTIVE_HEAD: f64 = -100.0;

/// 地下水状态
///
/// 通量数组按“+ 面”存放：`qx[c]` 是 c 与其 +x 邻居之间的面，
/// 正值表示水沿 -x 方向流入 c。z 轴向下，`qz[c]` 为正表示向上流动。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubsurfaceState {
    /// 压力水头 [m]
    pub h: Vec<f64>,
    /// 上一步压力水头
    pub hn: Vec<f64>,
    /// 体积含水量
    pub wc: Vec<f64>,
    /// 上一步含水量
    pub wcn: Vec<f64>,
    /// x 面 Darcy 通量 [m/s]
    pub qx: Vec<f64>,
    /// y 面 Darcy 通量
    pub qy: Vec<f64>,
    /// z 面 Darcy 通量
    pub qz: Vec<f64>,
    /// x 面导水率 [m/s]
    pub kx: Vec<f64>,
    /// y 面导水率
    pub ky: Vec<f64>,
    /// z 面导水率
    pub kz: Vec<f64>,
    /// 剩余可容纳体积 [m³]
    pub room: Vec<f64>,
    /// 单元含水体积 [m³]
    pub vg: Vec<f64>,
    /// 由通量推算的含水体积 [m³]
    pub vg_flux: Vec<f64>,
    /// 逐单元累积损失体积 [m³]（正为移出系统）
    pub vloss: Vec<f64>,
    /// 逐单元累积弹性储水体积 [m³]（比储水项 `Ss·θ/θs·Δh` 吸收的部分）
    pub vss: Vec<f64>,
    /// 柱顶/柱底边界通量诊断 [m/s]
    pub qbc_top: Vec<f64>,
    /// 柱底边界通量诊断
    pub qbc_bottom: Vec<f64>,
    /// 变密度修正因子
    #[serde(skip)]
    pub density: DensityFactors,
}

impl SubsurfaceState {
    /// 全零状态
    pub fn new(grid: &StructuredGrid3D) -> Self {
        let n = grid.n_cells();
        let ncol = grid.px * grid.py;
        Self {
            h: vec![0.0; n],
            hn: vec![0.0; n],
            wc: vec![0.0; n],
            wcn: vec![0.0; n],
            qx: vec![0.0; n],
            qy: vec![0.0; n],
            qz: vec![0.0; n],
            kx: vec![0.0; n],
            ky: vec![0.0; n],
            kz: vec![0.0; n],
            room: vec![0.0; n],
            vg: vec![0.0; n],
            vg_flux: vec![0.0; n],
            vloss: vec![0.0; n],
            vss: vec![0.0; n],
            qbc_top: vec![0.0; ncol],
            qbc_bottom: vec![0.0; ncol],
            density: DensityFactors::uniform(n),
        }
    }

    /// 按 `head(cell)` 初始化水头，含水量由闭合关系给出
    pub fn from_head(
        grid: &StructuredGrid3D,
        vg: &VanGenuchten,
        head: impl Fn(CellId) -> f64,
    ) -> Self {
        let mut state = Self::new(grid);
        for c in 0..grid.n_cells() {
            if grid.is_active(c) {
                state.h[c] = head(c);
                state.wc[c] = vg.moisture_from_head(state.h[c]);
            } else {
                state.h[c] = INACTIVE_HEAD;
            }
        }
        state.refresh_volumes(grid, vg);
        state.commit();
        state
    }

    /// 静水压分布：水位位于 `water_table` 深度（自顶面向下）[m]
    pub fn hydrostatic(grid: &StructuredGrid3D, vg: &VanGenuchten, water_table: f64) -> Self {
        let depth = Self::centre_depths(grid);
        Self::from_head(grid, vg, |c| depth[c % grid.pz] - water_table)
    }

    /// 每层中心距顶面的深度
    fn centre_depths(grid: &StructuredGrid3D) -> Vec<f64> {
        let mut depth = vec![0.0; grid.pz];
        let mut acc = 0.0;
        for (pk, d) in depth.iter_mut().enumerate().skip(1) {
            let dz = grid.dz(pk);
            *d = acc + 0.5 * dz;
            acc += dz;
        }
        depth[0] = -0.5 * grid.dz(0);
        depth
    }

    /// 检查数组长度
    pub fn validate(&self, grid: &StructuredGrid3D) -> PhysicsResult<()> {
        let n = grid.n_cells();
        for (name, len) in [
            ("h", self.h.len()),
            ("wc", self.wc.len()),
            ("qx", self.qx.len()),
            ("qz", self.qz.len()),
            ("kz", self.kz.len()),
            ("vloss", self.vloss.len()),
            ("vss", self.vss.len()),
        ] {
            PhysicsError::check_size(name, n, len)?;
        }
        Ok(())
    }

    /// 由含水量刷新 room / vg
    pub fn refresh_volumes(&mut self, grid: &StructuredGrid3D, vg: &VanGenuchten) {
        for &c in grid.interior_cells() {
            if grid.is_active(c) {
                let v = grid.volume(c);
                self.vg[c] = self.wc[c] * v;
                self.room[c] = ((vg.wcs - self.wc[c]) * v).max(0.0);
            } else {
                self.vg[c] = 0.0;
                self.room[c] = 0.0;
            }
        }
    }

    /// 步开始：当前场成为 hⁿ / θⁿ（密度因子由外部更新，步末再提交）
    pub fn begin_step(&mut self) {
        self.hn.copy_from_slice(&self.h);
        self.wcn.copy_from_slice(&self.wc);
    }

    /// 全部提交（含密度因子）
    pub fn commit(&mut self) {
        self.hn.copy_from_slice(&self.h);
        self.wcn.copy_from_slice(&self.wc);
        self.density.commit();
    }

    /// 激活内部单元的总含水体积 [m³]
    pub fn total_water(&self, grid: &StructuredGrid3D) -> f64 {
        KahanSum::sum_iter(
            grid.interior_cells()
                .iter()
                .filter(|&&c| grid.is_active(c))
                .map(|&c| self.wc[c] * grid.volume(c)),
        )
    }

    /// 总储水体积 [m³]：含水体积加弹性储水
    ///
    /// 封闭无源区域内 `total_storage + total_loss` 逐步不变。
    pub fn total_storage(&self, grid: &StructuredGrid3D) -> f64 {
        KahanSum::sum_iter(
            grid.interior_cells()
                .iter()
                .filter(|&&c| grid.is_active(c))
                .map(|&c| self.wc[c] * grid.volume(c) + self.vss[c]),
        )
    }

    /// 累积损失体积 [m³]
    pub fn total_loss(&self, grid: &StructuredGrid3D) -> f64 {
        KahanSum::sum_iter(grid.interior_cells().iter().map(|&c| self.vloss[c]))
    }

    /// 最大含水量越界量（诊断）
    pub fn max_moisture_violation(&self, grid: &StructuredGrid3D, vg: &VanGenuchten) -> f64 {
        grid.interior_cells()
            .iter()
            .filter(|&&c| grid.is_active(c))
            .map(|&c| (self.wc[c] - vg.wcs).max(vg.wcr - self.wc[c]).max(0.0))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Subdomain;
    use hc_config::GridConfig;

    #[test]
    fn test_hydrostatic_initialisation() {
        let config = GridConfig::uniform(1, 1, 4, 1.0, 1.0, 0.5);
        let grid = StructuredGrid3D::new(&config, Subdomain::serial(&config)).unwrap();
        let vg = VanGenuchten::new(1.0, 2.0, 0.4, 0.05);
        let state = SubsurfaceState::hydrostatic(&grid, &vg, 1.0);

        let heads: Vec<f64> = (1..=4).map(|k| state.h[grid.index(1, 1, k)]).collect();
        assert!((heads[0] + 0.75).abs() < 1e-12);
        assert!((heads[3] - 0.75).abs() < 1e-12);
        assert_eq!(state.wc[grid.index(1, 1, 4)], 0.4);
        assert!(state.wc[grid.index(1, 1, 1)] < 0.4);
        assert_eq!(state.hn, state.h);
    }

    #[test]
    fn test_inactive_cells_get_sentinel() {
        let config = GridConfig::uniform(2, 1, 2, 1.0, 1.0, 1.0);
        let grid = StructuredGrid3D::with_mask(&config, Subdomain::serial(&config), |gi, _, k| {
            gi == 0 || k == 1
        })
        .unwrap();
        let vg = VanGenuchten::new(1.0, 2.0, 0.4, 0.05);
        let state = SubsurfaceState::from_head(&grid, &vg, |_| -0.5);
        let dead = grid.index(2, 1, 1);
        assert_eq!(state.h[dead], INACTIVE_HEAD);
        assert_eq!(state.vg[dead], 0.0);
        let total = state.total_water(&grid);
        assert!((total - 3.0 * vg.moisture_from_head(-0.5)).abs() < 1e-12);
    }
}
