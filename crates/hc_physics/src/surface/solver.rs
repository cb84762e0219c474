// crates/hc_physics/src/surface/solver.rs

//! 地表水单步求解（两阶段）
//!
//! ```text
//! 高程阶段：ηⁿ ← η → 水位边界 → 交换 η → 动量源项 → 交换 E/D
//!           → 组装 → PCG → 水位边界 → CFL 限制器 → 降雨蒸发 → 水深
//! 流速阶段：渗流源项 → 交换 η → 水深/几何 → 拖曳 → 跌水
//!           → 流速 → 流速边界 → 交换 u/v/F → 通量体积诊断 → 插值
//! ```
//!
//! 两阶段之间由驱动器推进地下水。

use hc_config::{ModelConfig, SolverSettings, SurfaceConfig};

use super::assembly::{assemble, initial_guess, scatter_solution};
use super::momentum::momentum_source;
use super::state::SurfaceState;
use super::velocity::{check_cfl, interp_velocity, update_velocity, volume_by_flux};
use super::wetting::{
    cfl_limiter, evaprain, update_depth, update_drag, update_geometry, waterfall_location,
};
use crate::boundary::{enforce_surf_bc, enforce_velo_bc};
use crate::coupling::CouplingBuffer;
use crate::engine::LinearSolveAdapter;
use crate::error::PhysicsResult;
use crate::forcing::{ForcingLayout, ForcingSnapshot};
use crate::grid::{HaloPlan, StructuredGrid2D};
use crate::transport::Transport;

/// 单步统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceStepReport {
    /// PCG 迭代次数
    pub iterations: usize,
    /// CFL 限制器干化的单元数
    pub forced_dry: usize,
    /// 跌水面数
    pub waterfalls: usize,
    /// 从地下施加到地表的体积 [m³]
    pub seepage_volume: f64,
    /// 经潮位开边界流入的体积 [m³]
    pub boundary_inflow: f64,
    /// 最大 CFL 数
    pub max_cfl: f64,
    /// 通量推算体积与几何体积的最大偏差 [m³]
    pub flux_volume_error: f64,
}

/// 地表水求解器
#[derive(Debug)]
pub struct SurfaceSolver {
    config: SurfaceConfig,
    adapter: LinearSolveAdapter,
    halo: HaloPlan,
}

impl SurfaceSolver {
    /// 创建
    pub fn new(grid: &StructuredGrid2D, config: &ModelConfig) -> Self {
        Self::with_config(grid, config.surface.clone(), &config.solver)
    }

    /// 使用显式参数创建
    pub fn with_config(
        grid: &StructuredGrid2D,
        config: SurfaceConfig,
        solver: &SolverSettings,
    ) -> Self {
        Self {
            config,
            adapter: LinearSolveAdapter::new("surface", solver),
            halo: grid.halo_plan(),
        }
    }

    /// 地表参数
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// 初始化：边界、ghost 与几何量
    pub fn prepare(
        &self,
        grid: &StructuredGrid2D,
        state: &mut SurfaceState,
        layout: &ForcingLayout,
        snapshot: &ForcingSnapshot,
        transport: &dyn Transport,
    ) -> PhysicsResult<()> {
        state.validate(grid)?;
        enforce_surf_bc(grid, layout, snapshot, state);
        transport.exchange(&mut state.eta, &self.halo)?;
        update_depth(grid, state);
        update_geometry(grid, state);
        state.vol_prev.copy_from_slice(&state.vol);
        update_drag(grid, &self.config, state);
        Ok(())
    }

    /// 高程阶段
    ///
    /// 线性求解不收敛时返回错误，调用方负责恢复状态。
    pub fn solve_elevation(
        &mut self,
        grid: &StructuredGrid2D,
        state: &mut SurfaceState,
        layout: &ForcingLayout,
        snapshot: &ForcingSnapshot,
        transport: &dyn Transport,
        dt: f64,
    ) -> PhysicsResult<SurfaceStepReport> {
        state.validate(grid)?;
        let mut report = SurfaceStepReport::default();
        state.etan.copy_from_slice(&state.eta);
        enforce_surf_bc(grid, layout, snapshot, state);
        transport.exchange(&mut state.eta, &self.halo)?;

        momentum_source(grid, &self.config, snapshot, dt, state);
        for field in [
            &mut state.ex,
            &mut state.ey,
            &mut state.drag_x,
            &mut state.drag_y,
        ] {
            transport.exchange(field, &self.halo)?;
        }

        let system = assemble(grid, &self.config, state, layout, snapshot, dt);
        let mut x = initial_guess(grid, state);
        let stats = self.adapter.solve(&system, &mut x)?;
        report.iterations = stats.iterations;
        scatter_solution(grid, state, &x);
        enforce_surf_bc(grid, layout, snapshot, state);

        report.forced_dry = cfl_limiter(grid, self.config.min_depth, state);
        evaprain(
            grid,
            self.config.min_depth,
            snapshot.rain,
            snapshot.evaporation,
            dt,
            state,
        );
        update_depth(grid, state);
        Ok(report)
    }

    /// 流速阶段（地下水步之后调用）
    #[allow(clippy::too_many_arguments)]
    pub fn update_velocity(
        &mut self,
        grid: &StructuredGrid2D,
        state: &mut SurfaceState,
        coupling: Option<&mut CouplingBuffer>,
        layout: &ForcingLayout,
        snapshot: &ForcingSnapshot,
        transport: &dyn Transport,
        dt: f64,
        report: &mut SurfaceStepReport,
    ) -> PhysicsResult<()> {
        if let Some(buffer) = coupling {
            report.seepage_volume = buffer.apply_to_surface(grid, &mut state.eta, self.config.min_depth);
        }
        transport.exchange(&mut state.eta, &self.halo)?;
        update_depth(grid, state);
        update_geometry(grid, state);
        update_drag(grid, &self.config, state);

        report.waterfalls = waterfall_location(grid, self.config.waterfall_depth, state);
        update_velocity(grid, &self.config, dt, state);
        report.boundary_inflow = enforce_velo_bc(grid, layout, dt, state);
        for field in [
            &mut state.u,
            &mut state.v,
            &mut state.flow_x,
            &mut state.flow_y,
        ] {
            transport.exchange(field, &self.halo)?;
        }
        report.max_cfl = check_cfl(grid, state);
        report.flux_volume_error = volume_by_flux(grid, layout, snapshot, dt, state);

        interp_velocity(grid, state);
        transport.exchange(&mut state.uy, &self.halo)?;
        transport.exchange(&mut state.vx, &self.halo)?;

        log::debug!(
            "地表步: dt={:.3e}s, PCG {} 次, 湿单元 {}, CFL {:.3}, 渗流 {:.3e} m³",
            dt,
            report.iterations,
            state.wet_cells(grid),
            report.max_cfl,
            report.seepage_volume
        );
        Ok(())
    }

    /// 完整一步（无地下水耦合）
    pub fn step(
        &mut self,
        grid: &StructuredGrid2D,
        state: &mut SurfaceState,
        layout: &ForcingLayout,
        snapshot: &ForcingSnapshot,
        transport: &dyn Transport,
        dt: f64,
    ) -> PhysicsResult<SurfaceStepReport> {
        let mut report = self.solve_elevation(grid, state, layout, snapshot, transport, dt)?;
        self.update_velocity(grid, state, None, layout, snapshot, transport, dt, &mut report)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcing::ForcingSet;
    use crate::grid::{GridTopology, Subdomain};
    use crate::transport::SerialTransport;
    use hc_config::GridConfig;

    fn setup(nx: usize, ny: usize) -> (StructuredGrid2D, SurfaceSolver) {
        let config = ModelConfig {
            grid: GridConfig::uniform(nx, ny, 1, 1.0, 1.0, 1.0),
            ..ModelConfig::default()
        };
        let grid = StructuredGrid2D::new(&config.grid, Subdomain::serial(&config.grid)).unwrap();
        let solver = SurfaceSolver::new(&grid, &config);
        (grid, solver)
    }

    #[test]
    fn test_lake_at_rest_stays_at_rest() {
        let (grid, mut solver) = setup(4, 4);
        let mut state = SurfaceState::from_elevation(&grid, |c| 0.01 * (c % 3) as f64, |_| 0.5);
        let forcing = ForcingSet::default();
        let layout = forcing.localize(&grid);
        let snap = forcing.update(0.0);
        solver.prepare(&grid, &mut state, &layout, &snap, &SerialTransport).unwrap();
        for _ in 0..3 {
            solver
                .step(&grid, &mut state, &layout, &snap, &SerialTransport, 1.0)
                .unwrap();
        }
        for &c in grid.interior_cells() {
            assert!((state.eta[c] - 0.5).abs() < 1e-9);
            assert!(state.u[c].abs() < 1e-9);
        }
    }

    #[test]
    fn test_closed_basin_conserves_volume() {
        let (grid, mut solver) = setup(5, 1);
        let mut state = SurfaceState::from_elevation(
            &grid,
            |_| 0.0,
            |c| if grid.coords(c).0 <= 2 { 0.6 } else { 0.4 },
        );
        let forcing = ForcingSet::default();
        let layout = forcing.localize(&grid);
        let snap = forcing.update(0.0);
        solver.prepare(&grid, &mut state, &layout, &snap, &SerialTransport).unwrap();
        let before = state.total_volume(&grid);
        let mut moved = false;
        for _ in 0..5 {
            let report = solver
                .step(&grid, &mut state, &layout, &snap, &SerialTransport, 0.5)
                .unwrap();
            moved |= report.max_cfl > 0.0;
        }
        assert!(moved);
        let after = state.total_volume(&grid) + state.loss;
        assert!((before - after).abs() < 1e-6, "{} vs {}", before, after);
    }
}
