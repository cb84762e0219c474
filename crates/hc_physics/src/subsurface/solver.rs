// crates/hc_physics/src/subsurface/solver.rs

//! 地下水单步求解
//!
//! ```text
//! 1. hⁿ/θⁿ ← h/θ，交换 ghost，施加水头/含水量边界
//! 2. 面导水率 → 组装 → PCG → 施加水头边界 → 交换 h
//! 3. 面通量（记录柱顶交换）→ 含水量校正 → room
//! 4. 再分配 → 通量体积诊断 → 截断/刷新体积 → 交换 θ
//! ```

use hc_config::{ModelConfig, SolverSettings};
use hc_foundation::KahanSum;

use super::assembly::{assemble, initial_guess, scatter_solution};
use super::coefficients::face_conductivity;
use super::flux::{check_room, face_fluxes, update_water_content, volume_by_flux};
use super::params::SubsurfaceParams;
use super::reallocation::{finalize_moisture, reallocate, ReallocationOutcome};
use super::state::SubsurfaceState;
use crate::boundary::{enforce_head_bc, enforce_moisture_bc};
use crate::coupling::CouplingBuffer;
use crate::engine::LinearSolveAdapter;
use crate::error::PhysicsResult;
use crate::grid::{GridTopology, HaloPlan, StructuredGrid3D};
use crate::transport::Transport;

/// 单步统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubsurfaceStepReport {
    /// PCG 迭代次数
    pub iterations: usize,
    /// 再分配结果
    pub reallocation: ReallocationOutcome,
    /// 最终截断体积 [m³]
    pub clipped_volume: f64,
    /// 柱顶交换体积 [m³]（正为流出地下）
    pub top_exchange: f64,
    /// 柱底交换体积 [m³]（正为流入地下）
    pub bottom_exchange: f64,
    /// 通量推算体积与实际体积的最大偏差 [m³]
    pub flux_volume_error: f64,
}

/// 地下水求解器
#[derive(Debug)]
pub struct SubsurfaceSolver {
    params: SubsurfaceParams,
    adapter: LinearSolveAdapter,
    halo: HaloPlan,
}

impl SubsurfaceSolver {
    /// 创建
    pub fn new(grid: &StructuredGrid3D, config: &ModelConfig) -> Self {
        Self::with_params(grid, SubsurfaceParams::from_config(config), &config.solver)
    }

    /// 使用显式参数创建
    pub fn with_params(
        grid: &StructuredGrid3D,
        params: SubsurfaceParams,
        solver: &SolverSettings,
    ) -> Self {
        Self {
            params,
            adapter: LinearSolveAdapter::new("subsurface", solver),
            halo: grid.halo_plan(),
        }
    }

    /// 求解参数
    pub fn params(&self) -> &SubsurfaceParams {
        &self.params
    }

    /// 初始化 ghost：交换并施加边界
    pub fn prepare(
        &self,
        grid: &StructuredGrid3D,
        state: &mut SubsurfaceState,
        coupling: &CouplingBuffer,
        transport: &dyn Transport,
    ) -> PhysicsResult<()> {
        transport.exchange(&mut state.h, &self.halo)?;
        transport.exchange(&mut state.wc, &self.halo)?;
        enforce_head_bc(grid, &self.params, state, coupling);
        enforce_moisture_bc(grid, &self.params, state);
        Ok(())
    }

    /// 推进一步
    ///
    /// 线性求解不收敛时返回错误，状态处于中间值，调用方负责恢复。
    pub fn step(
        &mut self,
        grid: &StructuredGrid3D,
        state: &mut SubsurfaceState,
        coupling: &mut CouplingBuffer,
        transport: &dyn Transport,
        dt: f64,
    ) -> PhysicsResult<SubsurfaceStepReport> {
        state.validate(grid)?;
        let params = &self.params;
        let mut report = SubsurfaceStepReport::default();

        self.prepare(grid, state, coupling, transport)?;
        state.begin_step();

        // 预测：隐式水头
        face_conductivity(grid, params, state, coupling);
        let system = assemble(grid, params, state, coupling, dt);
        let mut x = initial_guess(grid, state);
        let stats = self.adapter.solve(&system, &mut x)?;
        report.iterations = stats.iterations;
        scatter_solution(grid, state, &x);
        enforce_head_bc(grid, params, state, coupling);
        transport.exchange(&mut state.h, &self.halo)?;

        // 校正：通量与含水量
        face_fluxes(grid, params, state, coupling, dt);
        update_water_content(grid, params, state, dt);
        transport.exchange(&mut state.wc, &self.halo)?;
        check_room(grid, params, state);

        if params.use_corrector && params.reallocate {
            report.reallocation = reallocate(grid, params, state, coupling, dt);
        }

        volume_by_flux(grid, state, dt);
        report.clipped_volume = finalize_moisture(grid, params, state);
        transport.exchange(&mut state.wc, &self.halo)?;
        state.density.commit();

        let area = grid.area_z();
        let mut top = KahanSum::new();
        let mut bottom = KahanSum::new();
        for col in grid.interior_columns() {
            top.add(state.qbc_top[col] * area * dt);
            bottom.add(state.qbc_bottom[col] * area * dt);
        }
        report.top_exchange = top.value();
        report.bottom_exchange = bottom.value();
        report.flux_volume_error = grid
            .interior_cells()
            .iter()
            .filter(|&&c| grid.is_active(c))
            .map(|&c| (state.vg_flux[c] - state.vg[c]).abs())
            .fold(0.0, f64::max);

        log::debug!(
            "地下水步: dt={:.3e}s, PCG {} 次, 顶面 {:.3e} m³, 底面 {:.3e} m³",
            dt,
            report.iterations,
            report.top_exchange,
            report.bottom_exchange
        );
        Ok(report)
    }
}
