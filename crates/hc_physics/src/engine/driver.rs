// crates/hc_physics/src/engine/driver.rs

//! 耦合步驱动
//!
//! ```text
//! 强迫快照 → 地表高程 → 地下水（系数/组装/求解/通量/含水量/再分配）
//!   └─ 需要重算：恢复两域状态，缩小 dt 后重做
//! → 渗流/积水施加到地表 → 地表流速 → 自适应时间步
//! ```
//!
//! 重算判定与时间步都经过全局归约，所有子域保持同步。

use hc_config::ModelConfig;
use serde::{Deserialize, Serialize};

use super::timestep::AdaptiveStepController;
use crate::coupling::CouplingBuffer;
use crate::error::{PhysicsError, PhysicsResult};
use crate::forcing::{ForcingLayout, ForcingSet, ForcingSnapshot};
use crate::grid::{GridTopology, StructuredGrid2D, StructuredGrid3D, Subdomain};
use crate::subsurface::{SubsurfaceSolver, SubsurfaceState, SubsurfaceStepReport};
use crate::surface::{SurfaceSolver, SurfaceState, SurfaceStepReport};
use crate::transport::Transport;

// ============================================================
// 初始条件
// ============================================================

/// 均匀初始条件
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialCondition {
    /// 地下水位埋深（自地表向下）[m]
    #[serde(default = "default_water_table")]
    pub water_table: f64,
    /// 地表初始积水深 [m]
    #[serde(default)]
    pub ponding_depth: f64,
}

fn default_water_table() -> f64 {
    1.0
}

impl Default for InitialCondition {
    fn default() -> Self {
        Self {
            water_table: default_water_table(),
            ponding_depth: 0.0,
        }
    }
}

// ============================================================
// 步统计
// ============================================================

/// 单步统计（全局量已归约）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// 步末时间 [s]
    pub time: f64,
    /// 实际使用的时间步 [s]
    pub dt: f64,
    /// 重算次数
    pub retries: usize,
    /// 本子域 PCG 迭代次数（地表 + 地下）
    pub iterations: usize,
    /// 累积体积损失 [m³]
    pub volume_loss: f64,
    /// 本步施加到地表的渗流体积 [m³]
    pub seepage: f64,
    /// 地表最大 CFL 数
    pub max_cfl: f64,
    /// 下一步时间步 [s]
    pub next_dt: f64,
}

impl StepReport {
    /// 生成诊断摘要
    pub fn summary(&self) -> String {
        format!(
            "t={:.3}s, dt={:.4}s, retries={}, iters={}, loss={:.3e}m³, seepage={:.3e}m³, cfl={:.3}",
            self.time,
            self.dt,
            self.retries,
            self.iterations,
            self.volume_loss,
            self.seepage,
            self.max_cfl
        )
    }
}

/// 全局水量
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaterBudget {
    /// 地下水体积 [m³]
    pub subsurface: f64,
    /// 地表水体积 [m³]
    pub surface: f64,
    /// 耦合缓冲中尚未施加的体积 [m³]
    pub pending: f64,
    /// 累积损失 [m³]
    pub loss: f64,
}

impl WaterBudget {
    /// 系统内总水量（含损失）
    pub fn total(&self) -> f64 {
        self.subsurface + self.surface + self.pending + self.loss
    }
}

// ============================================================
// 耦合模型
// ============================================================

struct Subsurface {
    solver: SubsurfaceSolver,
    state: SubsurfaceState,
}

struct Surface {
    solver: SurfaceSolver,
    state: SurfaceState,
}

/// 单个子域上的耦合模型
pub struct CoupledModel {
    config: ModelConfig,
    transport: Box<dyn Transport>,
    grid3d: StructuredGrid3D,
    grid2d: StructuredGrid2D,
    subsurface: Option<Subsurface>,
    surface: Option<Surface>,
    coupling: CouplingBuffer,
    forcing: ForcingSet,
    layout: ForcingLayout,
    controller: AdaptiveStepController,
    time: f64,
    steps: usize,
}

impl std::fmt::Debug for CoupledModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoupledModel")
            .field("rank", &self.transport.rank())
            .field("time", &self.time)
            .field("steps", &self.steps)
            .field("dt", &self.controller.dt())
            .finish()
    }
}

impl CoupledModel {
    /// 创建构建器
    pub fn builder(config: ModelConfig) -> CoupledModelBuilder {
        CoupledModelBuilder::new(config)
    }

    /// 当前时间 [s]
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// 已完成步数
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// 下一步时间步 [s]
    #[inline]
    pub fn dt(&self) -> f64 {
        self.controller.dt()
    }

    /// 模型配置
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// 三维网格
    pub fn grid3d(&self) -> &StructuredGrid3D {
        &self.grid3d
    }

    /// 地表网格
    pub fn grid2d(&self) -> &StructuredGrid2D {
        &self.grid2d
    }

    /// 地下水状态
    pub fn subsurface_state(&self) -> Option<&SubsurfaceState> {
        self.subsurface.as_ref().map(|s| &s.state)
    }

    /// 地表水状态
    pub fn surface_state(&self) -> Option<&SurfaceState> {
        self.surface.as_ref().map(|s| &s.state)
    }

    /// 耦合缓冲
    pub fn coupling(&self) -> &CouplingBuffer {
        &self.coupling
    }

    /// 全局水量（集体操作，所有子域须同时调用）
    pub fn water_budget(&self) -> PhysicsResult<WaterBudget> {
        let mut local = WaterBudget::default();
        if let Some(sub) = &self.subsurface {
            local.subsurface = sub.state.total_storage(&self.grid3d);
            local.loss += sub.state.total_loss(&self.grid3d);
        }
        if let Some(surf) = &self.surface {
            local.surface = surf.state.total_volume(&self.grid2d);
            local.loss += surf.state.loss;
            local.pending = self.coupling.pending_volume(&self.grid2d);
        }
        let t = self.transport.as_ref();
        Ok(WaterBudget {
            subsurface: t.reduce_sum(local.subsurface)?,
            surface: t.reduce_sum(local.surface)?,
            pending: t.reduce_sum(local.pending)?,
            loss: t.reduce_sum(local.loss)?,
        })
    }

    /// 推进一个耦合步
    pub fn advance(&mut self) -> PhysicsResult<StepReport> {
        let snapshot = self.forcing.update(self.time);
        self.prepare_coupling(&snapshot);

        let mut retries = 0;
        let (dt, surface_report, subsurface_report) = loop {
            let dt = self.controller.dt();
            let backup = self.snapshot_states();
            let (surface_report, subsurface_report) = match self.solve_implicit(&snapshot, dt) {
                Ok(reports) => reports,
                Err(err) => {
                    // 不收敛时回到步开始的状态再上报
                    self.restore_states(backup);
                    return Err(err);
                }
            };

            let local_retry = subsurface_report
                .as_ref()
                .is_some_and(|r| r.reallocation.retry);
            let retry = self.transport.reduce_max(if local_retry { 1.0 } else { 0.0 })? > 0.0;
            if !retry {
                break (dt, surface_report, subsurface_report);
            }
            if retries >= self.config.time.max_step_retries {
                log::warn!("已达重算上限 {}，接受 t={:.3}s 的结果", retries, self.time);
                break (dt, surface_report, subsurface_report);
            }
            if !self.controller.shrink_for_retry() {
                log::warn!("时间步已在下限 {:.3e}s，无法重算，接受当前结果", dt);
                break (dt, surface_report, subsurface_report);
            }
            self.restore_states(backup);
            retries += 1;
            log::debug!("含水量越界，dt {:.3e} → {:.3e} 重算", dt, self.controller.dt());
        };

        let mut surface_report = surface_report.unwrap_or_default();
        if let Some(surf) = self.surface.as_mut() {
            let coupling = if self.subsurface.is_some() {
                Some(&mut self.coupling)
            } else {
                None
            };
            surf.solver.update_velocity(
                &self.grid2d,
                &mut surf.state,
                coupling,
                &self.layout,
                &snapshot,
                self.transport.as_ref(),
                dt,
                &mut surface_report,
            )?;
        }

        let next_dt = match self.subsurface.as_ref() {
            Some(sub) => self.controller.adapt(
                &self.grid3d,
                &sub.state,
                &sub.solver.params().vg,
                sub.solver.params().soil.ks_z,
                self.transport.as_ref(),
            )?,
            None => self.controller.dt(),
        };

        self.time += dt;
        self.steps += 1;

        let iterations = surface_report.iterations
            + subsurface_report.as_ref().map_or(0, |r| r.iterations);
        let budget = self.water_budget()?;
        let report = StepReport {
            time: self.time,
            dt,
            retries,
            iterations,
            volume_loss: budget.loss,
            seepage: self.transport.reduce_sum(surface_report.seepage_volume)?,
            max_cfl: self.transport.reduce_max(surface_report.max_cfl)?,
            next_dt,
        };
        log::debug!("步 {}: {}", self.steps, report.summary());
        Ok(report)
    }

    /// 推进到 `t_end`，每步回调一次
    ///
    /// 最后一步缩短到恰好落在 `t_end`。
    pub fn run_until(
        &mut self,
        t_end: f64,
        mut on_step: impl FnMut(&StepReport),
    ) -> PhysicsResult<usize> {
        let start = self.steps;
        while self.time < t_end {
            let remaining = t_end - self.time;
            let last = remaining <= self.controller.dt();
            if last {
                self.controller.limit_dt(remaining);
            }
            let mut report = self.advance()?;
            if last && report.dt == remaining {
                // 消除 time + dt 的舍入
                self.time = t_end;
                report.time = t_end;
            }
            on_step(&report);
        }
        Ok(self.steps - start)
    }

    /// 柱顶给定通量写入耦合缓冲
    fn prepare_coupling(&mut self, snapshot: &ForcingSnapshot) {
        let mut qtop = self.config.boundary.flux_top;
        if self.surface.is_none() {
            // 无地表水时降雨与蒸发直接作用于柱顶
            qtop += snapshot.evaporation - snapshot.rain;
        }
        self.coupling.set_top_flux(qtop);
    }

    /// 地表高程 + 地下水
    fn solve_implicit(
        &mut self,
        snapshot: &ForcingSnapshot,
        dt: f64,
    ) -> PhysicsResult<(Option<SurfaceStepReport>, Option<SubsurfaceStepReport>)> {
        let transport = self.transport.as_ref();
        let surface_report = match self.surface.as_mut() {
            Some(surf) => {
                let report = surf.solver.solve_elevation(
                    &self.grid2d,
                    &mut surf.state,
                    &self.layout,
                    snapshot,
                    transport,
                    dt,
                )?;
                self.coupling.load_surface_depth(&surf.state.depth);
                Some(report)
            }
            None => None,
        };
        let subsurface_report = match self.subsurface.as_mut() {
            Some(sub) => Some(sub.solver.step(
                &self.grid3d,
                &mut sub.state,
                &mut self.coupling,
                transport,
                dt,
            )?),
            None => None,
        };
        Ok((surface_report, subsurface_report))
    }

    fn snapshot_states(&self) -> StateBackup {
        StateBackup {
            subsurface: self.subsurface.as_ref().map(|s| s.state.clone()),
            surface: self.surface.as_ref().map(|s| s.state.clone()),
            coupling: self.coupling.clone(),
        }
    }

    fn restore_states(&mut self, backup: StateBackup) {
        if let (Some(sub), Some(state)) = (self.subsurface.as_mut(), backup.subsurface) {
            sub.state = state;
        }
        if let (Some(surf), Some(state)) = (self.surface.as_mut(), backup.surface) {
            surf.state = state;
        }
        self.coupling = backup.coupling;
    }
}

/// 重算前的已提交状态
struct StateBackup {
    subsurface: Option<SubsurfaceState>,
    surface: Option<SurfaceState>,
    coupling: CouplingBuffer,
}

// ============================================================
// 构建器
// ============================================================

/// 耦合模型构建器
pub struct CoupledModelBuilder {
    config: ModelConfig,
    forcing: ForcingSet,
    initial: InitialCondition,
    subsurface_state: Option<SubsurfaceState>,
    surface_state: Option<SurfaceState>,
}

impl CoupledModelBuilder {
    /// 创建构建器
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            forcing: ForcingSet::default(),
            initial: InitialCondition::default(),
            subsurface_state: None,
            surface_state: None,
        }
    }

    /// 设置强迫
    pub fn forcing(mut self, forcing: ForcingSet) -> Self {
        self.forcing = forcing;
        self
    }

    /// 设置均匀初始条件
    pub fn initial(mut self, initial: InitialCondition) -> Self {
        self.initial = initial;
        self
    }

    /// 直接给定地下水初始状态（须与本子域网格匹配）
    pub fn subsurface_state(mut self, state: SubsurfaceState) -> Self {
        self.subsurface_state = Some(state);
        self
    }

    /// 直接给定地表水初始状态（须与本子域网格匹配）
    pub fn surface_state(mut self, state: SurfaceState) -> Self {
        self.surface_state = Some(state);
        self
    }

    /// 在 `transport` 所属子域上构建模型
    pub fn build(self, transport: Box<dyn Transport>) -> PhysicsResult<CoupledModel> {
        let config = self.config;
        config.validate()?;
        self.forcing.validate()?;
        if transport.size() != config.grid.n_subdomains() {
            return Err(PhysicsError::transport(format!(
                "通信规模 {} 与分区 {}x{} 不符",
                transport.size(),
                config.grid.npx,
                config.grid.npy
            )));
        }

        let sub = Subdomain::new(&config.grid, transport.rank())?;
        let grid3d = StructuredGrid3D::new(&config.grid, sub.clone())?;
        let grid2d = StructuredGrid2D::new(&config.grid, sub)?;
        let layout = self.forcing.localize(&grid2d);
        let mut coupling = CouplingBuffer::new(grid2d.n_cells());
        let snapshot = self.forcing.update(0.0);
        let initial = self.initial;

        let surface = if config.physics.shallow_water {
            let solver = SurfaceSolver::new(&grid2d, &config);
            let mut state = match self.surface_state {
                Some(state) => state,
                None => SurfaceState::from_elevation(&grid2d, |_| 0.0, |_| initial.ponding_depth),
            };
            solver.prepare(&grid2d, &mut state, &layout, &snapshot, transport.as_ref())?;
            coupling.load_surface_depth(&state.depth);
            Some(Surface { solver, state })
        } else {
            None
        };

        let subsurface = if config.physics.groundwater {
            let solver = SubsurfaceSolver::new(&grid3d, &config);
            let mut state = match self.subsurface_state {
                Some(state) => state,
                None => SubsurfaceState::hydrostatic(&grid3d, &solver.params().vg, initial.water_table),
            };
            state.validate(&grid3d)?;
            solver.prepare(&grid3d, &mut state, &coupling, transport.as_ref())?;
            Some(Subsurface { solver, state })
        } else {
            None
        };

        log::info!(
            "子域 {}/{}: {}x{}x{} 单元, 地下水={}, 地表水={}",
            transport.rank(),
            transport.size(),
            grid3d.nx,
            grid3d.ny,
            grid3d.nz,
            subsurface.is_some(),
            surface.is_some()
        );

        Ok(CoupledModel {
            controller: AdaptiveStepController::from_config(&config.time),
            config,
            transport,
            grid3d,
            grid2d,
            subsurface,
            surface,
            coupling,
            forcing: self.forcing,
            layout,
            time: 0.0,
            steps: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsurface::SubsurfaceParams;
    use crate::transport::{LocalCluster, SerialTransport};
    use hc_config::{BoundaryConfig, GridConfig, PreconditionerKind, SolverSettings};

    fn closed_config() -> ModelConfig {
        let mut config = ModelConfig {
            grid: GridConfig::uniform(3, 3, 4, 1.0, 1.0, 0.25),
            boundary: BoundaryConfig::closed(),
            ..ModelConfig::default()
        };
        config.time.dt_init = 1.0;
        config.time.dt_max = 10.0;
        config
    }

    #[test]
    fn test_build_rejects_mismatched_transport() {
        let mut config = closed_config();
        config.grid.npx = 3;
        let result = CoupledModel::builder(config).build(Box::new(SerialTransport));
        assert!(result.is_err());
    }

    #[test]
    fn test_coupled_step_keeps_budget() {
        let model = CoupledModel::builder(closed_config())
            .initial(InitialCondition {
                water_table: 0.5,
                ponding_depth: 0.02,
            })
            .build(Box::new(SerialTransport));
        let mut model = model.unwrap();
        let before = model.water_budget().unwrap().total();
        for _ in 0..3 {
            let report = model.advance().unwrap();
            assert!(report.dt > 0.0);
            assert!(report.next_dt >= model.config().time.dt_min);
        }
        let after = model.water_budget().unwrap().total();
        assert!((before - after).abs() < 1e-6 * before.max(1.0), "{} vs {}", before, after);
        assert_eq!(model.steps(), 3);
    }

    #[test]
    fn test_groundwater_only_model_has_no_surface() {
        let mut config = closed_config();
        config.physics.shallow_water = false;
        let model = CoupledModel::builder(config).build(Box::new(SerialTransport));
        let model = model.unwrap();
        assert!(model.surface_state().is_none());
        assert!(model.subsurface_state().is_some());
    }

    /// rank 0 的一个非饱和单元含水量超过 θs 的 20%，每次尝试都会触发重算
    fn oversaturated_state(config: &ModelConfig, rank: usize) -> SubsurfaceState {
        let sub = Subdomain::new(&config.grid, rank).unwrap();
        let grid = StructuredGrid3D::new(&config.grid, sub).unwrap();
        let vg = SubsurfaceParams::from_config(config).vg;
        let mut state = SubsurfaceState::hydrostatic(&grid, &vg, 0.5);
        if rank == 0 {
            let c = grid.index(1, 1, 2);
            state.wc[c] = 1.2 * vg.wcs;
            state.refresh_volumes(&grid, &vg);
        }
        state
    }

    #[test]
    fn test_retry_restores_backup_and_shrinks_dt() {
        let mut config = closed_config();
        config.physics.shallow_water = false;
        config.time.max_step_retries = 3;
        let state = oversaturated_state(&config, 0);
        let mut model = CoupledModel::builder(config)
            .subsurface_state(state)
            .build(Box::new(SerialTransport))
            .unwrap();
        let before = model.water_budget().unwrap().total();

        let report = model.advance().unwrap();
        // 每次都从备份重做，越界量不变，所以会用满重算上限
        assert_eq!(report.retries, 3);
        assert!((report.dt - 0.9_f64.powi(3)).abs() < 1e-12, "dt = {}", report.dt);
        assert_eq!(model.time(), report.dt);
        assert_eq!(model.steps(), 1);
        let after = model.water_budget().unwrap().total();
        assert!((before - after).abs() < 1e-9 * before, "{} vs {}", before, after);
        let vg = SubsurfaceParams::from_config(model.config()).vg;
        let sub = model.subsurface_state().unwrap();
        assert_eq!(sub.max_moisture_violation(model.grid3d(), &vg), 0.0);
    }

    #[test]
    fn test_retry_decision_is_shared_by_all_ranks() {
        let mut config = closed_config();
        config.grid = GridConfig::uniform(4, 2, 4, 1.0, 1.0, 0.25);
        config.grid.npx = 2;
        config.physics.shallow_water = false;
        config.time.max_step_retries = 2;
        let endpoints = LocalCluster::new(2);

        let reports: Vec<(usize, f64)> = std::thread::scope(|s| {
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|t| {
                    let config = config.clone();
                    s.spawn(move || {
                        let state = oversaturated_state(&config, t.rank());
                        let mut model = CoupledModel::builder(config)
                            .subsurface_state(state)
                            .build(Box::new(t))
                            .unwrap();
                        let report = model.advance().unwrap();
                        (report.retries, report.dt)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // 只有 rank 0 越界，rank 1 也随之重算
        assert_eq!(reports[0], reports[1]);
        assert_eq!(reports[0].0, 2);
        assert!((reports[0].1 - 0.81).abs() < 1e-12);
    }

    #[test]
    fn test_failed_solve_leaves_state_untouched() {
        let mut config = closed_config();
        config.solver = SolverSettings {
            max_iter: 1,
            rtol: 1e-14,
            atol: 1e-30,
            preconditioner: PreconditionerKind::Identity,
            ..SolverSettings::default()
        };
        let grid = StructuredGrid3D::new(&config.grid, Subdomain::serial(&config.grid)).unwrap();
        let vg = SubsurfaceParams::from_config(&config).vg;
        // 逐层不平衡的水头：一次迭代不可能收敛
        let state = SubsurfaceState::from_head(&grid, &vg, |c| -0.2 - 0.3 * (c % grid.pz) as f64);
        let mut model = CoupledModel::builder(config)
            .initial(InitialCondition {
                water_table: 0.5,
                ponding_depth: 0.02,
            })
            .subsurface_state(state)
            .build(Box::new(SerialTransport))
            .unwrap();
        let sub = model.subsurface_state().unwrap().clone();
        let surf = model.surface_state().unwrap().clone();

        let err = model.advance().unwrap_err();
        assert!(err.is_non_convergence(), "{}", err);

        let sub_after = model.subsurface_state().unwrap();
        assert_eq!(sub_after.h, sub.h);
        assert_eq!(sub_after.wc, sub.wc);
        assert_eq!(sub_after.qz, sub.qz);
        assert_eq!(sub_after.vloss, sub.vloss);
        let surf_after = model.surface_state().unwrap();
        assert_eq!(surf_after.eta, surf.eta);
        assert_eq!(surf_after.depth, surf.depth);
        assert_eq!(model.time(), 0.0);
        assert_eq!(model.steps(), 0);
    }

    #[test]
    fn test_run_until_lands_on_end_time() {
        let mut config = closed_config();
        config.physics.shallow_water = false;
        let mut model = CoupledModel::builder(config)
            .build(Box::new(SerialTransport))
            .unwrap();

        let mut times = Vec::new();
        let steps = model.run_until(2.5, |r| times.push(r.time)).unwrap();
        assert_eq!(model.time(), 2.5);
        assert_eq!(times.last(), Some(&2.5));
        assert!(times.iter().all(|&t| t <= 2.5), "{:?}", times);
        assert_eq!(steps, times.len());
        assert!(steps >= 3);
    }
}
