// crates/hc_physics/tests/properties.rs

//! 性质测试
//!
//! - 封闭无源时总水量守恒（含损失）
//! - 已在界内的状态再分配不变
//! - 无流/定水头边界下地下矩阵对称
//! - 时间步建议值在 [dt_min, dt_max] 内，全局最小值不超过任一本地值

use hc_config::{BoundaryConfig, FaceCode, GridConfig, ModelConfig, TimeConfig};
use hc_physics::coupling::CouplingBuffer;
use hc_physics::engine::{AdaptiveStepController, CoupledModel, InitialCondition};
use hc_physics::grid::{GridTopology, StructuredGrid3D, Subdomain};
use hc_physics::subsurface::{
    assemble, face_conductivity, finalize_moisture, reallocate, ReallocationOutcome,
    SubsurfaceParams, SubsurfaceSolver, SubsurfaceState,
};
use hc_physics::transport::{LocalCluster, SerialTransport, Transport};

// ============================================================
// 辅助函数
// ============================================================

fn groundwater_config(nx: usize, ny: usize, nz: usize, dz: f64) -> ModelConfig {
    let mut config = ModelConfig {
        grid: GridConfig::uniform(nx, ny, nz, 1.0, 1.0, dz),
        boundary: BoundaryConfig::closed(),
        ..ModelConfig::default()
    };
    config.physics.shallow_water = false;
    config
}

fn build(config: &ModelConfig) -> (StructuredGrid3D, SubsurfaceSolver, CouplingBuffer) {
    let grid = StructuredGrid3D::new(&config.grid, Subdomain::serial(&config.grid)).unwrap();
    let solver = SubsurfaceSolver::new(&grid, config);
    let buf = CouplingBuffer::new(grid.px * grid.py);
    (grid, solver, buf)
}

// ============================================================
// 守恒
// ============================================================

#[test]
fn test_closed_domain_conserves_storage() {
    let mut config = groundwater_config(3, 2, 4, 0.25);
    config.physics.full_3d = true;
    let (grid, mut solver, mut buf) = build(&config);
    let vg = solver.params().vg;
    // 侧向与垂向都不平衡的初始水头
    let mut state = SubsurfaceState::from_head(&grid, &vg, |c| {
        let (gi, _, k) = grid.coords(c);
        -1.5 + 0.3 * gi as f64 + 0.1 * k as f64
    });
    let before = state.total_storage(&grid);

    for step in 0..5 {
        let report = solver
            .step(&grid, &mut state, &mut buf, &SerialTransport, 20.0)
            .unwrap();
        let after = state.total_storage(&grid) + state.total_loss(&grid);
        assert!(
            (before - after).abs() < 1e-10 * before,
            "step {}: {} vs {} ({:?})",
            step,
            before,
            after,
            report.reallocation
        );
    }
}

#[test]
fn test_closed_coupled_model_conserves_budget() {
    let mut config = ModelConfig {
        grid: GridConfig::uniform(4, 3, 3, 2.0, 2.0, 0.3),
        boundary: BoundaryConfig::closed(),
        ..ModelConfig::default()
    };
    config.time.dt_init = 2.0;
    let mut model = CoupledModel::builder(config)
        .initial(InitialCondition {
            water_table: 0.4,
            ponding_depth: 0.01,
        })
        .build(Box::new(SerialTransport))
        .unwrap();
    let before = model.water_budget().unwrap();
    for _ in 0..4 {
        model.advance().unwrap();
    }
    let after = model.water_budget().unwrap();
    assert!(
        (before.total() - after.total()).abs() < 1e-6 * before.total(),
        "{:?} -> {:?}",
        before,
        after
    );
}

// ============================================================
// 再分配幂等
// ============================================================

#[test]
fn test_reallocation_leaves_valid_state_unchanged() {
    let mut config = groundwater_config(3, 3, 3, 0.5);
    config.physics.full_3d = true;
    let (grid, solver, mut buf) = build(&config);
    let params = solver.params().clone();
    let mut state = SubsurfaceState::hydrostatic(&grid, &params.vg, 0.6);
    face_conductivity(&grid, &params, &mut state, &buf);
    let before = state.clone();

    let outcome = reallocate(&grid, &params, &mut state, &mut buf, 10.0);
    let clipped = finalize_moisture(&grid, &params, &mut state);

    assert_eq!(outcome, ReallocationOutcome::default());
    assert_eq!(clipped, 0.0);
    for &c in grid.interior_cells() {
        assert_eq!(state.wc[c], before.wc[c], "cell {}", c);
        assert_eq!(state.h[c], before.h[c]);
        assert_eq!(state.qx[c], before.qx[c]);
        assert_eq!(state.qy[c], before.qy[c]);
        assert_eq!(state.qz[c], before.qz[c]);
        assert_eq!(state.vloss[c], before.vloss[c]);
    }
}

// ============================================================
// 矩阵对称
// ============================================================

fn transposed_pairs_match(config: &ModelConfig) {
    let (grid, solver, buf) = build(config);
    let params: SubsurfaceParams = solver.params().clone();
    let mut state = SubsurfaceState::from_head(&grid, &params.vg, |c| {
        let (gi, gj, k) = grid.coords(c);
        -0.8 + 0.2 * gi as f64 - 0.1 * gj as f64 + 0.25 * k as f64
    });
    face_conductivity(&grid, &params, &mut state, &buf);
    let sys = assemble(&grid, &params, &state, &buf, 30.0);
    assert!(sys.matrix.is_symmetric(1e-14));
    for r in 0..sys.n_rows() {
        for (c, v) in sys.matrix.row(r).iter() {
            assert_eq!(sys.matrix.get(c, r), v, "A[{},{}] != A[{},{}]", r, c, c, r);
        }
    }
}

#[test]
fn test_matrix_symmetric_with_no_flow_faces() {
    let mut config = groundwater_config(3, 2, 4, 0.2);
    config.physics.full_3d = true;
    transposed_pairs_match(&config);
}

#[test]
fn test_matrix_symmetric_with_fixed_head_faces() {
    let mut config = groundwater_config(2, 3, 3, 0.4);
    config.boundary.x_minus = FaceCode::FixedHead;
    config.boundary.bottom = FaceCode::FixedHead;
    config.boundary.top = FaceCode::FixedHead;
    config.boundary.head_top = -0.2;
    config.boundary.head_bottom = 0.5;
    transposed_pairs_match(&config);
}

// ============================================================
// 时间步界限
// ============================================================

fn time_config() -> TimeConfig {
    TimeConfig {
        dt_init: 5.0,
        dt_min: 0.5,
        dt_max: 50.0,
        ..TimeConfig::default()
    }
}

#[test]
fn test_proposals_stay_within_bounds() {
    let mut controller = AdaptiveStepController::from_config(&time_config());
    for dt in [0.1, 0.5, 3.0, 49.0, 50.0, 500.0] {
        controller.set_dt(dt);
        for dq in [0.0, 0.005, 0.015, 0.5, 10.0] {
            for courant in [1e-6, 0.7, 20.0, f64::INFINITY] {
                let next = controller.propose(dq, courant);
                assert!(
                    (0.5..=50.0).contains(&next),
                    "dt={} dq={} Co={} -> {}",
                    dt,
                    dq,
                    courant,
                    next
                );
            }
        }
    }
}

#[test]
fn test_distributed_minimum_bounds_every_rank() {
    let endpoints = LocalCluster::new(4);
    let results: Vec<(f64, f64)> = std::thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .iter()
            .map(|t| {
                s.spawn(move || {
                    let controller = AdaptiveStepController::from_config(&time_config());
                    // 每个子域的 Courant 上限不同
                    let courant = 2.0 + 7.0 * t.rank() as f64;
                    let local = controller.propose(0.0, courant);
                    let global = t.reduce_min(local).unwrap();
                    (local, global)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let global = results[0].1;
    assert_eq!(global, 2.0);
    for &(local, g) in &results {
        assert_eq!(g, global);
        assert!(g <= local);
        assert!((0.5..=50.0).contains(&g));
    }
}

#[test]
fn test_distributed_model_steps_in_lockstep() {
    let mut config = groundwater_config(4, 2, 3, 0.3);
    config.grid.npx = 2;
    config.physics.full_3d = true;
    config.time.dt_init = 5.0;
    let endpoints = LocalCluster::new(2);

    let reports: Vec<Vec<(f64, f64)>> = std::thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|t| {
                let config = config.clone();
                s.spawn(move || {
                    let mut model = CoupledModel::builder(config)
                        .initial(InitialCondition {
                            water_table: 0.5,
                            ponding_depth: 0.0,
                        })
                        .build(Box::new(t))
                        .unwrap();
                    let before = model.water_budget().unwrap().total();
                    let mut out = Vec::new();
                    for _ in 0..3 {
                        let report = model.advance().unwrap();
                        out.push((report.dt, report.next_dt));
                    }
                    let after = model.water_budget().unwrap().total();
                    assert!((before - after).abs() < 1e-9 * before);
                    out
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(reports[0], reports[1]);
}
