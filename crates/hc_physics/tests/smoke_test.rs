// crates/hc_physics/tests/smoke_test.rs

//! 耦合模型冒烟测试
//!
//! 从 JSON 文件加载配置与强迫，跑若干步，检查时间步界限与水量去向。

use hc_config::{BoundaryConfig, FaceCode, GridConfig, ModelConfig};
use hc_physics::engine::{CoupledModel, InitialCondition};
use hc_physics::forcing::{ForcingSet, InflowSource, TideBoundary, TimeSeries};
use hc_physics::transport::SerialTransport;

fn base_config() -> ModelConfig {
    let mut config = ModelConfig {
        grid: GridConfig::uniform(4, 4, 4, 2.0, 2.0, 0.25),
        boundary: BoundaryConfig::closed(),
        ..ModelConfig::default()
    };
    config.time.dt_init = 1.0;
    config.time.dt_max = 5.0;
    config
}

#[test]
fn test_rain_on_dry_soil_infiltrates() {
    let config = base_config();
    let forcing = ForcingSet {
        rain: Some(TimeSeries::constant(2e-5)),
        ..ForcingSet::default()
    };
    let mut model = CoupledModel::builder(config)
        .forcing(forcing)
        .initial(InitialCondition {
            water_table: 0.8,
            ponding_depth: 0.0,
        })
        .build(Box::new(SerialTransport))
        .unwrap();
    let before = model.water_budget().unwrap();

    let mut reports = Vec::new();
    let steps = model.run_until(30.0, |r| reports.push(*r)).unwrap();

    assert_eq!(steps, reports.len());
    assert!(model.time() >= 30.0);
    for r in &reports {
        assert!(r.dt >= model.config().time.dt_min && r.dt <= model.config().time.dt_max);
        assert!(r.max_cfl.is_finite());
    }
    let after = model.water_budget().unwrap();
    // 降雨只增加水量
    assert!(after.total() > before.total());
    assert!(after.subsurface + after.surface > before.subsurface + before.surface);
}

#[test]
fn test_groundwater_only_rain_enters_column_top() {
    let mut config = base_config();
    config.physics.shallow_water = false;
    config.boundary.top = FaceCode::FixedFlux;
    let forcing = ForcingSet {
        rain: Some(TimeSeries::constant(1e-6)),
        ..ForcingSet::default()
    };
    let mut model = CoupledModel::builder(config)
        .forcing(forcing)
        .build(Box::new(SerialTransport))
        .unwrap();
    let before = model.water_budget().unwrap().subsurface;
    for _ in 0..5 {
        model.advance().unwrap();
    }
    let after = model.water_budget().unwrap().subsurface;
    assert!(after > before, "{} -> {}", before, after);
}

#[test]
fn test_tide_and_inflow_drive_surface_flow() {
    let mut config = base_config();
    config.physics.groundwater = false;
    let forcing = ForcingSet {
        tides: vec![TideBoundary {
            cells: vec![[0, 0], [0, 1], [0, 2], [0, 3]],
            elevation: TimeSeries::from_points(vec![(0.0, 0.1), (20.0, 0.3)]).unwrap(),
        }],
        inflows: vec![InflowSource {
            cells: vec![[3, 3]],
            discharge: TimeSeries::constant(0.01),
        }],
        ..ForcingSet::default()
    };
    let mut model = CoupledModel::builder(config)
        .forcing(forcing)
        .initial(InitialCondition {
            water_table: 1.0,
            ponding_depth: 0.1,
        })
        .build(Box::new(SerialTransport))
        .unwrap();
    let before = model.water_budget().unwrap().surface;
    for _ in 0..10 {
        model.advance().unwrap();
    }
    let state = model.surface_state().unwrap();
    let after = model.water_budget().unwrap().surface;
    assert!(after > before);
    assert!(state.u.iter().any(|&u| u != 0.0));
    assert!(state.eta.iter().all(|e| e.is_finite()));
}

#[test]
fn test_inputs_load_from_json_files() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("model.json");
    let forcing_path = dir.path().join("forcing.json");

    base_config().save_to_file(&config_path).unwrap();
    let forcing = ForcingSet {
        rain: Some(TimeSeries::from_points(vec![(0.0, 0.0), (10.0, 1e-5)]).unwrap()),
        ..ForcingSet::default()
    };
    std::fs::write(&forcing_path, serde_json::to_string_pretty(&forcing).unwrap()).unwrap();

    let config = ModelConfig::from_file(&config_path).unwrap();
    let loaded = ForcingSet::from_file(&forcing_path).unwrap();
    assert_eq!(loaded, forcing);

    let mut model = CoupledModel::builder(config)
        .forcing(loaded)
        .build(Box::new(SerialTransport))
        .unwrap();
    let report = model.advance().unwrap();
    assert!(report.dt > 0.0);
    assert!(!report.summary().is_empty());
}
