// crates/hc_physics/src/forcing/mod.rs

//! 时变强迫
//!
//! 潮位、入流、降雨、蒸发和风场都以时间序列给出。每步开始前调用一次
//! [`ForcingSet::update`] 得到快照，核心计算只读快照。
//!
//! 潮位与入流的位置用全局单元坐标 `[i, j]`（0 起）给出，
//! 由 [`ForcingSet::localize`] 映射到各子域的填充下标。

pub mod timeseries;

pub use timeseries::{ExtrapolationMode, TimeSeries};

use std::path::Path;

use glam::DVec2;
use hc_foundation::HcError;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::grid::{CellId, StructuredGrid2D};

/// 潮位边界：一组给定水位的单元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideBoundary {
    /// 全局单元坐标
    pub cells: Vec<[usize; 2]>,
    /// 水位 [m]
    pub elevation: TimeSeries,
}

/// 入流源：流量平均分配到一组单元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflowSource {
    /// 全局单元坐标
    pub cells: Vec<[usize; 2]>,
    /// 流量 [m³/s]
    pub discharge: TimeSeries,
}

/// 全部强迫数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcingSet {
    /// 潮位边界
    pub tides: Vec<TideBoundary>,
    /// 入流源
    pub inflows: Vec<InflowSource>,
    /// 降雨强度 [m/s]
    pub rain: Option<TimeSeries>,
    /// 蒸发强度 [m/s]
    pub evaporation: Option<TimeSeries>,
    /// 风速 [m/s]
    pub wind_speed: Option<TimeSeries>,
    /// 风向 [度]（相对北向）
    pub wind_direction: Option<TimeSeries>,
    /// 北向与 +x 轴夹角 [度]
    pub north_angle: f64,
}

/// 某一时刻的强迫值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForcingSnapshot {
    /// 时刻 [s]
    pub time: f64,
    /// 各潮位边界水位 [m]
    pub tide: Vec<f64>,
    /// 各入流源流量 [m³/s]
    pub inflow: Vec<f64>,
    /// 降雨 [m/s]
    pub rain: f64,
    /// 蒸发 [m/s]
    pub evaporation: f64,
    /// 风速 [m/s]
    pub wind_speed: f64,
    /// 风向 [度]，自 +x 轴起算
    pub wind_direction: f64,
}

impl ForcingSnapshot {
    /// 风速矢量
    pub fn wind_vector(&self) -> DVec2 {
        DVec2::from_angle(self.wind_direction.to_radians()) * self.wind_speed
    }

    /// 是否有风
    #[inline]
    pub fn has_wind(&self) -> bool {
        self.wind_speed != 0.0
    }
}

/// 强迫在本子域的位置映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForcingLayout {
    /// 每个潮位边界落在本子域的单元
    pub tide_cells: Vec<Vec<CellId>>,
    /// 每个入流源落在本子域的单元
    pub inflow_cells: Vec<Vec<CellId>>,
    /// 每个入流源的全局单元数（流量按此均分）
    pub inflow_counts: Vec<usize>,
}

impl ForcingLayout {
    /// 单元是否为潮位单元
    pub fn is_tide_cell(&self, cell: CellId) -> bool {
        self.tide_cells.iter().any(|cells| cells.contains(&cell))
    }

    /// 入流在单元上产生的体积 [m³]（按全局单元数均分）
    pub fn inflow_volume(&self, snapshot: &ForcingSnapshot, cell: CellId, dt: f64) -> f64 {
        self.inflow_cells
            .iter()
            .zip(&self.inflow_counts)
            .zip(&snapshot.inflow)
            .filter(|((cells, _), _)| cells.contains(&cell))
            .map(|((_, &n), &q)| q * dt / n as f64)
            .sum()
    }
}

impl ForcingSet {
    /// 从 JSON 文件读取
    pub fn from_file(path: impl AsRef<Path>) -> PhysicsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PhysicsError::InvalidForcing(format!("读取 {} 失败: {}", path.display(), e))
        })?;
        let set: Self = serde_json::from_str(&text)
            .map_err(|e| PhysicsError::InvalidForcing(format!("解析 {} 失败: {}", path.display(), e)))?;
        set.validate()?;
        Ok(set)
    }

    /// 检查全部序列
    pub fn validate(&self) -> PhysicsResult<()> {
        for tide in &self.tides {
            tide.elevation.validate()?;
            if tide.cells.is_empty() {
                return Err(PhysicsError::InvalidForcing("潮位边界没有单元".into()));
            }
        }
        for inflow in &self.inflows {
            inflow.discharge.validate()?;
            if inflow.cells.is_empty() {
                return Err(PhysicsError::InvalidForcing("入流源没有单元".into()));
            }
        }
        for series in [&self.rain, &self.evaporation, &self.wind_speed, &self.wind_direction]
            .into_iter()
            .flatten()
        {
            series.validate()?;
        }
        HcError::check_range("north_angle", self.north_angle, -360.0, 360.0)?;
        Ok(())
    }

    /// 映射到本子域
    pub fn localize(&self, grid: &StructuredGrid2D) -> ForcingLayout {
        let local = |cells: &[[usize; 2]]| -> Vec<CellId> {
            cells
                .iter()
                .filter_map(|&[gi, gj]| grid.sub.local_of(gi, gj))
                .map(|(pi, pj)| grid.index(pi, pj))
                .collect()
        };
        ForcingLayout {
            tide_cells: self.tides.iter().map(|t| local(&t.cells)).collect(),
            inflow_cells: self.inflows.iter().map(|s| local(&s.cells)).collect(),
            inflow_counts: self.inflows.iter().map(|s| s.cells.len()).collect(),
        }
    }

    /// `t` 时刻的快照
    pub fn update(&self, t: f64) -> ForcingSnapshot {
        let at = |series: &Option<TimeSeries>| series.as_ref().map_or(0.0, |s| s.value(t));
        ForcingSnapshot {
            time: t,
            tide: self.tides.iter().map(|b| b.elevation.value(t)).collect(),
            inflow: self.inflows.iter().map(|s| s.discharge.value(t)).collect(),
            rain: at(&self.rain).max(0.0),
            evaporation: at(&self.evaporation).max(0.0),
            wind_speed: at(&self.wind_speed),
            wind_direction: at(&self.wind_direction) + self.north_angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Subdomain;
    use hc_config::GridConfig;

    fn forcing() -> ForcingSet {
        ForcingSet {
            tides: vec![TideBoundary {
                cells: vec![[0, 0], [0, 1]],
                elevation: TimeSeries::new(vec![0.0, 100.0], vec![1.0, 2.0]).unwrap(),
            }],
            inflows: vec![InflowSource {
                cells: vec![[2, 0], [3, 0]],
                discharge: TimeSeries::constant(4.0),
            }],
            rain: Some(TimeSeries::constant(1e-6)),
            wind_speed: Some(TimeSeries::constant(5.0)),
            wind_direction: Some(TimeSeries::constant(0.0)),
            north_angle: 90.0,
            ..ForcingSet::default()
        }
    }

    #[test]
    fn test_snapshot_values() {
        let snap = forcing().update(50.0);
        assert!((snap.tide[0] - 1.5).abs() < 1e-12);
        assert_eq!(snap.inflow, vec![4.0]);
        assert_eq!(snap.evaporation, 0.0);
        let w = snap.wind_vector();
        assert!(w.x.abs() < 1e-12);
        assert!((w.y - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_layout_splits_inflow_over_global_cells() {
        let config = GridConfig::uniform(4, 2, 1, 1.0, 1.0, 1.0);
        let left = Subdomain::new(&GridConfig { npx: 2, ..config.clone() }, 0).unwrap();
        let grid = StructuredGrid2D::new(&config, left).unwrap();
        let set = forcing();
        let layout = set.localize(&grid);
        assert_eq!(layout.tide_cells[0].len(), 2);
        assert!(layout.inflow_cells[0].is_empty());
        assert_eq!(layout.inflow_counts, vec![2]);

        let right = Subdomain::new(&GridConfig { npx: 2, ..config.clone() }, 1).unwrap();
        let grid = StructuredGrid2D::new(&config, right).unwrap();
        let layout = set.localize(&grid);
        let snap = set.update(0.0);
        let cell = grid.index(1, 1);
        assert!((layout.inflow_volume(&snap, cell, 10.0) - 20.0).abs() < 1e-12);
        assert!(!layout.is_tide_cell(cell));
    }

    #[test]
    fn test_round_trip_json() {
        let set = forcing();
        let text = serde_json::to_string(&set).unwrap();
        let back: ForcingSet = serde_json::from_str(&text).unwrap();
        assert_eq!(back, set);
    }
}
