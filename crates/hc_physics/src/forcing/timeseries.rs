// crates/hc_physics/src/forcing/timeseries.rs

//! 时间序列与插值
//!
//! 区间内线性插值，区间外按外推模式处理：
//!
//! ```text
//! Clamp   t < t0 → v0,  t > tn → vn
//! Linear  沿首/末两点斜率延伸
//! Cyclic  t → t0 + (t - t0) mod (tn - t0)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

/// 外推模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrapolationMode {
    /// 截断到边界值
    #[default]
    Clamp,
    /// 边界斜率线性外推
    Linear,
    /// 周期重复（潮汐、日变化）
    Cyclic,
}

/// 时间序列
///
/// 时间严格单调递增，时间与值等长且非空。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
    #[serde(default)]
    extrapolation: ExtrapolationMode,
}

impl TimeSeries {
    /// 由时间与值数组创建
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> PhysicsResult<Self> {
        let series = Self {
            times,
            values,
            extrapolation: ExtrapolationMode::Clamp,
        };
        series.validate()?;
        Ok(series)
    }

    /// 由 (时间, 值) 点对创建
    pub fn from_points(points: Vec<(f64, f64)>) -> PhysicsResult<Self> {
        let (times, values) = points.into_iter().unzip();
        Self::new(times, values)
    }

    /// 常数序列
    pub fn constant(value: f64) -> Self {
        Self {
            times: vec![0.0],
            values: vec![value],
            extrapolation: ExtrapolationMode::Clamp,
        }
    }

    /// 设置外推模式
    pub fn with_extrapolation(mut self, mode: ExtrapolationMode) -> Self {
        self.extrapolation = mode;
        self
    }

    /// 外推模式
    pub fn extrapolation(&self) -> ExtrapolationMode {
        self.extrapolation
    }

    /// 检查数据（反序列化后调用）
    pub fn validate(&self) -> PhysicsResult<()> {
        if self.times.is_empty() {
            return Err(PhysicsError::InvalidForcing("时间序列为空".into()));
        }
        PhysicsError::check_size("values", self.times.len(), self.values.len())?;
        if let Some(w) = self.times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(PhysicsError::InvalidForcing(format!(
                "时间必须严格递增: {} 之后为 {}",
                w[0], w[1]
            )));
        }
        if self.times.iter().chain(&self.values).any(|v| !v.is_finite()) {
            return Err(PhysicsError::InvalidForcing("时间序列含非有限值".into()));
        }
        Ok(())
    }

    /// 时间范围
    pub fn time_range(&self) -> (f64, f64) {
        (self.times[0], self.times[self.times.len() - 1])
    }

    /// 数据点数
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// `t` 时刻的值
    pub fn value(&self, t: f64) -> f64 {
        let (t0, tn) = self.time_range();
        if t >= t0 && t <= tn {
            return self.interpolate(t);
        }
        let n = self.values.len();
        match self.extrapolation {
            ExtrapolationMode::Clamp => {
                if t < t0 {
                    self.values[0]
                } else {
                    self.values[n - 1]
                }
            }
            ExtrapolationMode::Cyclic => {
                let period = tn - t0;
                if period < 1e-12 {
                    return self.values[0];
                }
                self.interpolate(t0 + (t - t0).rem_euclid(period))
            }
            ExtrapolationMode::Linear => {
                if n < 2 {
                    return self.values[0];
                }
                let (i, base) = if t < t0 { (0, t0) } else { (n - 2, tn) };
                let slope =
                    (self.values[i + 1] - self.values[i]) / (self.times[i + 1] - self.times[i]);
                let anchor = if t < t0 { self.values[0] } else { self.values[n - 1] };
                anchor + slope * (t - base)
            }
        }
    }

    /// 区间内插值（t 已在范围内）
    fn interpolate(&self, t: f64) -> f64 {
        // 第一个 times[i] > t 的位置
        let upper = self.times.partition_point(|&ti| ti <= t);
        if upper == 0 {
            return self.values[0];
        }
        if upper >= self.times.len() {
            return self.values[self.values.len() - 1];
        }
        let (t0, t1) = (self.times[upper - 1], self.times[upper]);
        let (v0, v1) = (self.values[upper - 1], self.values[upper]);
        v0 + (t - t0) / (t1 - t0) * (v1 - v0)
    }
}
