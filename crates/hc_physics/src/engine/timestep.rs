// crates/hc_physics/src/engine/timestep.rs

//! 自适应时间步控制
//!
//! 两个约束取小值：
//!
//! - 质量不平衡：单元 `|Σq⁺ - Σq⁻|·dt/dz` 超过上限则缩小，低于下限则放大
//! - Courant 数：非饱和激活单元 `dt ≤ Co_max·dz / (∂K/∂θ)`
//!
//! 结果截断到 `[dt_min, dt_max]` 后在全部子域上取最小值。

use hc_config::TimeConfig;

use crate::error::PhysicsResult;
use crate::grid::{Direction, GridTopology, StructuredGrid3D};
use crate::material::VanGenuchten;
use crate::subsurface::SubsurfaceState;
use crate::transport::Transport;

/// 自适应时间步控制器
#[derive(Debug, Clone)]
pub struct AdaptiveStepController {
    dt: f64,
    dt_min: f64,
    dt_max: f64,
    courant_max: f64,
    shrink: f64,
    growth: f64,
    upper: f64,
    lower: f64,
    enabled: bool,
}

impl AdaptiveStepController {
    /// 从时间配置创建
    pub fn from_config(config: &TimeConfig) -> Self {
        Self {
            dt: config.dt_init.clamp(config.dt_min, config.dt_max),
            dt_min: config.dt_min,
            dt_max: config.dt_max,
            courant_max: config.courant_max,
            shrink: config.shrink_factor,
            growth: config.growth_factor,
            upper: config.imbalance_upper,
            lower: config.imbalance_lower,
            enabled: config.adjust_dt,
        }
    }

    /// 当前时间步
    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// 是否启用自适应
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 最小时间步
    #[inline]
    pub fn dt_min(&self) -> f64 {
        self.dt_min
    }

    /// 设置时间步（截断到合法范围）
    pub fn set_dt(&mut self, dt: f64) {
        self.dt = dt.clamp(self.dt_min, self.dt_max);
    }

    /// 本步不超过 `limit`（对齐结束时刻，不受 dt_min 约束）
    pub fn limit_dt(&mut self, limit: f64) {
        if limit > 0.0 && limit < self.dt {
            self.dt = limit;
        }
    }

    /// 重算前缩小时间步；已在下限时返回 false
    pub fn shrink_for_retry(&mut self) -> bool {
        if self.dt <= self.dt_min {
            return false;
        }
        self.set_dt(self.dt * self.shrink);
        true
    }

    /// 本地最大质量不平衡
    pub fn imbalance(grid: &StructuredGrid3D, state: &SubsurfaceState, dt: f64) -> f64 {
        let mut dq_max = 0.0_f64;
        for &c in grid.interior_cells() {
            if !grid.is_active(c) {
                continue;
            }
            let m = |dir| grid.neighbor(c, dir).unwrap_or(c);
            let (xm, ym, zm) = (m(Direction::XMinus), m(Direction::YMinus), m(Direction::ZMinus));
            let qin = state.qx[c] + state.qy[c] + state.qz[c];
            let qout = state.qx[xm] + state.qy[ym] + state.qz[zm];
            dq_max = dq_max.max((qin - qout).abs() * dt / grid.dz(c));
        }
        dq_max
    }

    /// 本地 Courant 时间步上限（无非饱和单元时为无穷大）
    pub fn courant_limit(
        &self,
        grid: &StructuredGrid3D,
        state: &SubsurfaceState,
        vg: &VanGenuchten,
        ks_z: f64,
    ) -> f64 {
        grid.interior_cells()
            .iter()
            .filter(|&&c| grid.is_active(c) && state.wc[c] < vg.wcs)
            .map(|&c| {
                let slope = vg.conductivity_slope(ks_z, state.wc[c]);
                if slope > 0.0 {
                    self.courant_max * grid.dz(c) / slope
                } else {
                    f64::INFINITY
                }
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// 由本地指标给出下一步的建议值（不修改状态）
    pub fn propose(&self, dq_max: f64, dt_courant: f64) -> f64 {
        let mut dt = self.dt;
        if dq_max > self.upper {
            dt *= self.shrink;
        } else if dq_max < self.lower {
            dt *= self.growth;
        }
        dt = dt.clamp(self.dt_min, self.dt_max);
        dt.min(dt_courant).clamp(self.dt_min, self.dt_max)
    }

    /// 根据刚完成的一步调整时间步，并在全部子域上取最小值
    pub fn adapt(
        &mut self,
        grid: &StructuredGrid3D,
        state: &SubsurfaceState,
        vg: &VanGenuchten,
        ks_z: f64,
        transport: &dyn Transport,
    ) -> PhysicsResult<f64> {
        if !self.enabled {
            return Ok(self.dt);
        }
        let dq_max = Self::imbalance(grid, state, self.dt);
        let dt_courant = self.courant_limit(grid, state, vg, ks_z);
        let local = self.propose(dq_max, dt_courant);
        // 以根子域的归约结果为准
        let global = transport.broadcast(transport.reduce_min(local)?, 0)?;
        log::trace!(
            "时间步: dq_max={:.3e}, dt_Co={:.3e}, 本地 {:.3e}, 全局 {:.3e}",
            dq_max,
            dt_courant,
            local,
            global
        );
        self.dt = global;
        Ok(global)
    }
}
