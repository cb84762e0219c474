// crates/hc_physics/src/coupling.rs

//! 地表-地下耦合缓冲
//!
//! 两个求解器之间只通过逐柱的缓冲交换信息：
//!
//! ```text
//! 地表 ──depth──▶ 缓冲 ──▶ 地下（积水柱顶边界）
//! 地下 ──seepage/ponding──▶ 缓冲 ──▶ 地表水位（subsurface source）
//! ```
//!
//! 渗出量按“单位面积体积”[m] 累积，因此变步长下仍然守恒。

use serde::{Deserialize, Serialize};

use crate::grid::StructuredGrid2D;

/// 逐柱耦合缓冲（长度为二维填充数组长度）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouplingBuffer {
    /// 地表水深 [m]
    pub depth: Vec<f64>,
    /// 柱顶给定通量 [m/s]（正为蒸发）
    pub qtop: Vec<f64>,
    /// 累积渗出量 [m]（正为地下进入地表）
    pub seepage: Vec<f64>,
    /// 再分配直接推入/抽取的地表水深 [m]
    pub ponding: Vec<f64>,
    reset: Vec<bool>,
}

impl CouplingBuffer {
    /// 创建
    pub fn new(n_columns: usize) -> Self {
        Self {
            depth: vec![0.0; n_columns],
            qtop: vec![0.0; n_columns],
            seepage: vec![0.0; n_columns],
            ponding: vec![0.0; n_columns],
            reset: vec![false; n_columns],
        }
    }

    /// 柱数
    #[inline]
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    /// 柱顶是否积水
    #[inline]
    pub fn is_ponded(&self, column: usize) -> bool {
        self.depth[column] > 0.0
    }

    /// 读入地表水深
    pub fn load_surface_depth(&mut self, depth: &[f64]) {
        self.depth.copy_from_slice(depth);
    }

    /// 设置统一的柱顶通量
    pub fn set_top_flux(&mut self, qtop: f64) {
        self.qtop.fill(qtop);
    }

    /// 记录一次柱顶交换 [m]
    ///
    /// 上一次累积量已被地表消费时先清零。
    pub fn record_seepage(&mut self, column: usize, depth: f64) {
        if self.reset[column] {
            self.seepage[column] = 0.0;
            self.reset[column] = false;
        }
        self.seepage[column] += depth;
    }

    /// 再分配推入（正）或抽取（负）的地表水深
    #[inline]
    pub fn add_ponding(&mut self, column: usize, depth: f64) {
        self.ponding[column] += depth;
    }

    /// 当前可用于抽取的地表水深
    #[inline]
    pub fn available_depth(&self, column: usize) -> f64 {
        (self.depth[column] + self.ponding[column]).max(0.0)
    }

    /// 把累积交换量施加到地表水位，返回施加的总体积 [m³]
    ///
    /// 入渗（负）立即施加；渗出超过 `min_depth` 才施加，否则继续累积。
    pub fn apply_to_surface(
        &mut self,
        grid: &StructuredGrid2D,
        eta: &mut [f64],
        min_depth: f64,
    ) -> f64 {
        let area = grid.area();
        let mut applied = 0.0;
        for &cell in grid.interior_cells() {
            let mut delta = std::mem::take(&mut self.ponding[cell]);
            if !self.reset[cell] {
                let s = self.seepage[cell];
                if s < 0.0 || s > min_depth {
                    delta += s;
                    self.reset[cell] = true;
                }
            }
            if delta != 0.0 {
                eta[cell] += delta;
                applied += delta * area;
            }
        }
        applied
    }

    /// 尚未施加到地表的体积 [m³]
    pub fn pending_volume(&self, grid: &StructuredGrid2D) -> f64 {
        grid.interior_cells()
            .iter()
            .map(|&c| {
                let s = if self.reset[c] { 0.0 } else { self.seepage[c] };
                (s + self.ponding[c]) * grid.area()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Subdomain;
    use hc_config::GridConfig;

    fn grid() -> StructuredGrid2D {
        let config = GridConfig::uniform(2, 1, 1, 1.0, 1.0, 1.0);
        StructuredGrid2D::new(&config, Subdomain::serial(&config)).unwrap()
    }

    #[test]
    fn test_small_seepage_accumulates() {
        let g = grid();
        let c = g.index(1, 1);
        let mut buf = CouplingBuffer::new(g.px * g.py);
        let mut eta = vec![0.0; g.px * g.py];

        buf.record_seepage(c, 0.0004);
        assert_eq!(buf.apply_to_surface(&g, &mut eta, 0.001), 0.0);
        buf.record_seepage(c, 0.0008);
        let applied = buf.apply_to_surface(&g, &mut eta, 0.001);
        assert!((eta[c] - 0.0012).abs() < 1e-15);
        assert!((applied - 0.0012).abs() < 1e-15);

        // 已消费：下一次记录从零开始
        buf.record_seepage(c, 0.0002);
        assert!((buf.seepage[c] - 0.0002).abs() < 1e-15);
    }

    #[test]
    fn test_infiltration_applied_immediately() {
        let g = grid();
        let c = g.index(2, 1);
        let mut buf = CouplingBuffer::new(g.px * g.py);
        let mut eta = vec![0.1; g.px * g.py];
        buf.record_seepage(c, -0.00001);
        buf.add_ponding(c, 0.002);
        buf.apply_to_surface(&g, &mut eta, 0.001);
        assert!((eta[c] - (0.1 - 0.00001 + 0.002)).abs() < 1e-15);
        assert_eq!(buf.ponding[c], 0.0);
        assert_eq!(buf.pending_volume(&g), 0.0);
    }
}
