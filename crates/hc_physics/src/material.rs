// crates/hc_physics/src/material.rs

//! 土壤水力闭合关系（van Genuchten–Mualem）
//!
//! 全部为纯函数：`θ(h)`、`h(θ)`、`K(θ)`、`C(h) = ∂θ/∂h`、`∂K/∂θ`。
//! 水头为压力水头，非饱和时为负值。

use hc_config::SoilConfig;
use serde::{Deserialize, Serialize};

/// 有效饱和度下限（避免 h(θ) 与 ∂K/∂θ 发散）
const SE_MIN: f64 = 1e-6;
/// 有效饱和度上限
const SE_MAX: f64 = 1.0 - 1e-9;

/// van Genuchten–Mualem 参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VanGenuchten {
    /// α [1/m]
    pub alpha: f64,
    /// n
    pub n: f64,
    /// m = 1 - 1/n
    pub m: f64,
    /// 饱和含水量
    pub wcs: f64,
    /// 残余含水量
    pub wcr: f64,
}

impl VanGenuchten {
    /// 构造
    pub fn new(alpha: f64, n: f64, wcs: f64, wcr: f64) -> Self {
        Self {
            alpha,
            n,
            m: 1.0 - 1.0 / n,
            wcs,
            wcr,
        }
    }

    /// 从土壤配置构造
    pub fn from_config(soil: &SoilConfig) -> Self {
        Self::new(soil.alpha, soil.n_vg, soil.wcs, soil.wcr)
    }

    /// 有效饱和度 Se ∈ [0, 1]
    #[inline]
    pub fn effective_saturation(&self, wc: f64) -> f64 {
        ((wc - self.wcr) / (self.wcs - self.wcr)).clamp(0.0, 1.0)
    }

    /// θ(h)
    pub fn moisture_from_head(&self, h: f64) -> f64 {
        if h >= 0.0 {
            return self.wcs;
        }
        let se = (1.0 + (self.alpha * h.abs()).powf(self.n)).powf(-self.m);
        self.wcr + (self.wcs - self.wcr) * se
    }

    /// h(θ)，θ ≥ θs 时为 0
    pub fn head_from_moisture(&self, wc: f64) -> f64 {
        let se = self.effective_saturation(wc);
        if se >= 1.0 {
            return 0.0;
        }
        let se = se.max(SE_MIN);
        -(se.powf(-1.0 / self.m) - 1.0).powf(1.0 / self.n) / self.alpha
    }

    /// K(θ) = Ks · Se^½ · [1 - (1 - Se^{1/m})^m]²
    pub fn conductivity(&self, ks: f64, wc: f64) -> f64 {
        let se = self.effective_saturation(wc);
        if se >= 1.0 {
            return ks;
        }
        if se <= 0.0 {
            return 0.0;
        }
        let f = 1.0 - (1.0 - se.powf(1.0 / self.m)).powf(self.m);
        ks * se.sqrt() * f * f
    }

    /// 比水容量 C(h) = ∂θ/∂h
    pub fn capacity(&self, h: f64) -> f64 {
        if h >= 0.0 {
            return 0.0;
        }
        let ah = self.alpha * h.abs();
        (self.wcs - self.wcr)
            * self.alpha
            * self.m
            * self.n
            * ah.powf(self.n - 1.0)
            * (1.0 + ah.powf(self.n)).powf(-self.m - 1.0)
    }

    /// ∂K/∂θ（Se 截断到 (0, 1) 内部）
    pub fn conductivity_slope(&self, ks: f64, wc: f64) -> f64 {
        let se = self.effective_saturation(wc).clamp(SE_MIN, SE_MAX);
        let a = se.powf(1.0 / self.m);
        let b = 1.0 - a;
        let f = 1.0 - b.powf(self.m);
        let df = b.powf(self.m - 1.0) * se.powf(1.0 / self.m - 1.0);
        let dk_dse = ks * (0.5 * f * f / se.sqrt() + 2.0 * se.sqrt() * f * df);
        dk_dse / (self.wcs - self.wcr)
    }
}

/// 变密度流修正因子（逐单元）
///
/// 未启用变密度流时全部为 1；启用时由外部输运模块在每步之前写入。
#[derive(Debug, Clone, Default)]
pub struct DensityFactors {
    /// ρ/ρ₀
    pub r_rho: Vec<f64>,
    /// 上一步 ρ/ρ₀
    pub r_rho_prev: Vec<f64>,
    /// μ₀/μ
    pub r_visc: Vec<f64>,
}

impl DensityFactors {
    /// 全部为 1
    pub fn uniform(n: usize) -> Self {
        Self {
            r_rho: vec![1.0; n],
            r_rho_prev: vec![1.0; n],
            r_visc: vec![1.0; n],
        }
    }

    /// K 的修正系数 rρ·rvisc
    #[inline]
    pub fn k_factor(&self, cell: usize) -> f64 {
        self.r_rho[cell] * self.r_visc[cell]
    }

    /// 提交当前密度为上一步
    pub fn commit(&mut self) {
        self.r_rho_prev.copy_from_slice(&self.r_rho);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soil() -> VanGenuchten {
        VanGenuchten::new(1.5, 2.0, 0.4, 0.05)
    }

    #[test]
    fn test_saturated_limits() {
        let vg = soil();
        assert_eq!(vg.moisture_from_head(0.5), 0.4);
        assert_eq!(vg.head_from_moisture(0.4), 0.0);
        assert_eq!(vg.conductivity(1e-5, 0.4), 1e-5);
        assert_eq!(vg.conductivity(1e-5, 0.05), 0.0);
        assert_eq!(vg.capacity(0.1), 0.0);
    }

    #[test]
    fn test_retention_roundtrip() {
        let vg = soil();
        for h in [-0.05, -0.3, -1.0, -5.0] {
            let wc = vg.moisture_from_head(h);
            assert!(wc > vg.wcr && wc < vg.wcs);
            assert!((vg.head_from_moisture(wc) - h).abs() < 1e-8 * h.abs().max(1.0));
        }
    }

    #[test]
    fn test_capacity_matches_finite_difference() {
        let vg = soil();
        let h = -0.7;
        let eps = 1e-6;
        let fd = (vg.moisture_from_head(h + eps) - vg.moisture_from_head(h - eps)) / (2.0 * eps);
        assert!((vg.capacity(h) - fd).abs() < 1e-6);
    }

    #[test]
    fn test_conductivity_slope_matches_finite_difference() {
        let vg = soil();
        let ks = 2e-5;
        let wc = 0.25;
        let eps = 1e-7;
        let fd = (vg.conductivity(ks, wc + eps) - vg.conductivity(ks, wc - eps)) / (2.0 * eps);
        let slope = vg.conductivity_slope(ks, wc);
        assert!(((slope - fd) / fd).abs() < 1e-4);
    }

    #[test]
    fn test_conductivity_monotonic() {
        let vg = soil();
        let mut prev = 0.0;
        for i in 1..=20 {
            let wc = vg.wcr + (vg.wcs - vg.wcr) * i as f64 / 20.0;
            let k = vg.conductivity(1.0, wc);
            assert!(k >= prev);
            prev = k;
        }
    }

    #[test]
    fn test_density_factors() {
        let mut d = DensityFactors::uniform(3);
        d.r_rho[1] = 1.02;
        assert_eq!(d.k_factor(0), 1.0);
        d.commit();
        assert_eq!(d.r_rho_prev[1], 1.02);
    }
}
