// crates/hc_config/src/model_config.rs

//! ModelConfig - 耦合模型配置（全 f64）
//!
//! 运行期只读参数。物理核心除自适应时间步长外不修改任何配置项。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::ConfigError;

/// 耦合模型配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 网格与分区
    #[serde(default)]
    pub grid: GridConfig,
    /// 时间步控制
    #[serde(default)]
    pub time: TimeConfig,
    /// 线性求解器
    #[serde(default)]
    pub solver: SolverSettings,
    /// 土壤水力参数
    #[serde(default)]
    pub soil: SoilConfig,
    /// 地表水参数
    #[serde(default)]
    pub surface: SurfaceConfig,
    /// 地下水边界代码
    #[serde(default)]
    pub boundary: BoundaryConfig,
    /// 物理过程开关
    #[serde(default)]
    pub physics: PhysicsSwitches,
}

// ============================================================
// 网格
// ============================================================

/// 结构化网格配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// x 方向全局单元数
    #[serde(default = "default_nx")]
    pub nx: usize,
    /// y 方向全局单元数
    #[serde(default = "default_ny")]
    pub ny: usize,
    /// 垂向层数（自上而下）
    #[serde(default = "default_nz")]
    pub nz: usize,
    /// x 方向网格间距 [m]
    #[serde(default = "default_spacing")]
    pub dx: f64,
    /// y 方向网格间距 [m]
    #[serde(default = "default_spacing")]
    pub dy: f64,
    /// 各层厚度 [m]，长度必须等于 nz
    #[serde(default = "default_dz")]
    pub dz: Vec<f64>,
    /// x 方向子域数
    #[serde(default = "default_one")]
    pub npx: usize,
    /// y 方向子域数
    #[serde(default = "default_one")]
    pub npy: usize,
}

fn default_nx() -> usize { 8 }
fn default_ny() -> usize { 8 }
fn default_nz() -> usize { 10 }
fn default_spacing() -> f64 { 1.0 }
fn default_dz() -> Vec<f64> { vec![0.1; default_nz()] }
fn default_one() -> usize { 1 }

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nx: default_nx(),
            ny: default_ny(),
            nz: default_nz(),
            dx: default_spacing(),
            dy: default_spacing(),
            dz: default_dz(),
            npx: default_one(),
            npy: default_one(),
        }
    }
}

impl GridConfig {
    /// 均匀层厚网格
    pub fn uniform(nx: usize, ny: usize, nz: usize, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            nx,
            ny,
            nz,
            dx,
            dy,
            dz: vec![dz; nz],
            npx: 1,
            npy: 1,
        }
    }

    /// 子域总数
    pub fn n_subdomains(&self) -> usize {
        self.npx * self.npy
    }
}

// ============================================================
// 时间步
// ============================================================

/// 时间步控制配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// 初始时间步长 [s]
    #[serde(default = "default_dt_init")]
    pub dt_init: f64,
    /// 最小时间步长 [s]
    #[serde(default = "default_dt_min")]
    pub dt_min: f64,
    /// 最大时间步长 [s]
    #[serde(default = "default_dt_max")]
    pub dt_max: f64,
    /// 模拟结束时间 [s]
    #[serde(default = "default_t_end")]
    pub t_end: f64,
    /// 非饱和区 Courant 数上限
    #[serde(default = "default_courant_max")]
    pub courant_max: f64,
    /// 是否启用自适应时间步
    #[serde(default = "default_true")]
    pub adjust_dt: bool,
    /// 收缩因子
    #[serde(default = "default_shrink")]
    pub shrink_factor: f64,
    /// 增长因子
    #[serde(default = "default_growth")]
    pub growth_factor: f64,
    /// 含水量变化上阈值（超过则收缩）
    #[serde(default = "default_imbalance_upper")]
    pub imbalance_upper: f64,
    /// 含水量变化下阈值（低于则增长）
    #[serde(default = "default_imbalance_lower")]
    pub imbalance_lower: f64,
    /// 单步最大重算次数
    #[serde(default = "default_one")]
    pub max_step_retries: usize,
}

fn default_dt_init() -> f64 { 1.0 }
fn default_dt_min() -> f64 { 1e-3 }
fn default_dt_max() -> f64 { 60.0 }
fn default_t_end() -> f64 { 3600.0 }
fn default_courant_max() -> f64 { 1.0 }
fn default_true() -> bool { true }
fn default_shrink() -> f64 { 0.9 }
fn default_growth() -> f64 { 1.1 }
fn default_imbalance_upper() -> f64 { 0.02 }
fn default_imbalance_lower() -> f64 { 0.01 }

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            dt_init: default_dt_init(),
            dt_min: default_dt_min(),
            dt_max: default_dt_max(),
            t_end: default_t_end(),
            courant_max: default_courant_max(),
            adjust_dt: default_true(),
            shrink_factor: default_shrink(),
            growth_factor: default_growth(),
            imbalance_upper: default_imbalance_upper(),
            imbalance_lower: default_imbalance_lower(),
            max_step_retries: default_one(),
        }
    }
}

// ============================================================
// 线性求解器
// ============================================================

/// 预条件器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionerKind {
    /// 无预条件
    Identity,
    /// Jacobi 对角预条件
    Jacobi,
    /// 对称逐次超松弛
    #[default]
    Ssor,
}

/// 线性求解器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSettings {
    /// 相对收敛容差
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    /// 绝对收敛容差
    #[serde(default = "default_atol")]
    pub atol: f64,
    /// 最大迭代次数
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// 预条件器
    #[serde(default)]
    pub preconditioner: PreconditionerKind,
    /// SSOR 松弛因子
    #[serde(default = "default_omega")]
    pub omega: f64,
    /// 输出每次迭代残差
    #[serde(default)]
    pub verbose: bool,
}

fn default_rtol() -> f64 { 1e-8 }
fn default_atol() -> f64 { 1e-14 }
fn default_max_iter() -> usize { 2000 }
fn default_omega() -> f64 { 1.0 }

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            rtol: default_rtol(),
            atol: default_atol(),
            max_iter: default_max_iter(),
            preconditioner: PreconditionerKind::default(),
            omega: default_omega(),
            verbose: false,
        }
    }
}

// ============================================================
// 土壤
// ============================================================

/// van Genuchten–Mualem 土壤参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilConfig {
    /// 进气值倒数 α [1/m]
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// 形状参数 n（> 1）
    #[serde(default = "default_n_vg")]
    pub n_vg: f64,
    /// x 方向饱和渗透系数 [m/s]
    #[serde(default = "default_ks")]
    pub ks_x: f64,
    /// y 方向饱和渗透系数 [m/s]
    #[serde(default = "default_ks")]
    pub ks_y: f64,
    /// z 方向饱和渗透系数 [m/s]
    #[serde(default = "default_ks")]
    pub ks_z: f64,
    /// 饱和含水量
    #[serde(default = "default_wcs")]
    pub wcs: f64,
    /// 残余含水量
    #[serde(default = "default_wcr")]
    pub wcr: f64,
    /// 贮水率 [1/m]
    #[serde(default = "default_ss")]
    pub specific_storage: f64,
    /// 积水/定水头顶面使用的渗透系数 [m/s]
    #[serde(default = "default_ks")]
    pub ks_surface: f64,
}

fn default_alpha() -> f64 { 1.0 }
fn default_n_vg() -> f64 { 2.0 }
fn default_ks() -> f64 { 1e-5 }
fn default_wcs() -> f64 { 0.4 }
fn default_wcr() -> f64 { 0.05 }
fn default_ss() -> f64 { 1e-5 }

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            n_vg: default_n_vg(),
            ks_x: default_ks(),
            ks_y: default_ks(),
            ks_z: default_ks(),
            wcs: default_wcs(),
            wcr: default_wcr(),
            specific_storage: default_ss(),
            ks_surface: default_ks(),
        }
    }
}

// ============================================================
// 地表水
// ============================================================

/// 二维浅水参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// 重力加速度 [m/s²]
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    /// Manning 糙率系数
    #[serde(default = "default_manning")]
    pub manning: f64,
    /// 最小有效水深 [m]
    #[serde(default = "default_min_depth")]
    pub min_depth: f64,
    /// x 方向水平粘性系数 [m²/s]
    #[serde(default)]
    pub viscosity_x: f64,
    /// y 方向水平粘性系数 [m²/s]
    #[serde(default)]
    pub viscosity_y: f64,
    /// 拖曳系数公式切换水深 [m]
    #[serde(default = "default_drag_transition")]
    pub drag_transition_depth: f64,
    /// 跌水/薄层判定水深 [m]
    #[serde(default = "default_waterfall_depth")]
    pub waterfall_depth: f64,
    /// 空气密度 [kg/m³]
    #[serde(default = "default_rho_air")]
    pub rho_air: f64,
    /// 水密度 [kg/m³]
    #[serde(default = "default_rho_water")]
    pub rho_water: f64,
    /// 风拖曳系数
    #[serde(default = "default_wind_drag")]
    pub wind_drag: f64,
    /// 薄层风应力衰减系数
    #[serde(default = "default_wind_thin_layer")]
    pub wind_thin_layer: f64,
    /// 扩散波近似（忽略惯性项）
    #[serde(default)]
    pub diffusive_wave: bool,
    /// 是否计算对流项
    #[serde(default = "default_true")]
    pub advection: bool,
}

fn default_gravity() -> f64 { 9.81 }
fn default_manning() -> f64 { 0.03 }
fn default_min_depth() -> f64 { 1e-4 }
fn default_drag_transition() -> f64 { 0.1 }
fn default_waterfall_depth() -> f64 { 1e-3 }
fn default_rho_air() -> f64 { 1.225 }
fn default_rho_water() -> f64 { 1000.0 }
fn default_wind_drag() -> f64 { 1.3e-3 }
fn default_wind_thin_layer() -> f64 { 1.0 }

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            manning: default_manning(),
            min_depth: default_min_depth(),
            viscosity_x: 0.0,
            viscosity_y: 0.0,
            drag_transition_depth: default_drag_transition(),
            waterfall_depth: default_waterfall_depth(),
            rho_air: default_rho_air(),
            rho_water: default_rho_water(),
            wind_drag: default_wind_drag(),
            wind_thin_layer: default_wind_thin_layer(),
            diffusive_wave: false,
            advection: default_true(),
        }
    }
}

// ============================================================
// 边界
// ============================================================

/// 地下水边界面代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FaceCode {
    /// 零通量
    #[default]
    NoFlow = 0,
    /// 定水头
    FixedHead = 1,
    /// 定通量
    FixedFlux = 2,
    /// 自由排水（单位梯度）
    FreeDrainage = 3,
}

impl FaceCode {
    /// 从 u8 值转换
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NoFlow),
            1 => Some(Self::FixedHead),
            2 => Some(Self::FixedFlux),
            3 => Some(Self::FreeDrainage),
            _ => None,
        }
    }

    /// 转换为 u8 值
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否封闭
    #[inline]
    pub fn is_closed(self) -> bool {
        self == Self::NoFlow
    }
}

impl fmt::Display for FaceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoFlow => "NoFlow",
            Self::FixedHead => "FixedHead",
            Self::FixedFlux => "FixedFlux",
            Self::FreeDrainage => "FreeDrainage",
        };
        write!(f, "{}", name)
    }
}

/// 地下水六个外表面的边界配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// +x 侧面
    #[serde(default)]
    pub x_plus: FaceCode,
    /// -x 侧面
    #[serde(default)]
    pub x_minus: FaceCode,
    /// +y 侧面
    #[serde(default)]
    pub y_plus: FaceCode,
    /// -y 侧面
    #[serde(default)]
    pub y_minus: FaceCode,
    /// 底面
    #[serde(default)]
    pub bottom: FaceCode,
    /// 顶面
    #[serde(default = "default_top_code")]
    pub top: FaceCode,
    /// 顶面定水头 [m]
    #[serde(default)]
    pub head_top: f64,
    /// 底面定水头 [m]
    #[serde(default)]
    pub head_bottom: f64,
    /// 顶面通量 [m/s]，正值为蒸发（向上流出）
    #[serde(default)]
    pub flux_top: f64,
    /// 底面通量 [m/s]，正值为向上补给
    #[serde(default)]
    pub flux_bottom: f64,
}

fn default_top_code() -> FaceCode { FaceCode::FixedFlux }

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            x_plus: FaceCode::NoFlow,
            x_minus: FaceCode::NoFlow,
            y_plus: FaceCode::NoFlow,
            y_minus: FaceCode::NoFlow,
            bottom: FaceCode::NoFlow,
            top: default_top_code(),
            head_top: 0.0,
            head_bottom: 0.0,
            flux_top: 0.0,
            flux_bottom: 0.0,
        }
    }
}

impl BoundaryConfig {
    /// 六面全部封闭
    pub fn closed() -> Self {
        Self {
            top: FaceCode::NoFlow,
            ..Self::default()
        }
    }
}

// ============================================================
// 物理开关
// ============================================================

/// 物理过程开关
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsSwitches {
    /// 计算地下水
    #[serde(default = "default_true")]
    pub groundwater: bool,
    /// 计算地表浅水
    #[serde(default = "default_true")]
    pub shallow_water: bool,
    /// 非饱和区保留侧向流动
    #[serde(default)]
    pub full_3d: bool,
    /// 使用通量校正步更新含水量
    #[serde(default = "default_true")]
    pub use_corrector: bool,
    /// 越界含水量再分配
    #[serde(default = "default_true")]
    pub reallocate: bool,
    /// 饱和锋面水头/含水量一致化（默认关闭，开启后再分配不再幂等）
    #[serde(default)]
    pub reconcile_front: bool,
    /// 变密度流（密度/粘度修正因子由外部输运更新）
    #[serde(default)]
    pub density_flow: bool,
}

impl Default for PhysicsSwitches {
    fn default() -> Self {
        Self {
            groundwater: true,
            shallow_water: true,
            full_3d: false,
            use_corrector: true,
            reallocate: true,
            reconcile_front: false,
            density_flow: false,
        }
    }
}

// ============================================================
// 加载 / 验证 / 保存
// ============================================================

impl ModelConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        let config: ModelConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_grid()?;
        self.validate_time()?;
        self.validate_solver()?;
        self.validate_soil()?;
        self.validate_surface()?;
        if !self.physics.groundwater && !self.physics.shallow_water {
            return Err(ConfigError::Missing(
                "physics.groundwater 与 physics.shallow_water 至少启用一个".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_grid(&self) -> Result<(), ConfigError> {
        let g = &self.grid;
        if g.nx == 0 || g.ny == 0 || g.nz == 0 {
            return Err(ConfigError::invalid(
                "grid",
                format!("{}x{}x{}", g.nx, g.ny, g.nz),
                "单元数必须为正",
            ));
        }
        if g.dx <= 0.0 || g.dy <= 0.0 {
            return Err(ConfigError::invalid(
                "grid.dx/dy",
                format!("{}/{}", g.dx, g.dy),
                "网格间距必须为正",
            ));
        }
        if g.dz.len() != g.nz {
            return Err(ConfigError::invalid(
                "grid.dz",
                g.dz.len(),
                "层厚数组长度必须等于 nz",
            ));
        }
        if let Some(bad) = g.dz.iter().find(|&&dz| dz <= 0.0) {
            return Err(ConfigError::invalid("grid.dz", bad, "层厚必须为正"));
        }
        if g.npx == 0 || g.npy == 0 || g.nx % g.npx != 0 || g.ny % g.npy != 0 {
            return Err(ConfigError::invalid(
                "grid.npx/npy",
                format!("{}/{}", g.npx, g.npy),
                "子域数必须整除全局单元数",
            ));
        }
        Ok(())
    }

    fn validate_time(&self) -> Result<(), ConfigError> {
        let t = &self.time;
        if t.dt_min <= 0.0 || t.dt_min > t.dt_max {
            return Err(ConfigError::invalid(
                "time.dt_min",
                t.dt_min,
                "必须为正且不大于 dt_max",
            ));
        }
        if t.dt_init < t.dt_min || t.dt_init > t.dt_max {
            return Err(ConfigError::invalid(
                "time.dt_init",
                t.dt_init,
                "必须位于 [dt_min, dt_max]",
            ));
        }
        if t.shrink_factor <= 0.0 || t.shrink_factor >= 1.0 {
            return Err(ConfigError::invalid(
                "time.shrink_factor",
                t.shrink_factor,
                "必须位于 (0, 1)",
            ));
        }
        if t.growth_factor < 1.0 {
            return Err(ConfigError::invalid(
                "time.growth_factor",
                t.growth_factor,
                "不能小于 1",
            ));
        }
        if t.imbalance_lower > t.imbalance_upper {
            return Err(ConfigError::invalid(
                "time.imbalance_lower",
                t.imbalance_lower,
                "不能大于 imbalance_upper",
            ));
        }
        if t.courant_max <= 0.0 {
            return Err(ConfigError::invalid(
                "time.courant_max",
                t.courant_max,
                "必须为正",
            ));
        }
        Ok(())
    }

    fn validate_solver(&self) -> Result<(), ConfigError> {
        let s = &self.solver;
        if s.rtol <= 0.0 {
            return Err(ConfigError::invalid("solver.rtol", s.rtol, "必须为正"));
        }
        if s.max_iter == 0 {
            return Err(ConfigError::invalid("solver.max_iter", s.max_iter, "必须为正"));
        }
        if s.omega <= 0.0 || s.omega >= 2.0 {
            return Err(ConfigError::invalid("solver.omega", s.omega, "必须位于 (0, 2)"));
        }
        Ok(())
    }

    fn validate_soil(&self) -> Result<(), ConfigError> {
        let s = &self.soil;
        if s.wcr < 0.0 || s.wcr >= s.wcs || s.wcs > 1.0 {
            return Err(ConfigError::invalid(
                "soil.wcr/wcs",
                format!("{}/{}", s.wcr, s.wcs),
                "需满足 0 <= wcr < wcs <= 1",
            ));
        }
        if s.alpha <= 0.0 {
            return Err(ConfigError::invalid("soil.alpha", s.alpha, "必须为正"));
        }
        if s.n_vg <= 1.0 {
            return Err(ConfigError::invalid("soil.n_vg", s.n_vg, "必须大于 1"));
        }
        for (key, value) in [
            ("soil.ks_x", s.ks_x),
            ("soil.ks_y", s.ks_y),
            ("soil.ks_z", s.ks_z),
            ("soil.ks_surface", s.ks_surface),
            ("soil.specific_storage", s.specific_storage),
        ] {
            if value < 0.0 {
                return Err(ConfigError::invalid(key, value, "不能为负"));
            }
        }
        Ok(())
    }

    fn validate_surface(&self) -> Result<(), ConfigError> {
        let s = &self.surface;
        if s.gravity <= 0.0 {
            return Err(ConfigError::invalid("surface.gravity", s.gravity, "重力必须为正"));
        }
        if s.manning < 0.0 {
            return Err(ConfigError::invalid("surface.manning", s.manning, "不能为负"));
        }
        if s.min_depth < 0.0 {
            return Err(ConfigError::invalid("surface.min_depth", s.min_depth, "不能为负"));
        }
        if s.drag_transition_depth <= 0.0 {
            return Err(ConfigError::invalid(
                "surface.drag_transition_depth",
                s.drag_transition_depth,
                "必须为正",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.solver.preconditioner, PreconditionerKind::Ssor);
        assert_eq!(config.boundary.top, FaceCode::FixedFlux);
    }

    #[test]
    fn test_invalid_layers() {
        let mut config = ModelConfig::default();
        config.grid.dz.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_partition() {
        let mut config = ModelConfig::default();
        config.grid.npx = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_soil_bounds() {
        let mut config = ModelConfig::default();
        config.soil.wcr = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_face_code_u8() {
        for code in 0..4u8 {
            let face = FaceCode::from_u8(code).unwrap();
            assert_eq!(face.as_u8(), code);
        }
        assert!(FaceCode::from_u8(4).is_none());
        assert_eq!(FaceCode::FreeDrainage.to_string(), "FreeDrainage");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "grid": { "nx": 4, "ny": 2, "nz": 3, "dz": [0.1, 0.2, 0.3] },
                        "boundary": { "top": "fixed_head", "head_top": 0.5 } }"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.grid.nx, 4);
        assert_eq!(config.grid.dx, 1.0);
        assert_eq!(config.boundary.top, FaceCode::FixedHead);
        assert_eq!(config.time.max_step_retries, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = ModelConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.grid.dz, config.grid.dz);
        assert_eq!(parsed.boundary.top, config.boundary.top);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut config = ModelConfig::default();
        config.time.dt_max = 30.0;
        config.save_to_file(&path).unwrap();
        let loaded = ModelConfig::from_file(&path).unwrap();
        assert_eq!(loaded.time.dt_max, 30.0);
    }
}
