// crates/hc_physics/src/subsurface/params.rs

//! 地下水求解参数与柱顶边界分类

use hc_config::{BoundaryConfig, FaceCode, ModelConfig, SoilConfig};

use crate::coupling::CouplingBuffer;
use crate::grid::Direction;
use crate::material::VanGenuchten;

/// 地下水求解参数（运行期只读）
#[derive(Debug, Clone)]
pub struct SubsurfaceParams {
    /// 土壤参数
    pub soil: SoilConfig,
    /// 闭合关系
    pub vg: VanGenuchten,
    /// 边界代码
    pub bc: BoundaryConfig,
    /// 是否与地表耦合
    pub coupled: bool,
    /// 非饱和区保留侧向流动
    pub full_3d: bool,
    /// 通量校正步
    pub use_corrector: bool,
    /// 越界再分配
    pub reallocate: bool,
    /// 饱和锋面一致化
    pub reconcile_front: bool,
    /// 地表最小水深 [m]
    pub min_depth: f64,
}

impl SubsurfaceParams {
    /// 从模型配置构造
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            soil: config.soil.clone(),
            vg: VanGenuchten::from_config(&config.soil),
            bc: config.boundary.clone(),
            coupled: config.physics.shallow_water,
            full_3d: config.physics.full_3d,
            use_corrector: config.physics.use_corrector,
            reallocate: config.physics.reallocate,
            reconcile_front: config.physics.reconcile_front,
            min_depth: config.surface.min_depth,
        }
    }

    /// 侧面边界代码
    pub fn side_code(&self, side: Direction) -> FaceCode {
        match side {
            Direction::XPlus => self.bc.x_plus,
            Direction::XMinus => self.bc.x_minus,
            Direction::YPlus => self.bc.y_plus,
            Direction::YMinus => self.bc.y_minus,
            Direction::ZPlus => self.bc.bottom,
            Direction::ZMinus => self.bc.top,
        }
    }

    /// 各向饱和导水率
    #[inline]
    pub fn ks(&self, dir: Direction) -> f64 {
        match dir {
            Direction::XPlus | Direction::XMinus => self.soil.ks_x,
            Direction::YPlus | Direction::YMinus => self.soil.ks_y,
            Direction::ZPlus | Direction::ZMinus => self.soil.ks_z,
        }
    }

    /// 柱顶边界状态
    pub fn top_boundary(&self, coupling: &CouplingBuffer, column: usize) -> TopBoundary {
        if self.coupled {
            if coupling.is_ponded(column) {
                TopBoundary::Ponded {
                    depth: coupling.depth[column],
                }
            } else {
                TopBoundary::Dry(self.bc.top)
            }
        } else {
            TopBoundary::Uncoupled(self.bc.top)
        }
    }
}

/// 柱顶边界状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopBoundary {
    /// 耦合且地表积水
    Ponded {
        /// 积水深度 [m]
        depth: f64,
    },
    /// 耦合但地表无水
    Dry(FaceCode),
    /// 不耦合
    Uncoupled(FaceCode),
}

impl TopBoundary {
    /// 柱顶面是否以水头形式进入矩阵对角
    pub fn is_head_coupled(self) -> bool {
        matches!(
            self,
            Self::Ponded { .. } | Self::Dry(FaceCode::FixedHead) | Self::Uncoupled(FaceCode::FixedHead)
        )
    }

    /// 施加在柱顶 ghost 上的水头（无水头条件时为 None）
    pub fn ghost_head(self, head_top: f64, coupling_depth: f64) -> Option<f64> {
        match self {
            Self::Ponded { depth } => Some(depth),
            Self::Dry(_) => Some(coupling_depth.max(0.0)),
            Self::Uncoupled(FaceCode::FixedHead) => Some(head_top),
            Self::Uncoupled(_) => None,
        }
    }
}
