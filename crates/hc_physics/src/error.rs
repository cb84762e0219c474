// crates/hc_physics/src/error.rs

//! 物理核心错误类型
//!
//! 线性求解不收敛是致命错误，必须中止当前步；含水量越界不是错误，
//! 而是由再分配过程返回的控制信号（见 [`crate::subsurface::ReallocationOutcome`]）。

use hc_config::ConfigError;
use hc_foundation::HcError;
use thiserror::Error;

/// 物理核心结果类型
pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// 物理核心错误
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// 线性求解超过迭代上限
    #[error("{domain} 线性求解不收敛: {iterations} 次迭代后残差 {residual:.3e}")]
    NonConvergence {
        /// 求解域（"subsurface" / "surface"）
        domain: &'static str,
        /// 已执行迭代次数
        iterations: usize,
        /// 最终残差范数
        residual: f64,
    },

    /// 网格或拓扑非法
    #[error("网格非法: {0}")]
    InvalidGrid(String),

    /// 数组长度不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数组名称
        name: &'static str,
        /// 期望长度
        expected: usize,
        /// 实际长度
        actual: usize,
    },

    /// 强迫数据非法
    #[error("强迫数据非法: {0}")]
    InvalidForcing(String),

    /// 子域通信失败
    #[error("子域通信失败: {0}")]
    Transport(String),

    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 基础层错误
    #[error(transparent)]
    Foundation(#[from] HcError),
}

impl PhysicsError {
    /// 构造网格错误
    pub fn invalid_grid(message: impl Into<String>) -> Self {
        Self::InvalidGrid(message.into())
    }

    /// 构造通信错误
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// 校验数组长度
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> PhysicsResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::SizeMismatch {
                name,
                expected,
                actual,
            })
        }
    }

    /// 是否为致命的不收敛错误
    pub fn is_non_convergence(&self) -> bool {
        matches!(self, Self::NonConvergence { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_convergence_message() {
        let err = PhysicsError::NonConvergence {
            domain: "subsurface",
            iterations: 2000,
            residual: 1.5e-3,
        };
        assert!(err.is_non_convergence());
        let msg = err.to_string();
        assert!(msg.contains("subsurface"));
        assert!(msg.contains("2000"));
    }

    #[test]
    fn test_check_size() {
        assert!(PhysicsError::check_size("h", 4, 4).is_ok());
        assert!(matches!(
            PhysicsError::check_size("h", 4, 3),
            Err(PhysicsError::SizeMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_from_foundation() {
        let err: PhysicsError = HcError::internal("x").into();
        assert!(matches!(err, PhysicsError::Foundation(_)));
    }
}
