// crates/hc_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 基础层只定义与物理无关的核心错误；求解相关错误（不收敛、网格非法等）
//! 在 `hc_physics` 中扩展。
//!
//! # 示例
//!
//! ```
//! use hc_foundation::error::{HcError, HcResult};
//!
//! fn check_porosity(wcs: f64) -> HcResult<()> {
//!     HcError::check_range("wcs", wcs, 0.0, 1.0)
//! }
//!
//! assert!(check_porosity(0.4).is_ok());
//! assert!(check_porosity(1.4).is_err());
//! ```

use thiserror::Error;

/// 统一结果类型
pub type HcResult<T> = Result<T, HcError>;

/// HydroCouple 基础错误类型
#[derive(Error, Debug)]
pub enum HcError {
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        /// 可选的底层 IO 错误
        #[source]
        source: Option<std::io::Error>,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl HcError {
    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl HcError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> HcResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查值是否在闭区间内（NaN 视为越界）
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> HcResult<()> {
        if value >= min && value <= max {
            Ok(())
        } else {
            Err(Self::out_of_range(field, value, min, max))
        }
    }
}

impl From<std::io::Error> for HcError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ========================================================================
// 测试
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HcError::size_mismatch("head", 10, 5);
        let msg = err.to_string();
        assert!(msg.contains("head"));
        assert!(msg.contains("10"));
        assert!(msg.contains("5"));
    }

    #[test]
    fn test_check_size() {
        assert!(HcError::check_size("test", 10, 10).is_ok());
        assert!(HcError::check_size("test", 10, 5).is_err());
    }

    #[test]
    fn test_check_range() {
        assert!(HcError::check_range("value", 5.0, 0.0, 10.0).is_ok());
        assert!(HcError::check_range("value", -1.0, 0.0, 10.0).is_err());
        assert!(HcError::check_range("value", f64::NAN, 0.0, 10.0).is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: HcError = io_err.into();
        assert!(matches!(err, HcError::Io { source: Some(_), .. }));
    }
}
