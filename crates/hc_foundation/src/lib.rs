// crates/hc_foundation/src/lib.rs

//! HydroCouple Foundation Layer
//!
//! 基础层，为上层物理核心提供最小公共抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `HcError`
//! - [`scalar`]: 密封标量 trait `RuntimeScalar`（f32/f64）
//! - [`float`]: Kahan 补偿求和、安全除法
//!
//! # 示例
//!
//! ```
//! use hc_foundation::{HcError, HcResult, KahanSum};
//!
//! fn total(values: &[f64]) -> HcResult<f64> {
//!     HcError::check_size("values", 3, values.len())?;
//!     Ok(KahanSum::sum_iter(values.iter().copied()))
//! }
//!
//! assert_eq!(total(&[1.0, 2.0, 3.0]).unwrap(), 6.0);
//! assert!(total(&[1.0]).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod float;
pub mod scalar;

// 重导出常用类型
pub use error::{HcError, HcResult};
pub use float::{safe_div, KahanSum};
pub use scalar::RuntimeScalar;

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{HcError, HcResult};
    pub use crate::float::{safe_div, KahanSum};
    pub use crate::scalar::RuntimeScalar;
}
