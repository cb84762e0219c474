// crates/hc_foundation/src/scalar.rs

//! RuntimeScalar - 密封的标量类型抽象
//!
//! 线性代数内核（CSR、预条件器、PCG）对标量类型泛型，
//! 物理层统一使用 f64 实例化。
//!
//! # 使用规范
//!
//! ```
//! use hc_foundation::RuntimeScalar;
//!
//! fn harmonic<S: RuntimeScalar>(a: S, b: S) -> S {
//!     (S::TWO * a * b).safe_div(a + b, S::ZERO)
//! }
//!
//! assert_eq!(harmonic(2.0_f64, 2.0), 2.0);
//! assert_eq!(harmonic(0.0_f64, 0.0), 0.0);
//! ```

use std::fmt::{Debug, Display};
use std::iter::Sum;

use bytemuck::Pod;
use num_traits::{Float, FromPrimitive, NumAssign};

/// 密封模块，禁止外部实现
mod private {
    /// 密封 trait
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// 运行时标量类型（密封，仅 f32/f64 可实现）
pub trait RuntimeScalar:
    private::Sealed
    + Pod
    + Float
    + FromPrimitive
    + NumAssign
    + Debug
    + Display
    + Send
    + Sync
    + Sum
    + Default
    + 'static
{
    /// 零值
    const ZERO: Self;
    /// 一
    const ONE: Self;
    /// 二
    const TWO: Self;
    /// 二分之一
    const HALF: Self;
    /// 机器精度
    const EPSILON: Self;
    /// 最小正值
    const MIN_POSITIVE: Self;
    /// 最大值
    const MAX: Self;

    /// 从配置层 f64 转换（f32 截断精度）
    fn from_config(v: f64) -> Self;

    /// 转换为 f64（用于日志与诊断）
    fn as_f64(self) -> f64;

    /// 安全除法
    ///
    /// 当除数绝对值小于 MIN_POSITIVE 时返回 fallback
    #[inline]
    fn safe_div(self, rhs: Self, fallback: Self) -> Self {
        if rhs.abs() < Self::MIN_POSITIVE {
            fallback
        } else {
            self / rhs
        }
    }
}

impl RuntimeScalar for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const TWO: Self = 2.0;
    const HALF: Self = 0.5;
    const EPSILON: Self = f64::EPSILON;
    const MIN_POSITIVE: Self = f64::MIN_POSITIVE;
    const MAX: Self = f64::MAX;

    #[inline]
    fn from_config(v: f64) -> Self {
        v
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

impl RuntimeScalar for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const TWO: Self = 2.0;
    const HALF: Self = 0.5;
    const EPSILON: Self = f32::EPSILON;
    const MIN_POSITIVE: Self = f32::MIN_POSITIVE;
    const MAX: Self = f32::MAX;

    #[inline]
    fn from_config(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic_sum<S: RuntimeScalar>(values: &[S]) -> S {
        values.iter().copied().fold(S::ZERO, |acc, v| acc + v)
    }

    #[test]
    fn test_constants() {
        assert_eq!(<f64 as RuntimeScalar>::TWO, 2.0);
        assert_eq!(<f32 as RuntimeScalar>::HALF, 0.5);
    }

    #[test]
    fn test_from_config_roundtrip() {
        assert_eq!(f64::from_config(1.25).as_f64(), 1.25);
        assert_eq!(f32::from_config(1.25).as_f64(), 1.25);
    }

    #[test]
    fn test_generic_usage() {
        assert_eq!(generic_sum(&[1.0_f64, 2.0, 3.0]), 6.0);
        assert_eq!(generic_sum(&[1.0_f32, 2.0]), 3.0);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(1.0_f64.safe_div(0.0, -1.0), -1.0);
        assert_eq!(1.0_f64.safe_div(2.0, -1.0), 0.5);
    }
}
