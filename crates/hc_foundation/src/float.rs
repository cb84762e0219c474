// crates/hc_foundation/src/float.rs

//! 浮点工具
//!
//! 体积守恒诊断需要对大量小量求和，这里提供 Kahan 补偿求和器。

/// 安全除法：分母接近零时返回 fallback
#[inline]
pub fn safe_div(a: f64, b: f64, fallback: f64) -> f64 {
    if b.abs() < f64::MIN_POSITIVE {
        fallback
    } else {
        a / b
    }
}

// ============================================================================
// Kahan 求和算法
// ============================================================================

/// Kahan 求和器
///
/// 维护一个补偿项来跟踪累加过程中丢失的低位精度。
///
/// # 示例
///
/// ```
/// use hc_foundation::float::KahanSum;
///
/// let mut sum = KahanSum::new();
/// for _ in 0..10000 {
///     sum.add(0.1);
/// }
/// assert!((sum.value() - 1000.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    /// 累加和
    sum: f64,
    /// 补偿项（低位精度损失）
    compensation: f64,
}

impl KahanSum {
    /// 创建新的 Kahan 求和器
    #[inline]
    pub fn new() -> Self {
        Self {
            sum: 0.0,
            compensation: 0.0,
        }
    }

    /// 添加一个值
    #[inline]
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        // (t - sum) 是 y 的高位部分，减去 y 得到丢失的低位部分
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// 获取当前求和值
    #[inline]
    pub fn value(&self) -> f64 {
        self.sum
    }

    /// 重置求和器
    #[inline]
    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.compensation = 0.0;
    }

    /// 从迭代器求和
    pub fn sum_iter<I: IntoIterator<Item = f64>>(iter: I) -> f64 {
        let mut kahan = Self::new();
        for v in iter {
            kahan.add(v);
        }
        kahan.value()
    }
}

impl std::iter::Sum<f64> for KahanSum {
    fn sum<I: Iterator<Item = f64>>(iter: I) -> Self {
        let mut kahan = KahanSum::new();
        for v in iter {
            kahan.add(v);
        }
        kahan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kahan_small_increments() {
        let naive: f64 = (0..100_000).map(|_| 1e-3).sum();
        let kahan = KahanSum::sum_iter((0..100_000).map(|_| 1e-3));
        assert!((kahan - 100.0).abs() <= (naive - 100.0).abs());
        assert!((kahan - 100.0).abs() < 1e-10, "Kahan 误差应该很小");
    }

    #[test]
    fn test_kahan_reset() {
        let mut sum: KahanSum = [1.0, 2.0].into_iter().sum();
        assert_eq!(sum.value(), 3.0);
        sum.reset();
        assert_eq!(sum.value(), 0.0);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(1.0, 0.0, 7.0), 7.0);
        assert_eq!(safe_div(1.0, 4.0, 7.0), 0.25);
    }
}
