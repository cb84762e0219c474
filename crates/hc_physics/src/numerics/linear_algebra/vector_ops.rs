// crates/hc_physics/src/numerics/linear_algebra/vector_ops.rs

//! 向量运算
//!
//! 迭代求解器使用的 BLAS-1 级操作，泛型于 `S: RuntimeScalar`。
//! 长度不一致属于编程错误，直接 panic。

use hc_foundation::RuntimeScalar;

/// 内积 x·y
#[inline]
pub fn dot<S: RuntimeScalar>(x: &[S], y: &[S]) -> S {
    assert_eq!(x.len(), y.len(), "向量长度必须相等");
    x.iter().zip(y).map(|(&a, &b)| a * b).sum()
}

/// 2-范数
#[inline]
pub fn norm2<S: RuntimeScalar>(x: &[S]) -> S {
    dot(x, x).sqrt()
}

/// 无穷范数
#[inline]
pub fn norm_inf<S: RuntimeScalar>(x: &[S]) -> S {
    x.iter().fold(S::ZERO, |m, &v| m.max(v.abs()))
}

/// y += alpha * x
#[inline]
pub fn axpy<S: RuntimeScalar>(alpha: S, x: &[S], y: &mut [S]) {
    assert_eq!(x.len(), y.len(), "向量长度必须相等");
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// y = x + beta * y
#[inline]
pub fn xpay<S: RuntimeScalar>(x: &[S], beta: S, y: &mut [S]) {
    assert_eq!(x.len(), y.len(), "向量长度必须相等");
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi = xi + beta * *yi;
    }
}

/// y = x
#[inline]
pub fn copy<S: RuntimeScalar>(x: &[S], y: &mut [S]) {
    y.copy_from_slice(x);
}

/// x = value
#[inline]
pub fn fill<S: RuntimeScalar>(x: &mut [S], value: S) {
    x.fill(value);
}

/// x *= alpha
#[inline]
pub fn scale<S: RuntimeScalar>(alpha: S, x: &mut [S]) {
    for v in x {
        *v *= alpha;
    }
}

/// ‖r‖ / ‖b‖（b 为零时返回 ‖r‖）
pub fn relative_residual<S: RuntimeScalar>(r: &[S], b: &[S]) -> S {
    let rn = norm2(r);
    rn.safe_div(norm2(b), rn)
}
