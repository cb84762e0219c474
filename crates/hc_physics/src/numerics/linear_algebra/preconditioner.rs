// crates/hc_physics/src/numerics/linear_algebra/preconditioner.rs

//! 预条件器
//!
//! PCG 要求对称正定的预条件器：
//!
//! - [`IdentityPreconditioner`]: 不做预条件
//! - [`JacobiPreconditioner`]: 对角缩放
//! - [`SsorPreconditioner`]: 对称逐次超松弛，M⁻¹ = (D+ωU)⁻¹ (2-ω) D (D+ωL)⁻¹

use super::csr::CsrMatrix;
use hc_foundation::RuntimeScalar;

/// 对角元小于该值时视为零
const DIAG_THRESHOLD: f64 = 1e-14;

/// 预条件器
pub trait Preconditioner<S: RuntimeScalar>: Send + Sync {
    /// z = M⁻¹ r
    fn apply(&self, r: &[S], z: &mut [S]);

    /// 名称
    fn name(&self) -> &'static str;

    /// 矩阵值变化后更新（稀疏模式不变）
    fn update(&mut self, matrix: &CsrMatrix<S>);
}

// =============================================================================
// Identity
// =============================================================================

/// 恒等预条件器
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreconditioner;

impl<S: RuntimeScalar> Preconditioner<S> for IdentityPreconditioner {
    fn apply(&self, r: &[S], z: &mut [S]) {
        z.copy_from_slice(r);
    }

    fn name(&self) -> &'static str {
        "Identity"
    }

    fn update(&mut self, _matrix: &CsrMatrix<S>) {}
}

// =============================================================================
// Jacobi
// =============================================================================

/// Jacobi 预条件器
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner<S: RuntimeScalar> {
    inv_diag: Vec<S>,
}

impl<S: RuntimeScalar> JacobiPreconditioner<S> {
    /// 从矩阵对角线构造，近零对角元取 1
    pub fn from_matrix(matrix: &CsrMatrix<S>) -> Self {
        Self::from_diagonal(&matrix.extract_diagonal())
    }

    /// 从对角线数组构造
    pub fn from_diagonal(diag: &[S]) -> Self {
        let threshold = S::from_config(DIAG_THRESHOLD);
        let inv_diag = diag
            .iter()
            .map(|&d| if d.abs() > threshold { S::ONE / d } else { S::ONE })
            .collect();
        Self { inv_diag }
    }

    /// 对角线倒数
    pub fn inv_diagonal(&self) -> &[S] {
        &self.inv_diag
    }
}

impl<S: RuntimeScalar> Preconditioner<S> for JacobiPreconditioner<S> {
    fn apply(&self, r: &[S], z: &mut [S]) {
        debug_assert_eq!(r.len(), self.inv_diag.len());
        for ((zi, &ri), &inv) in z.iter_mut().zip(r).zip(&self.inv_diag) {
            *zi = ri * inv;
        }
    }

    fn name(&self) -> &'static str {
        "Jacobi"
    }

    fn update(&mut self, matrix: &CsrMatrix<S>) {
        *self = Self::from_matrix(matrix);
    }
}

// =============================================================================
// SSOR
// =============================================================================

/// SSOR 预条件器
#[derive(Debug, Clone)]
pub struct SsorPreconditioner<S: RuntimeScalar> {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<S>,
    diag: Vec<S>,
    omega: S,
}

impl<S: RuntimeScalar> SsorPreconditioner<S> {
    /// 从矩阵构造，`omega` 应位于 (0, 2)
    pub fn from_matrix(matrix: &CsrMatrix<S>, omega: S) -> Self {
        Self {
            row_ptr: matrix.row_ptr().to_vec(),
            col_idx: matrix.col_idx().to_vec(),
            values: matrix.values().to_vec(),
            diag: Self::safe_diagonal(matrix),
            omega,
        }
    }

    /// 松弛因子
    pub fn omega(&self) -> S {
        self.omega
    }

    fn safe_diagonal(matrix: &CsrMatrix<S>) -> Vec<S> {
        let threshold = S::from_config(DIAG_THRESHOLD);
        matrix
            .extract_diagonal()
            .into_iter()
            .map(|d| if d.abs() > threshold { d } else { S::ONE })
            .collect()
    }
}

impl<S: RuntimeScalar> Preconditioner<S> for SsorPreconditioner<S> {
    fn apply(&self, r: &[S], z: &mut [S]) {
        let n = self.diag.len();
        debug_assert_eq!(r.len(), n);

        // (D + ωL) y = r
        for i in 0..n {
            let mut sum = r[i];
            for idx in self.row_ptr[i]..self.row_ptr[i + 1] {
                let j = self.col_idx[idx];
                if j < i {
                    sum -= self.omega * self.values[idx] * z[j];
                }
            }
            z[i] = sum / self.diag[i];
        }

        let scale = S::TWO - self.omega;
        for (zi, &d) in z.iter_mut().zip(&self.diag) {
            *zi *= d * scale;
        }

        // (D + ωU) z = (2-ω) D y
        for i in (0..n).rev() {
            let mut sum = z[i];
            for idx in self.row_ptr[i]..self.row_ptr[i + 1] {
                let j = self.col_idx[idx];
                if j > i {
                    sum -= self.omega * self.values[idx] * z[j];
                }
            }
            z[i] = sum / self.diag[i];
        }
    }

    fn name(&self) -> &'static str {
        "SSOR"
    }

    fn update(&mut self, matrix: &CsrMatrix<S>) {
        if matrix.row_ptr() == self.row_ptr.as_slice() && matrix.col_idx() == self.col_idx.as_slice()
        {
            self.values.copy_from_slice(matrix.values());
            self.diag = Self::safe_diagonal(matrix);
        } else {
            *self = Self::from_matrix(matrix, self.omega);
        }
    }
}
