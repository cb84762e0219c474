// crates/hc_physics/src/numerics/linear_algebra/csr.rs

//! 压缩稀疏行（CSR）矩阵
//!
//! 水头/水位方程的系数矩阵每行对应一个内部单元，非零元只出现在
//! 激活的 6 邻域（3D）或 4 邻域（2D）上，因此每行 1–7 或 1–5 个非零元。
//!
//! 支持泛型标量类型 `S: RuntimeScalar`（f32 或 f64）。
//!
//! # 特性开关
//!
//! - `parallel`: 启用基于 `rayon` 的并行矩阵-向量乘法
//!
//! # 使用示例
//!
//! ```
//! use hc_physics::numerics::linear_algebra::CsrBuilder;
//!
//! let mut builder = CsrBuilder::<f64>::new_square(2);
//! builder.set(0, 0, 2.0);
//! builder.set(0, 1, -1.0);
//! builder.set(1, 0, -1.0);
//! builder.set(1, 1, 2.0);
//! let matrix = builder.build();
//!
//! let mut y = vec![0.0; 2];
//! matrix.mul_vec(&[1.0, 1.0], &mut y);
//! assert_eq!(y, vec![1.0, 1.0]);
//! ```

use hc_foundation::RuntimeScalar;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use std::collections::BTreeMap;

// =============================================================================
// 稀疏模式
// =============================================================================

/// CSR 稀疏模式（与值分离）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrPattern {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

impl CsrPattern {
    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// 列数
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// 非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// 第 row 行的列索引（升序）
    #[inline]
    pub fn row_indices(&self, row: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    /// 第 row 行的非零元数量
    #[inline]
    pub fn row_nnz(&self, row: usize) -> usize {
        self.row_ptr[row + 1] - self.row_ptr[row]
    }

    /// 查找 (row, col) 对应的值索引
    pub fn find_index(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        self.row_indices(row)
            .binary_search(&col)
            .ok()
            .map(|local| start + local)
    }

    /// (row, col) 是否有非零元
    #[inline]
    pub fn has_entry(&self, row: usize, col: usize) -> bool {
        self.find_index(row, col).is_some()
    }
}

// =============================================================================
// CSR 矩阵
// =============================================================================

/// CSR 格式稀疏矩阵
#[derive(Debug, Clone)]
pub struct CsrMatrix<S: RuntimeScalar> {
    pattern: CsrPattern,
    values: Vec<S>,
}

impl<S: RuntimeScalar> CsrMatrix<S> {
    /// 从原始 CSR 数组创建
    ///
    /// `row_ptr` 长度为 n_rows + 1 且末尾等于 nnz；每行列索引升序。
    pub fn from_raw(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<S>,
    ) -> Self {
        debug_assert_eq!(row_ptr.len(), n_rows + 1, "row_ptr 长度必须为 n_rows + 1");
        debug_assert_eq!(col_idx.len(), values.len(), "col_idx 和 values 长度必须相等");
        debug_assert_eq!(row_ptr[n_rows], col_idx.len(), "row_ptr 末尾必须等于 nnz");

        Self {
            pattern: CsrPattern {
                n_rows,
                n_cols,
                row_ptr,
                col_idx,
            },
            values,
        }
    }

    /// 单位矩阵
    pub fn identity(n: usize) -> Self {
        Self::diagonal(&vec![S::ONE; n])
    }

    /// 对角矩阵
    pub fn diagonal(diag: &[S]) -> Self {
        let n = diag.len();
        Self::from_raw(n, n, (0..=n).collect(), (0..n).collect(), diag.to_vec())
    }

    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.pattern.n_rows()
    }

    /// 列数
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.pattern.n_cols()
    }

    /// 非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// 稀疏模式
    #[inline]
    pub fn pattern(&self) -> &CsrPattern {
        &self.pattern
    }

    /// 值数组
    #[inline]
    pub fn values(&self) -> &[S] {
        &self.values
    }

    /// 行指针
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.pattern.row_ptr
    }

    /// 列索引
    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        &self.pattern.col_idx
    }

    /// (row, col) 的值（不存在返回 0）
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> S {
        self.pattern
            .find_index(row, col)
            .map_or(S::ZERO, |idx| self.values[idx])
    }

    /// 覆盖已存在位置的值，位置不存在时返回 false
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: S) -> bool {
        match self.pattern.find_index(row, col) {
            Some(idx) => {
                self.values[idx] = value;
                true
            }
            None => false,
        }
    }

    /// 累加到已存在位置，位置不存在时返回 false
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: S) -> bool {
        match self.pattern.find_index(row, col) {
            Some(idx) => {
                self.values[idx] += value;
                true
            }
            None => false,
        }
    }

    /// 第 row 行的只读视图
    #[inline]
    pub fn row(&self, row: usize) -> RowView<'_, S> {
        let start = self.pattern.row_ptr[row];
        let end = self.pattern.row_ptr[row + 1];
        RowView {
            col_idx: &self.pattern.col_idx[start..end],
            values: &self.values[start..end],
        }
    }

    /// 第 row 行的对角元
    #[inline]
    pub fn diagonal_value(&self, row: usize) -> Option<S> {
        self.pattern.find_index(row, row).map(|idx| self.values[idx])
    }

    /// 对角线向量（缺失补 0）
    pub fn extract_diagonal(&self) -> Vec<S> {
        (0..self.n_rows())
            .map(|i| self.diagonal_value(i).unwrap_or(S::ZERO))
            .collect()
    }

    /// 第 row 行的代数行和
    pub fn row_sum(&self, row: usize) -> S {
        self.row(row).values().iter().copied().sum()
    }

    /// y = A x
    ///
    /// # Panics
    /// 向量长度与矩阵维度不符
    pub fn mul_vec(&self, x: &[S], y: &mut [S]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");

        for (row, out) in y.iter_mut().enumerate() {
            *out = self.row(row).iter().map(|(col, v)| v * x[col]).sum();
        }
    }

    /// 并行 y = A x（需启用 `parallel` 特性）
    #[cfg(feature = "parallel")]
    pub fn mul_vec_parallel(&self, x: &[S], y: &mut [S]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");

        y.par_iter_mut().enumerate().for_each(|(row, out)| {
            *out = self.row(row).iter().map(|(col, v)| v * x[col]).sum();
        });
    }

    /// r = b - A x
    pub fn residual(&self, b: &[S], x: &[S], r: &mut [S]) {
        self.mul_vec(x, r);
        for (ri, &bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
    }

    /// 对称性检查：所有 |A[i,j] - A[j,i]| <= tol
    ///
    /// 只遍历上三角，缺失的转置位置按 0 比较。
    pub fn is_symmetric(&self, tol: S) -> bool {
        (0..self.n_rows()).all(|i| {
            self.row(i)
                .iter()
                .filter(|&(j, _)| j > i)
                .all(|(j, a_ij)| (a_ij - self.get(j, i)).abs() <= tol)
        })
    }

    /// A *= factor
    pub fn scale(&mut self, factor: S) {
        for v in &mut self.values {
            *v *= factor;
        }
    }
}

// =============================================================================
// 行视图
// =============================================================================

/// 矩阵某一行的只读视图
pub struct RowView<'a, S: RuntimeScalar> {
    col_idx: &'a [usize],
    values: &'a [S],
}

impl<'a, S: RuntimeScalar> RowView<'a, S> {
    /// 列索引
    #[inline]
    pub fn col_indices(&self) -> &'a [usize] {
        self.col_idx
    }

    /// 值
    #[inline]
    pub fn values(&self) -> &'a [S] {
        self.values
    }

    /// 非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// (列索引, 值) 迭代
    pub fn iter(&self) -> impl Iterator<Item = (usize, S)> + 'a {
        self.col_idx.iter().copied().zip(self.values.iter().copied())
    }
}

// =============================================================================
// 构建器
// =============================================================================

/// CSR 构建器
///
/// 每行用 BTreeMap 暂存，构建时按列升序压缩。组装阶段逐单元写入，
/// 同一位置多次 `add` 会累加。
#[derive(Debug, Clone)]
pub struct CsrBuilder<S: RuntimeScalar> {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<BTreeMap<usize, S>>,
}

impl<S: RuntimeScalar> CsrBuilder<S> {
    /// 方阵构建器
    #[inline]
    pub fn new_square(n: usize) -> Self {
        Self::new(n, n)
    }

    /// 构建器
    ///
    /// # Panics
    /// 行数或列数为 0
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        assert!(n_rows > 0, "行数必须大于 0");
        assert!(n_cols > 0, "列数必须大于 0");
        Self {
            n_rows,
            n_cols,
            rows: vec![BTreeMap::new(); n_rows],
        }
    }

    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// 覆盖 (row, col)
    ///
    /// # Panics
    /// 索引越界
    pub fn set(&mut self, row: usize, col: usize, value: S) {
        assert!(row < self.n_rows, "行索引越界");
        assert!(col < self.n_cols, "列索引越界");
        self.rows[row].insert(col, value);
    }

    /// 累加到 (row, col)
    ///
    /// # Panics
    /// 索引越界
    pub fn add(&mut self, row: usize, col: usize, value: S) {
        assert!(row < self.n_rows, "行索引越界");
        assert!(col < self.n_cols, "列索引越界");
        *self.rows[row].entry(col).or_insert(S::ZERO) += value;
    }

    /// (row, col) 当前值
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> S {
        self.rows[row].get(&col).copied().unwrap_or(S::ZERO)
    }

    /// 把第 row 行替换为单位行
    pub fn set_identity_row(&mut self, row: usize) {
        assert!(row < self.n_rows, "行索引越界");
        self.rows[row].clear();
        self.rows[row].insert(row, S::ONE);
    }

    /// 非零元总数
    #[inline]
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(BTreeMap::len).sum()
    }

    /// 构建矩阵
    pub fn build(self) -> CsrMatrix<S> {
        let nnz = self.nnz();
        let mut row_ptr = Vec::with_capacity(self.n_rows + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);
        for row_map in self.rows {
            for (col, val) in row_map {
                col_idx.push(col);
                values.push(val);
            }
            row_ptr.push(col_idx.len());
        }
        CsrMatrix::from_raw(self.n_rows, self.n_cols, row_ptr, col_idx, values)
    }
}

// =============================================================================
// 测试
// =============================================================================
