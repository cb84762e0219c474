// crates/hc_physics/src/numerics/linear_algebra/mod.rs

//! 稀疏线性代数
//!
//! 隐式求解所需的 CSR 矩阵、预条件器与 PCG。物理层把它当作黑盒求解原语，
//! 通过 [`crate::engine::LinearSolveAdapter`] 调用。

pub mod csr;
pub mod preconditioner;
pub mod solver;
pub mod vector_ops;

pub use csr::{CsrBuilder, CsrMatrix, CsrPattern, RowView};
pub use preconditioner::{
    IdentityPreconditioner, JacobiPreconditioner, Preconditioner, SsorPreconditioner,
};
pub use solver::{CgWorkspace, PcgSolver, SolverConfig, SolverResult, SolverStatus};
pub use vector_ops::{axpy, copy, dot, fill, norm2, norm_inf, relative_residual, scale, xpay};
