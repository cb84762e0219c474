// crates/hc_physics/src/numerics/linear_algebra/solver.rs

//! 预条件共轭梯度法（PCG）
//!
//! 水头与水位方程的系数矩阵在常规边界下对称正定，使用 PCG 求解。
//! 收敛判据：‖r‖ < max(atol, rtol·‖b‖)；b ≈ 0 时只用 atol。
//! 初值由调用者提供（耦合模型使用零初值）。

use super::csr::CsrMatrix;
use super::preconditioner::Preconditioner;
use super::vector_ops::{axpy, copy, dot, norm2, xpay};
use hc_foundation::RuntimeScalar;
use serde::{Deserialize, Serialize};

/// p·Ap 小于该值视为停滞
const STAGNATION_TOL: f64 = 1e-30;

/// 求解器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 相对收敛容差
    pub rtol: f64, // ALLOW_F64: 配置参数
    /// 绝对收敛容差
    pub atol: f64, // ALLOW_F64: 配置参数
    /// 最大迭代次数
    pub max_iter: usize,
    /// 逐次输出残差
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-14,
            max_iter: 1000,
            verbose: false,
        }
    }
}

impl SolverConfig {
    /// 指定相对容差与迭代上限
    pub fn new(rtol: f64, max_iter: usize) -> Self {
        Self {
            rtol,
            max_iter,
            ..Default::default()
        }
    }

    /// 设置绝对容差
    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// 开启逐次残差输出
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

/// 求解状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// 收敛
    Converged,
    /// 达到最大迭代次数
    MaxIterationsReached,
    /// 发散（出现非有限值）
    Diverged,
    /// 停滞
    Stagnated,
}

/// 求解结果
#[derive(Debug, Clone)]
pub struct SolverResult<S: RuntimeScalar> {
    /// 状态
    pub status: SolverStatus,
    /// 迭代次数
    pub iterations: usize,
    /// 最终残差范数
    pub residual_norm: S,
    /// 初始残差范数
    pub initial_residual_norm: S,
    /// 相对残差
    pub relative_residual: S,
}

impl<S: RuntimeScalar> SolverResult<S> {
    fn finish(status: SolverStatus, iterations: usize, residual: S, initial: S) -> Self {
        Self {
            status,
            iterations,
            residual_norm: residual,
            initial_residual_norm: initial,
            relative_residual: residual.safe_div(initial, S::ZERO),
        }
    }

    /// 是否收敛
    pub fn is_converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }
}

/// PCG 工作区
#[derive(Debug, Clone, Default)]
pub struct CgWorkspace<S: RuntimeScalar> {
    /// 残差
    pub r: Vec<S>,
    /// 搜索方向
    pub p: Vec<S>,
    /// A p
    pub ap: Vec<S>,
    /// M⁻¹ r
    pub z: Vec<S>,
}

impl<S: RuntimeScalar> CgWorkspace<S> {
    /// 创建
    pub fn new(n: usize) -> Self {
        Self {
            r: vec![S::ZERO; n],
            p: vec![S::ZERO; n],
            ap: vec![S::ZERO; n],
            z: vec![S::ZERO; n],
        }
    }

    /// 调整大小并清零（大小不变也清零）
    pub fn resize(&mut self, n: usize) {
        for v in [&mut self.r, &mut self.p, &mut self.ap, &mut self.z] {
            v.clear();
            v.resize(n, S::ZERO);
        }
    }
}

/// 预条件共轭梯度求解器
#[derive(Debug, Clone)]
pub struct PcgSolver<S: RuntimeScalar> {
    config: SolverConfig,
    _marker: std::marker::PhantomData<S>,
}

impl<S: RuntimeScalar> PcgSolver<S> {
    /// 创建
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            _marker: std::marker::PhantomData,
        }
    }

    /// 配置
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// 求解（内部分配工作区）
    pub fn solve(
        &self,
        matrix: &CsrMatrix<S>,
        b: &[S],
        x: &mut [S],
        precond: &dyn Preconditioner<S>,
    ) -> SolverResult<S> {
        let mut ws = CgWorkspace::new(b.len());
        self.solve_with_workspace(matrix, b, x, precond, &mut ws)
    }

    /// 使用外部工作区求解
    pub fn solve_with_workspace(
        &self,
        matrix: &CsrMatrix<S>,
        b: &[S],
        x: &mut [S],
        precond: &dyn Preconditioner<S>,
        ws: &mut CgWorkspace<S>,
    ) -> SolverResult<S> {
        ws.resize(b.len());
        let rtol = S::from_config(self.config.rtol);
        let atol = S::from_config(self.config.atol);
        let stag_tol = S::from_config(STAGNATION_TOL).max(S::MIN_POSITIVE);

        matrix.residual(b, x, &mut ws.r);
        let initial_norm = norm2(&ws.r);
        let b_norm = norm2(b);
        let effective_tol = if b_norm < S::MIN_POSITIVE {
            atol
        } else {
            atol.max(rtol * b_norm)
        };

        if initial_norm < effective_tol {
            return SolverResult::finish(SolverStatus::Converged, 0, initial_norm, initial_norm);
        }

        precond.apply(&ws.r, &mut ws.z);
        copy(&ws.z, &mut ws.p);
        let mut rz = dot(&ws.r, &ws.z);

        for iter in 0..self.config.max_iter {
            #[cfg(feature = "parallel")]
            matrix.mul_vec_parallel(&ws.p, &mut ws.ap);
            #[cfg(not(feature = "parallel"))]
            matrix.mul_vec(&ws.p, &mut ws.ap);
            let pap = dot(&ws.p, &ws.ap);
            if pap.abs() < stag_tol {
                return SolverResult::finish(
                    SolverStatus::Stagnated,
                    iter,
                    norm2(&ws.r),
                    initial_norm,
                );
            }

            let alpha = rz / pap;
            axpy(alpha, &ws.p, x);
            axpy(-alpha, &ws.ap, &mut ws.r);

            let res_norm = norm2(&ws.r);
            if self.config.verbose {
                log::trace!("PCG iter {}: residual = {:.6e}", iter + 1, res_norm.as_f64());
            }
            if !res_norm.is_finite() {
                return SolverResult::finish(
                    SolverStatus::Diverged,
                    iter + 1,
                    res_norm,
                    initial_norm,
                );
            }
            if res_norm < effective_tol {
                return SolverResult::finish(
                    SolverStatus::Converged,
                    iter + 1,
                    res_norm,
                    initial_norm,
                );
            }

            precond.apply(&ws.r, &mut ws.z);
            let rz_new = dot(&ws.r, &ws.z);
            let beta = rz_new / rz;
            rz = rz_new;
            // p = z + beta p
            xpay(&ws.z, beta, &mut ws.p);
        }

        SolverResult::finish(
            SolverStatus::MaxIterationsReached,
            self.config.max_iter,
            norm2(&ws.r),
            initial_norm,
        )
    }
}
