// crates/hc_physics/src/engine/linear_solve.rs

//! 线性求解适配器
//!
//! 地下与地表两个隐式步都把组装结果交给同一个适配器：按配置选择预条件器，
//! 以当前水头/水位为初值调用 PCG，超过迭代上限时返回 [`PhysicsError::NonConvergence`]。

use hc_config::{PreconditionerKind, SolverSettings};

use crate::error::{PhysicsError, PhysicsResult};
use crate::numerics::linear_algebra::{
    CgWorkspace, CsrMatrix, IdentityPreconditioner, JacobiPreconditioner, PcgSolver,
    Preconditioner, SolverConfig, SolverStatus, SsorPreconditioner,
};

/// 组装完成的线性系统 `A x = b`
#[derive(Debug, Clone)]
pub struct LinearSystem {
    /// 系数矩阵（对称正定）
    pub matrix: CsrMatrix<f64>,
    /// 右端项
    pub rhs: Vec<f64>,
}

impl LinearSystem {
    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rhs.len()
    }
}

/// 一次求解的统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveStats {
    /// 迭代次数
    pub iterations: usize,
    /// 最终残差范数
    pub residual: f64,
}

/// PCG 适配器（每个求解域一个，工作区复用）
#[derive(Debug)]
pub struct LinearSolveAdapter {
    domain: &'static str,
    solver: PcgSolver<f64>,
    preconditioner: PreconditionerKind,
    omega: f64,
    workspace: CgWorkspace<f64>,
}

impl LinearSolveAdapter {
    /// 从求解器配置创建
    pub fn new(domain: &'static str, settings: &SolverSettings) -> Self {
        let mut config = SolverConfig::new(settings.rtol, settings.max_iter).with_atol(settings.atol);
        if settings.verbose {
            config = config.verbose();
        }
        Self {
            domain,
            solver: PcgSolver::new(config),
            preconditioner: settings.preconditioner,
            omega: settings.omega,
            workspace: CgWorkspace::new(0),
        }
    }

    /// 求解域名称
    pub fn domain(&self) -> &'static str {
        self.domain
    }

    /// 求解；`x` 进入时为初值，返回时为解
    pub fn solve(&mut self, system: &LinearSystem, x: &mut [f64]) -> PhysicsResult<SolveStats> {
        PhysicsError::check_size("solution", system.n_rows(), x.len())?;
        let precond: Box<dyn Preconditioner<f64>> = match self.preconditioner {
            PreconditionerKind::Identity => Box::new(IdentityPreconditioner),
            PreconditionerKind::Jacobi => Box::new(JacobiPreconditioner::from_matrix(&system.matrix)),
            PreconditionerKind::Ssor => {
                Box::new(SsorPreconditioner::from_matrix(&system.matrix, self.omega))
            }
        };

        let result = self.solver.solve_with_workspace(
            &system.matrix,
            &system.rhs,
            x,
            precond.as_ref(),
            &mut self.workspace,
        );

        log::trace!(
            "{} PCG[{}]: {:?} 迭代 {} 相对残差 {:.3e}",
            self.domain,
            precond.name(),
            result.status,
            result.iterations,
            result.relative_residual
        );

        match result.status {
            SolverStatus::Converged => Ok(SolveStats {
                iterations: result.iterations,
                residual: result.residual_norm,
            }),
            _ => Err(PhysicsError::NonConvergence {
                domain: self.domain,
                iterations: result.iterations,
                residual: result.residual_norm,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::linear_algebra::CsrBuilder;

    fn tridiagonal(n: usize) -> LinearSystem {
        let mut builder = CsrBuilder::new_square(n);
        for i in 0..n {
            builder.set(i, i, 4.0);
            if i > 0 {
                builder.set(i, i - 1, -1.0);
            }
            if i + 1 < n {
                builder.set(i, i + 1, -1.0);
            }
        }
        LinearSystem {
            matrix: builder.build(),
            rhs: vec![1.0; n],
        }
    }

    #[test]
    fn test_all_preconditioners_converge() {
        for kind in [
            PreconditionerKind::Identity,
            PreconditionerKind::Jacobi,
            PreconditionerKind::Ssor,
        ] {
            let settings = SolverSettings {
                preconditioner: kind,
                ..SolverSettings::default()
            };
            let mut adapter = LinearSolveAdapter::new("subsurface", &settings);
            let system = tridiagonal(20);
            let mut x = vec![0.0; 20];
            let stats = adapter.solve(&system, &mut x).unwrap();
            assert!(stats.iterations <= 20);

            let mut r = vec![0.0; 20];
            system.matrix.residual(&system.rhs, &x, &mut r);
            assert!(r.iter().all(|v| v.abs() < 1e-6), "{:?}", kind);
        }
    }

    #[test]
    fn test_iteration_cap_is_fatal() {
        let settings = SolverSettings {
            max_iter: 1,
            rtol: 1e-14,
            atol: 1e-30,
            preconditioner: PreconditionerKind::Identity,
            ..SolverSettings::default()
        };
        let mut adapter = LinearSolveAdapter::new("surface", &settings);
        let system = tridiagonal(30);
        let mut x = vec![0.0; 30];
        let err = adapter.solve(&system, &mut x).unwrap_err();
        assert!(err.is_non_convergence());
        assert!(err.to_string().contains("surface"));
    }

    #[test]
    fn test_size_mismatch() {
        let mut adapter = LinearSolveAdapter::new("subsurface", &SolverSettings::default());
        let system = tridiagonal(4);
        let mut x = vec![0.0; 3];
        assert!(adapter.solve(&system, &mut x).is_err());
    }
}
