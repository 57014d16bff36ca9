//! Solvers for the assembled coupled system
//!
//! The interleaved real system produced by [`CoupledProblem`] is solved with
//! sparse kernels from `tower-em-solvers`.
//!
//! # Solver Types
//!
//! - **Direct**: dense LU, refused above `direct_max_dofs`
//! - **GMRES**: restarted GMRES without preconditioning
//! - **GMRES+ILU**: GMRES with ILU(0) (default)
//! - **GMRES+Jacobi**: GMRES with diagonal scaling, fully parallel

use crate::assembly::CoupledProblem;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;
use thiserror::Error;
use tower_em_solvers::{
    CsrMatrix, DiagonalPreconditioner, GmresConfig, GmresSolution, IdentityPreconditioner,
    IluPreconditioner, LuError, gmres_preconditioned_with_guess, lu_solve,
};

/// Solver configuration
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub solver_type: SolverType,
    /// GMRES parameters, ignored by the direct solver
    pub gmres: GmresConfig<f64>,
    /// Largest system the dense LU accepts
    pub direct_max_dofs: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            solver_type: SolverType::GmresIlu,
            gmres: GmresConfig {
                max_iterations: 40,
                restart: 100,
                tolerance: 1e-8,
                print_interval: 0,
            },
            direct_max_dofs: 4000,
        }
    }
}

/// Type of solver to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverType {
    /// Dense LU (small problems only)
    Direct,
    /// GMRES without preconditioning
    Gmres,
    /// GMRES with ILU(0) preconditioning
    #[default]
    GmresIlu,
    /// GMRES with Jacobi (diagonal) preconditioning
    GmresJacobi,
}

impl SolverType {
    pub fn name(&self) -> &'static str {
        match self {
            SolverType::Direct => "direct",
            SolverType::Gmres => "gmres",
            SolverType::GmresIlu => "gmres-ilu",
            SolverType::GmresJacobi => "gmres-jacobi",
        }
    }
}

impl std::fmt::Display for SolverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" | "lu" => Ok(SolverType::Direct),
            "gmres" => Ok(SolverType::Gmres),
            "gmres-ilu" | "ilu" => Ok(SolverType::GmresIlu),
            "gmres-jacobi" | "jacobi" => Ok(SolverType::GmresJacobi),
            other => Err(format!(
                "unknown solver '{other}' (expected direct, gmres, gmres-ilu or gmres-jacobi)"
            )),
        }
    }
}

/// Solution of the coupled system
#[derive(Debug, Clone)]
pub struct Solution {
    /// Interleaved unknowns
    pub values: Array1<f64>,
    /// Inner iterations (0 for the direct solver)
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
    pub converged: bool,
}

/// Solver errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("Solver failed to converge after {iterations} iterations (residual: {residual:.3e})")]
    ConvergenceFailure { iterations: usize, residual: f64 },
    #[error("Direct solver failed: singular matrix")]
    SingularMatrix,
    #[error("Matrix dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("System with {dofs} unknowns exceeds the direct solver limit of {limit}")]
    TooLarge { dofs: usize, limit: usize },
}

impl From<LuError> for SolverError {
    fn from(err: LuError) -> Self {
        match err {
            LuError::SingularMatrix => SolverError::SingularMatrix,
            LuError::DimensionMismatch { expected, got } => SolverError::DimensionMismatch {
                expected,
                actual: got,
            },
        }
    }
}

/// Solve a coupled problem from a zero initial guess
pub fn solve(problem: &CoupledProblem, config: &SolverConfig) -> Result<Solution, SolverError> {
    solve_with_guess(problem, None, config)
}

/// Solve a coupled problem, seeding iterative solvers with `x0`
pub fn solve_with_guess(
    problem: &CoupledProblem,
    x0: Option<&Array1<f64>>,
    config: &SolverConfig,
) -> Result<Solution, SolverError> {
    let start = Instant::now();
    let csr = problem.matrix.to_csr();
    log::debug!(
        "System: {} unknowns, {} nnz, CSR convert {:.1}ms",
        csr.num_rows,
        csr.nnz(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    solve_csr_with_guess(&csr, &problem.rhs, x0, config)
}

/// Solve A x = b for an assembled CSR matrix
pub fn solve_csr_with_guess(
    csr: &CsrMatrix<f64>,
    rhs: &Array1<f64>,
    x0: Option<&Array1<f64>>,
    config: &SolverConfig,
) -> Result<Solution, SolverError> {
    let n = csr.num_rows;
    if csr.num_cols != n || rhs.len() != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            actual: if csr.num_cols != n { csr.num_cols } else { rhs.len() },
        });
    }
    if let Some(guess) = x0.filter(|g| g.len() != n) {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            actual: guess.len(),
        });
    }

    let start = Instant::now();
    let result = match config.solver_type {
        SolverType::Direct => solve_direct(csr, rhs, config),
        SolverType::Gmres => {
            let result = gmres_preconditioned_with_guess(
                csr,
                &IdentityPreconditioner,
                rhs,
                x0,
                &config.gmres,
            );
            finish_gmres("GMRES", result)
        }
        SolverType::GmresIlu => {
            let ilu_start = Instant::now();
            let precond = IluPreconditioner::from_csr(csr);
            log::debug!(
                "ILU(0) factorization: {:.1}ms",
                ilu_start.elapsed().as_secs_f64() * 1000.0
            );
            let result = gmres_preconditioned_with_guess(csr, &precond, rhs, x0, &config.gmres);
            finish_gmres("GMRES+ILU", result)
        }
        SolverType::GmresJacobi => {
            let precond = DiagonalPreconditioner::from_csr(csr);
            let result = gmres_preconditioned_with_guess(csr, &precond, rhs, x0, &config.gmres);
            finish_gmres("GMRES+Jacobi", result)
        }
    };

    if let Ok(ref sol) = result {
        log::info!(
            "Solve ({}): {} iters, residual {:.2e}, time {:.1}ms",
            config.solver_type,
            sol.iterations,
            sol.residual,
            start.elapsed().as_secs_f64() * 1000.0
        );
    }
    result
}

fn solve_direct(
    csr: &CsrMatrix<f64>,
    rhs: &Array1<f64>,
    config: &SolverConfig,
) -> Result<Solution, SolverError> {
    if csr.num_rows > config.direct_max_dofs {
        return Err(SolverError::TooLarge {
            dofs: csr.num_rows,
            limit: config.direct_max_dofs,
        });
    }

    let values = lu_solve(&csr.to_dense(), rhs)?;
    let residual = relative_residual(csr, &values, rhs);

    Ok(Solution {
        values,
        iterations: 0,
        residual,
        converged: true,
    })
}

fn finish_gmres(label: &str, result: GmresSolution<f64>) -> Result<Solution, SolverError> {
    log::debug!(
        "{} {} in {} iterations ({} restarts, residual {:.2e})",
        label,
        if result.converged {
            "converged"
        } else {
            "did not converge"
        },
        result.iterations,
        result.restarts,
        result.residual
    );

    if !result.converged {
        return Err(SolverError::ConvergenceFailure {
            iterations: result.iterations,
            residual: result.residual,
        });
    }

    Ok(Solution {
        values: result.x,
        iterations: result.iterations,
        residual: result.residual,
        converged: true,
    })
}

/// ‖b − A x‖ / ‖b‖, or ‖A x‖ when b is zero
pub fn relative_residual(csr: &CsrMatrix<f64>, x: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let r = b - &csr.matvec(x);
    let r_norm = r.dot(&r).sqrt();
    let b_norm = b.dot(b).sqrt();
    if b_norm > 0.0 { r_norm / b_norm } else { r_norm }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{TripletMatrix, assemble_weighted_mass, assemble_weighted_stiffness};
    use crate::mesh::unit_cube_tetrahedra;
    use approx::assert_relative_eq;

    /// (K + M) + i·M on a small cube with a unit real load
    fn coupled_problem() -> CoupledProblem {
        let mesh = unit_cube_tetrahedra(3);
        let ones = vec![1.0; mesh.num_elements()];
        let mut a = assemble_weighted_stiffness(&mesh, &ones);
        let m = assemble_weighted_mass(&mesh, &ones);
        a.add_scaled(&m, 1.0);
        let f = Array1::from_elem(mesh.num_nodes(), 1.0);
        let zero = Array1::zeros(mesh.num_nodes());
        CoupledProblem::from_blocks(&a, &m, &f, &zero)
    }

    fn tight_config(solver_type: SolverType) -> SolverConfig {
        SolverConfig {
            solver_type,
            gmres: GmresConfig {
                max_iterations: 50,
                restart: 64,
                tolerance: 1e-10,
                print_interval: 0,
            },
            direct_max_dofs: 1000,
        }
    }

    #[test]
    fn test_iterative_solvers_match_direct() {
        let problem = coupled_problem();
        let direct = solve(&problem, &tight_config(SolverType::Direct)).unwrap();
        assert!(direct.residual < 1e-12);

        for solver_type in [SolverType::Gmres, SolverType::GmresIlu, SolverType::GmresJacobi] {
            let sol = solve(&problem, &tight_config(solver_type)).unwrap();
            assert!(sol.converged);
            for (x, y) in sol.values.iter().zip(direct.values.iter()) {
                assert_relative_eq!(x, y, epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn test_guess_reduces_iterations() {
        let problem = coupled_problem();
        let mut config = tight_config(SolverType::GmresJacobi);
        let cold = solve(&problem, &config).unwrap();
        assert!(cold.iterations > 0);
        config.gmres.tolerance = 1e-8;
        let warm = solve_with_guess(&problem, Some(&cold.values), &config).unwrap();
        assert_eq!(warm.iterations, 0);
    }

    #[test]
    fn test_direct_refuses_large_systems() {
        let problem = coupled_problem();
        let mut config = tight_config(SolverType::Direct);
        config.direct_max_dofs = 10;
        let err = solve(&problem, &config).unwrap_err();
        assert_eq!(err, SolverError::TooLarge { dofs: 128, limit: 10 });
    }

    #[test]
    fn test_convergence_failure_reported() {
        let problem = coupled_problem();
        let mut config = tight_config(SolverType::Gmres);
        config.gmres.max_iterations = 1;
        config.gmres.restart = 2;
        config.gmres.tolerance = 1e-14;
        match solve(&problem, &config) {
            Err(SolverError::ConvergenceFailure { iterations, residual }) => {
                assert!(iterations <= 2);
                assert!(residual > 1e-14);
            }
            other => panic!("expected convergence failure, got {other:?}"),
        }
    }

    #[test]
    fn test_guess_length_checked() {
        let problem = coupled_problem();
        let bad = Array1::zeros(3);
        let err = solve_with_guess(&problem, Some(&bad), &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::DimensionMismatch { actual: 3, .. }));
    }

    #[test]
    fn test_singular_direct() {
        let csr = TripletMatrix::new(2).to_csr();
        let rhs = Array1::from(vec![1.0, 1.0]);
        let err = solve_csr_with_guess(&csr, &rhs, None, &tight_config(SolverType::Direct));
        assert_eq!(err.unwrap_err(), SolverError::SingularMatrix);
    }

    #[test]
    fn test_solver_type_parsing() {
        assert_eq!("gmres-ilu".parse::<SolverType>(), Ok(SolverType::GmresIlu));
        assert_eq!("Direct".parse::<SolverType>(), Ok(SolverType::Direct));
        assert!("cg".parse::<SolverType>().is_err());
        assert_eq!(SolverType::GmresJacobi.to_string(), "gmres-jacobi");
    }
}
