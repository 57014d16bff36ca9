//! Two-stage solve of the coupled potential system
//!
//! Stage 1 attenuates the conductivity by the pre-heat factor and solves from
//! zero. Stage 2 solves at full contrast seeded with the stage-1 potential. A
//! failed stage 1 only costs the warm start; a failed stage 2 fails the run.

use crate::error::{Result, Stage, TowerError};
use crate::excitation::BoundarySet;
use crate::formulation::Formulation;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tower_em_fem::assembly::deinterleave;
use tower_em_fem::mesh::Mesh;
use tower_em_fem::solver::{SolverConfig, SolverError, solve_with_guess};

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub sigma_factor: f64,
    pub iterations: usize,
    /// Final relative residual; `None` when the solver gave none
    pub residual: Option<f64>,
    pub converged: bool,
    pub warm_start: bool,
    pub seconds: f64,
}

/// Complex potential on the mesh nodes
#[derive(Debug, Clone)]
pub struct PotentialSolution {
    pub phi_real: Array1<f64>,
    pub phi_imag: Array1<f64>,
    pub stages: Vec<StageReport>,
    pub constrained_nodes: usize,
}

pub fn solve_two_stage(
    mesh: &Mesh,
    formulation: &Formulation,
    boundaries: &BoundarySet,
    preheat_factor: f64,
    solver: &SolverConfig,
) -> Result<PotentialSolution> {
    let mut stages = Vec::with_capacity(2);

    log::info!("Stage 1: conductivity scaled by {preheat_factor}");
    let start = Instant::now();
    let (problem, _) = formulation.coupled_problem(mesh, boundaries, preheat_factor);
    let guess = match solve_with_guess(&problem, None, solver) {
        Ok(solution) => {
            stages.push(StageReport {
                stage: Stage::Preheat,
                sigma_factor: preheat_factor,
                iterations: solution.iterations,
                residual: Some(solution.residual),
                converged: true,
                warm_start: false,
                seconds: start.elapsed().as_secs_f64(),
            });
            Some(solution.values)
        }
        Err(err) => {
            log::warn!("Stage 1 failed ({err}); stage 2 starts from zero");
            let (iterations, residual) = match err {
                SolverError::ConvergenceFailure {
                    iterations,
                    residual,
                } => (iterations, Some(residual)),
                _ => (0, None),
            };
            stages.push(StageReport {
                stage: Stage::Preheat,
                sigma_factor: preheat_factor,
                iterations,
                residual,
                converged: false,
                warm_start: false,
                seconds: start.elapsed().as_secs_f64(),
            });
            None
        }
    };
    drop(problem);

    log::info!("Stage 2: full conductivity");
    let start = Instant::now();
    let (problem, fixed) = formulation.coupled_problem(mesh, boundaries, 1.0);
    let solution = solve_with_guess(&problem, guess.as_ref(), solver)
        .map_err(|err| TowerError::from_solver(Stage::Full, err))?;
    stages.push(StageReport {
        stage: Stage::Full,
        sigma_factor: 1.0,
        iterations: solution.iterations,
        residual: Some(solution.residual),
        converged: true,
        warm_start: guess.is_some(),
        seconds: start.elapsed().as_secs_f64(),
    });

    let (phi_real, phi_imag) = deinterleave(&solution.values);
    log::info!(
        "Potential: real {:.3e} .. {:.3e} V, imaginary {:.3e} .. {:.3e} V",
        phi_real.fold(f64::INFINITY, |a, &b| a.min(b)),
        phi_real.fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        phi_imag.fold(f64::INFINITY, |a, &b| a.min(b)),
        phi_imag.fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
    );

    Ok(PotentialSolution {
        phi_real,
        phi_imag,
        stages,
        constrained_nodes: fixed.len(),
    })
}
