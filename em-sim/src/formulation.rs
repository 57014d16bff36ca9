//! Weak form of the complex potential problem
//!
//! With φ = φr + iφi and scaled coefficients ε̃, σ̃, ω̃:
//!
//! ```text
//! real rows :  (ε̃K + R) φr − ω̃σ̃M φi = f
//! imag rows :  ω̃σ̃M φr + (ε̃K + R) φi = 0
//! ```
//!
//! K is the ε-weighted stiffness, M the σ-weighted mass and R the Robin
//! face term on the far-field box. The blocks are assembled once; each
//! stage builds its own coupled system from them.

use crate::excitation::BoundarySet;
use crate::materials::MaterialField;
use crate::scaling::ScaleFactors;
use ndarray::Array1;
use num_complex::Complex64;
use std::collections::BTreeMap;
use tower_em_fem::assembly::{
    CoupledProblem, TripletMatrix, assemble_load, assemble_weighted_mass,
    assemble_weighted_stiffness,
};
use tower_em_fem::boundary::{apply_dirichlet, apply_robin};
use tower_em_fem::mesh::{BoundingBox, Mesh, Point};

/// Gaussian volume source exp(−r² / 2w²) scaled by `amplitude`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianSource {
    pub center: Point,
    pub width: f64,
    pub amplitude: f64,
}

impl GaussianSource {
    /// Centered in the box with width 0.1·min(xs, ys, zs)
    pub fn centered(bounds: &BoundingBox, amplitude: f64) -> Self {
        let [xs, ys, zs] = bounds.size();
        Self {
            center: bounds.center(),
            width: 0.1 * xs.min(ys).min(zs),
            amplitude,
        }
    }

    pub fn evaluate(&self, p: &Point) -> f64 {
        let r2 = (p.x - self.center.x).powi(2)
            + (p.y - self.center.y).powi(2)
            + (p.z - self.center.z).powi(2);
        self.amplitude * (-r2 / (2.0 * self.width * self.width)).exp()
    }
}

/// Assembled blocks shared by both solve stages
#[derive(Debug, Clone)]
pub struct Formulation {
    /// ε̃K + R
    pub operator: TripletMatrix,
    /// ω̃σ̃M at full conductivity
    pub conduction: TripletMatrix,
    /// Real load f; the imaginary load is zero
    pub load: Array1<f64>,
}

impl Formulation {
    pub fn assemble(
        mesh: &Mesh,
        materials: &MaterialField,
        boundaries: &BoundarySet,
        source: &GaussianSource,
        scaling: &ScaleFactors,
        omega: f64,
    ) -> Self {
        let omega_scaled = scaling.scale_omega(omega);
        let eps: Vec<f64> = materials
            .cells
            .iter()
            .map(|m| scaling.scale_epsilon(m.epsilon))
            .collect();
        let sigma: Vec<f64> = materials
            .cells
            .iter()
            .map(|m| omega_scaled * scaling.scale_sigma(m.sigma))
            .collect();

        let (sigma_lo, sigma_hi) = materials.sigma_range();
        let (eps_lo, eps_hi) = materials.epsilon_range();
        log::info!(
            "Permittivity {eps_lo:.3e} .. {eps_hi:.3e} F/m, scaled by {:.0e}",
            scaling.epsilon
        );
        log::info!(
            "Conductivity {sigma_lo:.3e} .. {sigma_hi:.3e} S/m, scaled by {:.0e}",
            scaling.sigma
        );
        log::info!("Angular frequency {omega:.4} rad/s, scaled to {omega_scaled:.4}");

        let mut operator = assemble_weighted_stiffness(mesh, &eps);
        apply_robin(&mut operator, mesh, &boundaries.robin);
        let conduction = assemble_weighted_mass(mesh, &sigma);
        let load = assemble_load(mesh, |p| source.evaluate(p));

        log::debug!(
            "Assembled operator ({} triplets), conduction ({} triplets), source peak {}",
            operator.nnz(),
            conduction.nnz(),
            source.amplitude
        );

        Self {
            operator,
            conduction,
            load,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.load.len()
    }

    /// Coupled system with the conduction block scaled by `sigma_factor` and
    /// the Dirichlet values imposed
    pub fn coupled_problem(
        &self,
        mesh: &Mesh,
        boundaries: &BoundarySet,
        sigma_factor: f64,
    ) -> (CoupledProblem, BTreeMap<usize, Complex64>) {
        let n = self.num_nodes();
        let mut conduction = TripletMatrix::new(n);
        conduction.add_scaled(&self.conduction, sigma_factor);
        let zero = Array1::zeros(n);
        let mut problem =
            CoupledProblem::from_blocks(&self.operator, &conduction, &self.load, &zero);
        let fixed = apply_dirichlet(&mut problem, mesh, &boundaries.dirichlet);
        (problem, fixed)
    }
}
