//! P1 tetrahedral finite elements for scalar potential problems
//!
//! This crate knows nothing about the physics it is used for. It provides:
//!
//! - **Meshes**: Gmsh MSH 2.2 / 4.1 ASCII readers and structured box generators
//! - **Assembly**: coefficient-weighted stiffness and mass, boundary face terms, loads
//! - **Coupled systems**: complex problems stored as interleaved real unknowns
//! - **Boundary conditions**: complex Dirichlet values, Robin faces
//! - **Solvers**: direct LU and preconditioned GMRES from `tower-em-solvers`
//! - **Post-processing**: element and nodal gradients
//!
//! # Example
//!
//! ```ignore
//! use tower_em_fem::{assembly, boundary, mesh, solver};
//!
//! let mesh = mesh::read_msh("tower.msh")?;
//! let k = assembly::assemble_weighted_stiffness(&mesh, &eps);
//! let m = assembly::assemble_weighted_mass(&mesh, &sigma);
//! let mut problem = assembly::CoupledProblem::from_blocks(&k, &m, &f, &zero);
//! boundary::apply_dirichlet(&mut problem, &mesh, &bcs);
//! let solution = solver::solve(&problem, &solver::SolverConfig::default())?;
//! ```

pub mod assembly;
pub mod basis;
pub mod boundary;
pub mod mesh;
pub mod postprocess;
pub mod quadrature;
pub mod solver;

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
