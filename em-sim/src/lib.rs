//! Electric field around a three-phase transmission tower
//!
//! Solves the complex scalar potential of a double-circuit tower at power
//! frequency and exports the field as a point cloud. The numerical core lives
//! in `tower-em-fem`; this crate adds the tower-specific parts:
//!
//! - **Materials**: tanh region indicators or mesh volume ids, with conductor priority
//! - **Excitation**: balanced phase potentials, grounded tower, Robin far field
//! - **Two-stage solve**: attenuated conductivity first, then full contrast
//! - **Export**: filtered `.npz` archive with a JSON sidecar
//! - **Tooling**: field statistics, HTML plots, parameter sweeps and a `.geo` writer
//!
//! # Example
//!
//! ```ignore
//! use tower_em_sim::{RunConfig, run_simulation};
//!
//! let config = RunConfig {
//!     mesh_file: "tower.msh".into(),
//!     max_conductivity: 15000.0,
//!     ..Default::default()
//! };
//! let summary = run_simulation(&config)?;
//! println!("wrote {}", summary.files.archive.display());
//! ```

pub mod analysis;
pub mod batch;
pub mod config;
pub mod driver;
pub mod error;
pub mod excitation;
pub mod export;
pub mod field;
pub mod formulation;
pub mod geometry;
pub mod materials;
pub mod plots;
pub mod scaling;
pub mod simulation;

pub use config::RunConfig;
pub use error::{Result, Stage, TowerError};
pub use simulation::{RunSummary, run_simulation, simulate};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
