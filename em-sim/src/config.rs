//! JSON configuration for a tower simulation run
//!
//! Every field has a default, so an empty `{}` file is a valid
//! configuration. Command-line flags override file values; [`RunConfig::validate`]
//! runs before any mesh is read.

use crate::error::{Result, TowerError};
use crate::excitation::BoundaryTags;
use crate::materials::MaterialSource;
use crate::scaling::ScaleFactors;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tower_em_fem::solver::{SolverConfig, SolverType};
use tower_em_solvers::GmresConfig;

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Gmsh mesh (MSH 2.2 or 4.1 ASCII)
    pub mesh_file: PathBuf,
    /// Directory receiving the archive and its sidecar
    pub output_dir: PathBuf,
    /// Archive name prefix, completed with a timestamp
    pub prefix: String,
    /// Upper bound applied to metal conductivities (S/m)
    pub max_conductivity: f64,
    /// Robin gradient coefficient β
    pub robin_coeff: f64,
    /// Robin value coefficient α
    pub robin_alpha: f64,
    /// Conductivity attenuation of the first stage
    pub preheat_factor: f64,
    /// Excitation frequency (Hz)
    pub frequency: f64,
    /// Phase voltage amplitude (V)
    pub line_voltage: f64,
    /// Peak of the Gaussian volume source
    pub source_amplitude: f64,
    pub material_source: MaterialSource,
    pub tags: BoundaryTags,
    pub scaling: ScaleFactors,
    pub solver: SolverSettings,
    pub export: ExportSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mesh_file: PathBuf::from("tower.msh"),
            output_dir: PathBuf::from("results"),
            prefix: "tower_electric_field".to_string(),
            max_conductivity: 35000.0,
            robin_coeff: 0.5,
            robin_alpha: 1.0,
            preheat_factor: 0.1,
            frequency: 50.0,
            line_voltage: 120e3,
            source_amplitude: 100.0,
            material_source: MaterialSource::default(),
            tags: BoundaryTags::default(),
            scaling: ScaleFactors::default(),
            solver: SolverSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

/// Linear solver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub method: SolverType,
    /// Restart cycles
    pub max_iterations: usize,
    pub restart: usize,
    /// Relative residual target
    pub tolerance: f64,
    /// Largest system handed to the dense LU
    pub direct_max_dofs: usize,
    /// Log GMRES progress every N iterations (0 disables)
    pub print_interval: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        let base = SolverConfig::default();
        Self {
            method: base.solver_type,
            max_iterations: base.gmres.max_iterations,
            restart: base.gmres.restart,
            tolerance: base.gmres.tolerance,
            direct_max_dofs: base.direct_max_dofs,
            print_interval: 0,
        }
    }
}

impl SolverSettings {
    pub fn to_solver_config(&self) -> SolverConfig {
        SolverConfig {
            solver_type: self.method,
            gmres: GmresConfig {
                max_iterations: self.max_iterations,
                restart: self.restart,
                tolerance: self.tolerance,
                print_interval: self.print_interval,
            },
            direct_max_dofs: self.direct_max_dofs,
        }
    }
}

/// Point filter applied before export
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Fraction of each box extent removed on every side
    pub buffer_fraction: f64,
    /// Points with σ at or above this are dropped
    pub sigma_threshold: f64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            buffer_fraction: 0.01,
            sigma_threshold: 1e-8,
        }
    }
}

fn check(ok: bool, message: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(TowerError::InvalidConfig(message()))
    }
}

impl RunConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            TowerError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            TowerError::InvalidConfig(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TowerError::InvalidConfig(format!("failed to serialize config: {e}")))?;
        fs::write(path, json).map_err(|e| {
            TowerError::InvalidConfig(format!("failed to write {}: {e}", path.display()))
        })
    }

    /// Reject values no run can succeed with
    pub fn validate(&self) -> Result<()> {
        let cap = self.max_conductivity;
        check(cap.is_finite() && cap >= 0.0, || {
            format!("max_conductivity must be a non-negative number, got {cap}")
        })?;
        check(self.robin_alpha.is_finite() && self.robin_alpha > 0.0, || {
            format!("robin_alpha must be positive, got {}", self.robin_alpha)
        })?;
        check(self.robin_coeff.is_finite() && self.robin_coeff >= 0.0, || {
            format!("robin_coeff must be a non-negative number, got {}", self.robin_coeff)
        })?;
        let preheat = self.preheat_factor;
        check(preheat > 0.0 && preheat <= 1.0, || {
            format!("preheat_factor must lie in (0, 1], got {preheat}")
        })?;
        check(self.frequency.is_finite() && self.frequency > 0.0, || {
            format!("frequency must be positive, got {}", self.frequency)
        })?;
        check(self.line_voltage.is_finite(), || {
            format!("line_voltage must be finite, got {}", self.line_voltage)
        })?;
        check(self.source_amplitude.is_finite(), || {
            format!("source_amplitude must be finite, got {}", self.source_amplitude)
        })?;
        check(!self.prefix.trim().is_empty(), || "prefix must not be empty".to_string())?;
        check(!self.prefix.contains(['/', '\\']), || {
            format!("prefix must be a file name, got {:?}", self.prefix)
        })?;
        self.scaling.validate()?;

        let s = &self.solver;
        check(s.tolerance.is_finite() && s.tolerance > 0.0, || {
            format!("solver tolerance must be positive, got {}", s.tolerance)
        })?;
        check(s.restart > 0 && s.max_iterations > 0, || {
            "solver restart and max_iterations must be at least 1".to_string()
        })?;

        let e = &self.export;
        check(
            e.buffer_fraction.is_finite() && (0.0..0.5).contains(&e.buffer_fraction),
            || format!("export buffer_fraction must lie in [0, 0.5), got {}", e.buffer_fraction),
        )?;
        check(e.sigma_threshold.is_finite() && e.sigma_threshold > 0.0, || {
            format!("export sigma_threshold must be positive, got {}", e.sigma_threshold)
        })?;
        Ok(())
    }

    pub fn omega(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.frequency
    }
}

/// Print a short summary of the configuration
pub fn print_config_summary(config: &RunConfig) {
    println!("=== Tower Field Configuration ===");
    println!("Mesh: {}", config.mesh_file.display());
    println!(
        "Output: {}/{}_<timestamp>.npz",
        config.output_dir.display(),
        config.prefix
    );
    println!(
        "Frequency: {} Hz, phase voltage {:.1} kV",
        config.frequency,
        config.line_voltage / 1e3
    );
    println!("Max conductivity: {} S/m", config.max_conductivity);
    println!(
        "Robin: alpha = {}, beta = {}",
        config.robin_alpha, config.robin_coeff
    );
    println!(
        "Solver: {} (restart {}, tol {:.1e})",
        config.solver.method, config.solver.restart, config.solver.tolerance
    );
    println!("Materials: {:?}", config.material_source);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RunConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_conductivity, 35000.0);
        assert_eq!(config.robin_coeff, 0.5);
        assert_eq!(config.solver.method, SolverType::GmresIlu);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{
                "max_conductivity": 1000,
                "solver": {"method": "gmres-jacobi"},
                "tags": {"tower": 42}
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_conductivity, 1000.0);
        assert_eq!(config.solver.method, SolverType::GmresJacobi);
        assert_eq!(config.solver.restart, SolverSettings::default().restart);
        assert_eq!(config.tags.tower, 42);
        assert_eq!(config.tags.box_boundary, 10);
        assert_eq!(config.prefix, "tower_electric_field");
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases: [fn(&mut RunConfig); 11] = [
            |c| c.max_conductivity = -1.0,
            |c| c.max_conductivity = f64::NAN,
            |c| c.robin_alpha = 0.0,
            |c| c.robin_coeff = f64::INFINITY,
            |c| c.preheat_factor = 0.0,
            |c| c.preheat_factor = 1.5,
            |c| c.prefix = "  ".to_string(),
            |c| c.prefix = "a/b".to_string(),
            |c| c.scaling.sigma = 0.0,
            |c| c.solver.tolerance = -1e-6,
            |c| c.export.buffer_fraction = 0.5,
        ];
        for (i, mutate) in cases.into_iter().enumerate() {
            let mut config = RunConfig::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(TowerError::InvalidConfig(_))),
                "case {i} was accepted"
            );
        }
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut config = RunConfig::default();
        config.robin_coeff = 0.8;
        config.material_source = MaterialSource::Spatial;
        config.to_file(&path).unwrap();
        assert_eq!(RunConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = RunConfig::from_file("/nonexistent/run.json").unwrap_err();
        assert!(matches!(err, TowerError::InvalidConfig(_)));
    }

    #[test]
    fn test_solver_config_mapping() {
        let mut settings = SolverSettings::default();
        settings.method = SolverType::Direct;
        settings.restart = 30;
        let config = settings.to_solver_config();
        assert_eq!(config.solver_type, SolverType::Direct);
        assert_eq!(config.gmres.restart, 30);
    }
}
