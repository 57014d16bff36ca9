//! Error type for tower simulation runs

use std::path::PathBuf;
use thiserror::Error;
use tower_em_fem::mesh::MeshError;
use tower_em_fem::solver::SolverError;

/// Solve stage that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Preheat,
    Full,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Preheat => f.write_str("stage 1 (pre-heat)"),
            Stage::Full => f.write_str("stage 2 (full contrast)"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TowerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load mesh")]
    Mesh(#[from] MeshError),

    #[error("{stage} did not converge after {iterations} iterations (residual {residual:.3e})")]
    Convergence {
        stage: Stage,
        iterations: usize,
        residual: f64,
    },

    #[error("{stage} solver failed")]
    Solver {
        stage: Stage,
        #[source]
        source: SolverError,
    },

    #[error(
        "Export filter selected no points ({box_points} of {total} inside the box, none in air)"
    )]
    EmptySelection { total: usize, box_points: usize },

    #[error("Failed to write {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: ExportError,
    },

    #[error("Failed to read archive {}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: ExportError,
    },

    #[error("Cannot analyze an empty sample")]
    EmptySample,
}

/// Low-level causes of archive and sidecar failures
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    NpzWrite(#[from] ndarray_npy::WriteNpzError),
    #[error(transparent)]
    NpzRead(#[from] ndarray_npy::ReadNpzError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("archive is missing array '{0}'")]
    MissingArray(String),
    #[error("array '{name}' has {found} entries, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

impl TowerError {
    /// Map a solver failure to the error of the stage it happened in
    pub fn from_solver(stage: Stage, err: SolverError) -> Self {
        match err {
            SolverError::ConvergenceFailure {
                iterations,
                residual,
            } => TowerError::Convergence {
                stage,
                iterations,
                residual,
            },
            other => TowerError::Solver {
                stage,
                source: other,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, TowerError>;
