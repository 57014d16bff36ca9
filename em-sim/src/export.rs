//! Point-cloud export of the solved field
//!
//! Nodes inside the mesh box (shrunk by a buffer on every side) whose
//! conductivity is below a threshold are written to a compressed `.npz`
//! archive:
//!
//! | key | shape |
//! |---|---|
//! | `coordinates` | N×3 |
//! | `phi_real`, `phi_imag` | N |
//! | `E_real`, `E_imag` | N×3 |
//! | `E_mag` | N |
//! | `epsilon`, `sigma` | N |
//! | `freq` | scalar |
//!
//! A JSON sidecar with the same stem records how the archive was produced.
//! Both files are written to a temporary file first and renamed into place.

use crate::config::ExportSettings;
use crate::error::{ExportError, Result, TowerError};
use crate::field::ElectricField;
use crate::materials::Material;
use ndarray::{Array0, Array1, Array2, arr0};
use ndarray_npy::{NpzReader, NpzWriter};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tower_em_fem::mesh::{BoundingBox, Mesh, Point};

/// Array names of the archive, in write order
pub const ARCHIVE_KEYS: [&str; 9] = [
    "coordinates",
    "phi_real",
    "phi_imag",
    "E_real",
    "E_imag",
    "E_mag",
    "epsilon",
    "sigma",
    "freq",
];

/// Spatial and material filter applied before writing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportFilter {
    pub bounds: BoundingBox,
    pub sigma_threshold: f64,
}

impl ExportFilter {
    /// Mesh box shrunk by `buffer_fraction` of its extent on every side
    pub fn from_mesh(mesh: &Mesh, settings: &ExportSettings) -> Option<Self> {
        Some(Self {
            bounds: mesh.bounding_box()?.shrink(settings.buffer_fraction),
            sigma_threshold: settings.sigma_threshold,
        })
    }

    pub fn select(&self, points: &[Point], materials: &[Material]) -> Selection {
        let in_box: Vec<bool> = points.iter().map(|p| self.bounds.contains(p)).collect();
        let indices = in_box
            .iter()
            .zip(materials)
            .enumerate()
            .filter(|(_, (inside, m))| **inside && m.sigma < self.sigma_threshold)
            .map(|(i, _)| i)
            .collect();
        Selection {
            indices,
            total: points.len(),
            box_points: in_box.iter().filter(|&&b| b).count(),
        }
    }
}

/// Node indices passing the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub indices: Vec<usize>,
    pub total: usize,
    pub box_points: usize,
}

/// Counts written to the sidecar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, serde::Deserialize)]
pub struct FilterInfo {
    pub total_points: usize,
    pub box_points: usize,
    pub box_air_points: usize,
    pub percentage: f64,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn info(&self) -> FilterInfo {
        FilterInfo {
            total_points: self.total,
            box_points: self.box_points,
            box_air_points: self.len(),
            percentage: if self.total > 0 {
                100.0 * self.len() as f64 / self.total as f64
            } else {
                0.0
            },
        }
    }
}

/// Arrays of one archive, all indexed in parallel
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    pub coordinates: Array2<f64>,
    pub phi_real: Array1<f64>,
    pub phi_imag: Array1<f64>,
    pub e_real: Array2<f64>,
    pub e_imag: Array2<f64>,
    pub e_mag: Array1<f64>,
    pub epsilon: Array1<f64>,
    pub sigma: Array1<f64>,
    pub freq: f64,
}

impl FieldRecord {
    /// Gather the selected nodes. Fails with [`TowerError::EmptySelection`]
    /// when nothing passed the filter.
    pub fn gather(
        mesh: &Mesh,
        phi_real: &Array1<f64>,
        phi_imag: &Array1<f64>,
        field: &ElectricField,
        materials: &[Material],
        selection: &Selection,
        freq: f64,
    ) -> Result<Self> {
        if selection.is_empty() {
            return Err(TowerError::EmptySelection {
                total: selection.total,
                box_points: selection.box_points,
            });
        }
        let idx = &selection.indices;
        let n = idx.len();
        let pick = |values: &Array1<f64>| Array1::from_iter(idx.iter().map(|&i| values[i]));
        let pick_rows = |values: &Array2<f64>| {
            Array2::from_shape_fn((n, 3), |(r, c)| values[[idx[r], c]])
        };

        Ok(Self {
            coordinates: Array2::from_shape_fn((n, 3), |(r, c)| mesh.nodes[idx[r]].to_array()[c]),
            phi_real: pick(phi_real),
            phi_imag: pick(phi_imag),
            e_real: pick_rows(&field.e_real),
            e_imag: pick_rows(&field.e_imag),
            e_mag: pick(&field.e_mag),
            epsilon: Array1::from_iter(idx.iter().map(|&i| materials[i].epsilon)),
            sigma: Array1::from_iter(idx.iter().map(|&i| materials[i].sigma)),
            freq,
        })
    }

    pub fn len(&self) -> usize {
        self.e_mag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.e_mag.is_empty()
    }

    /// Every array has the same number of points
    pub fn check_lengths(&self) -> std::result::Result<(), ExportError> {
        let n = self.len();
        let rows = [
            ("coordinates", self.coordinates.nrows()),
            ("phi_real", self.phi_real.len()),
            ("phi_imag", self.phi_imag.len()),
            ("E_real", self.e_real.nrows()),
            ("E_imag", self.e_imag.nrows()),
            ("epsilon", self.epsilon.len()),
            ("sigma", self.sigma.len()),
        ];
        for (name, found) in rows {
            if found != n {
                return Err(ExportError::LengthMismatch {
                    name: name.to_string(),
                    expected: n,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// `{prefix}_{YYYYmmdd_HHMMSS}`
pub fn archive_stem(prefix: &str, time: &chrono::DateTime<chrono::Local>) -> String {
    format!("{prefix}_{}", time.format("%Y%m%d_%H%M%S"))
}

/// Write `record` as a compressed archive at `path`
pub fn write_archive(record: &FieldRecord, path: &Path) -> Result<()> {
    write_archive_inner(record, path).map_err(|source| TowerError::Export {
        path: path.to_path_buf(),
        source,
    })
}

fn write_archive_inner(record: &FieldRecord, path: &Path) -> std::result::Result<(), ExportError> {
    record.check_lengths()?;
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut npz = NpzWriter::new_compressed(tmp.as_file_mut());
        npz.add_array("coordinates", &record.coordinates)?;
        npz.add_array("phi_real", &record.phi_real)?;
        npz.add_array("phi_imag", &record.phi_imag)?;
        npz.add_array("E_real", &record.e_real)?;
        npz.add_array("E_imag", &record.e_imag)?;
        npz.add_array("E_mag", &record.e_mag)?;
        npz.add_array("epsilon", &record.epsilon)?;
        npz.add_array("sigma", &record.sigma)?;
        npz.add_array("freq", &arr0(record.freq))?;
        npz.finish()?;
    }
    tmp.persist(path).map_err(|e| ExportError::Io(e.error))?;
    log::info!("Wrote {} points to {}", record.len(), path.display());
    Ok(())
}

/// Write any serializable value as pretty JSON at `path`
pub fn write_sidecar<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let inner = || -> std::result::Result<(), ExportError> {
        let dir = parent_dir(path);
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), value)?;
        tmp.as_file_mut().write_all(b"\n")?;
        tmp.persist(path).map_err(|e| ExportError::Io(e.error))?;
        Ok(())
    };
    inner().map_err(|source| TowerError::Export {
        path: path.to_path_buf(),
        source,
    })
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Read an archive written by [`write_archive`]
pub fn read_archive(path: &Path) -> Result<FieldRecord> {
    read_archive_inner(path).map_err(|source| TowerError::Archive {
        path: path.to_path_buf(),
        source,
    })
}

fn read_archive_inner(path: &Path) -> std::result::Result<FieldRecord, ExportError> {
    let mut npz = NpzReader::new(File::open(path)?)?;
    let names = npz.names()?;
    let resolve = |key: &str| -> std::result::Result<String, ExportError> {
        let with_ext = format!("{key}.npy");
        names
            .iter()
            .find(|n| **n == with_ext || *n == key)
            .cloned()
            .ok_or_else(|| ExportError::MissingArray(key.to_string()))
    };

    let coordinates: Array2<f64> = npz.by_name(&resolve("coordinates")?)?;
    let phi_real: Array1<f64> = npz.by_name(&resolve("phi_real")?)?;
    let phi_imag: Array1<f64> = npz.by_name(&resolve("phi_imag")?)?;
    let e_real: Array2<f64> = npz.by_name(&resolve("E_real")?)?;
    let e_imag: Array2<f64> = npz.by_name(&resolve("E_imag")?)?;
    let e_mag: Array1<f64> = npz.by_name(&resolve("E_mag")?)?;
    let epsilon: Array1<f64> = npz.by_name(&resolve("epsilon")?)?;
    let sigma: Array1<f64> = npz.by_name(&resolve("sigma")?)?;
    let freq: Array0<f64> = npz.by_name(&resolve("freq")?)?;

    let record = FieldRecord {
        coordinates,
        phi_real,
        phi_imag,
        e_real,
        e_imag,
        e_mag,
        epsilon,
        sigma,
        freq: freq.into_scalar(),
    };
    record.check_lengths()?;
    Ok(record)
}

/// Paths of a written archive and its sidecar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ExportedFiles {
    pub archive: PathBuf,
    pub metadata: PathBuf,
}

impl ExportedFiles {
    pub fn new(output_dir: &Path, stem: &str) -> Self {
        Self {
            archive: output_dir.join(format!("{stem}.npz")),
            metadata: output_dir.join(format!("{stem}.json")),
        }
    }

    /// Write the archive, then its sidecar. The archive is removed again if
    /// the sidecar cannot be written.
    pub fn write<T: Serialize>(&self, record: &FieldRecord, metadata: &T) -> Result<()> {
        write_archive(record, &self.archive)?;
        if let Err(err) = write_sidecar(metadata, &self.metadata) {
            if let Err(e) = fs::remove_file(&self.archive) {
                log::warn!("Could not remove {}: {e}", self.archive.display());
            }
            return Err(err);
        }
        Ok(())
    }
}
