//! A complete run: mesh → materials → boundary conditions → two-stage solve
//! → field → filtered archive with metadata sidecar
//!
//! [`simulate`] does all the numerical work on a mesh already in memory, so
//! synthetic meshes can be driven without touching the file system.
//! [`run_simulation`] adds mesh loading and export.

use crate::config::RunConfig;
use crate::driver::{PotentialSolution, StageReport, solve_two_stage};
use crate::error::Result;
use crate::excitation::build_boundary_conditions;
use crate::export::{ExportFilter, ExportedFiles, FieldRecord, FilterInfo, archive_stem};
use crate::field::{ConductorFieldStats, ElectricField, conductor_field_stats};
use crate::formulation::{Formulation, GaussianSource};
use crate::materials::{MaterialField, MaterialTable, ResolvedSource, TowerLayout};
use crate::scaling::ScaleFactors;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tower_em_fem::mesh::{Mesh, MeshError, read_msh};

/// Nodes above this conductivity count as conductor in the sidecar statistics
const CONDUCTOR_SIGMA: f64 = 1.0;

/// Everything computed on the mesh nodes
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub materials: MaterialField,
    pub potential: PotentialSolution,
    pub field: ElectricField,
}

/// Robin coefficients as stored in the sidecar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobinParams {
    pub alpha: f64,
    pub beta: f64,
}

/// Contents of the `.json` file written next to each archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub date: String,
    pub mesh_file: PathBuf,
    pub solver: String,
    pub material_source: ResolvedSource,
    pub robin_params: RobinParams,
    pub max_conductivity: f64,
    pub preheat_factor: f64,
    pub frequency: f64,
    pub scale_factors: ScaleFactors,
    /// Wall time of the whole run (s)
    pub computation_time: f64,
    pub box_filter_info: FilterInfo,
    pub conductor_field: Option<ConductorFieldStats>,
    pub stages: Vec<StageReport>,
}

/// Result of [`run_simulation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub files: ExportedFiles,
    pub mesh_nodes: usize,
    pub exported_points: usize,
    pub e_mag_min: f64,
    pub e_mag_max: f64,
    pub metadata: RunMetadata,
}

/// Solve the potential and evaluate the field on `mesh`
pub fn simulate(mesh: &Mesh, config: &RunConfig) -> Result<SimulationOutput> {
    config.validate()?;
    let bounds = mesh.bounding_box().ok_or(MeshError::NoVolumeElements)?;
    let layout = TowerLayout::from_bounds(&bounds)?;
    let table = MaterialTable::new(config.max_conductivity);

    let materials = MaterialField::build(mesh, config.material_source, &table, &layout)?;
    let boundaries = build_boundary_conditions(
        mesh,
        &config.tags,
        config.line_voltage,
        config.robin_alpha,
        config.robin_coeff,
    );
    let source = GaussianSource::centered(&bounds, config.source_amplitude);
    let formulation = Formulation::assemble(
        mesh,
        &materials,
        &boundaries,
        &source,
        &config.scaling,
        config.omega(),
    );

    let potential = solve_two_stage(
        mesh,
        &formulation,
        &boundaries,
        config.preheat_factor,
        &config.solver.to_solver_config(),
    )?;
    let field = ElectricField::from_potential(mesh, &potential.phi_real, &potential.phi_imag);

    Ok(SimulationOutput {
        materials,
        potential,
        field,
    })
}

/// Filter, write the archive and its sidecar. Nothing is written when the
/// filter selects no node.
pub fn export_output(
    mesh: &Mesh,
    config: &RunConfig,
    output: &SimulationOutput,
    computation_time: f64,
) -> Result<RunSummary> {
    let filter = ExportFilter::from_mesh(mesh, &config.export).ok_or(MeshError::NoVolumeElements)?;
    let selection = filter.select(&mesh.nodes, &output.materials.nodes);
    let info = selection.info();
    log::info!(
        "Export filter: {} of {} nodes in the box, {} in air ({:.1}%)",
        info.box_points,
        info.total_points,
        info.box_air_points,
        info.percentage
    );

    let record = FieldRecord::gather(
        mesh,
        &output.potential.phi_real,
        &output.potential.phi_imag,
        &output.field,
        &output.materials.nodes,
        &selection,
        config.frequency,
    )?;

    let now = chrono::Local::now();
    let stem = archive_stem(&config.prefix, &now);
    let files = ExportedFiles::new(&config.output_dir, &stem);

    let metadata = RunMetadata {
        date: now.to_rfc3339(),
        mesh_file: config.mesh_file.clone(),
        solver: config.solver.method.name().to_string(),
        material_source: output.materials.source,
        robin_params: RobinParams {
            alpha: config.robin_alpha,
            beta: config.robin_coeff,
        },
        max_conductivity: config.max_conductivity,
        preheat_factor: config.preheat_factor,
        frequency: config.frequency,
        scale_factors: config.scaling,
        computation_time,
        box_filter_info: info,
        conductor_field: conductor_field_stats(
            &output.field.e_mag,
            &output.materials.nodes,
            CONDUCTOR_SIGMA,
        ),
        stages: output.potential.stages.clone(),
    };

    files.write(&record, &metadata)?;

    let (e_mag_min, e_mag_max) = record
        .e_mag
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    Ok(RunSummary {
        files,
        mesh_nodes: mesh.num_nodes(),
        exported_points: record.len(),
        e_mag_min,
        e_mag_max,
        metadata,
    })
}

/// Run one simulation described by `config`.
///
/// The configuration is validated before the mesh is read, and a failed run
/// leaves no archive behind.
pub fn run_simulation(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;
    let start = Instant::now();

    let mesh = read_msh(&config.mesh_file)?;
    let output = simulate(&mesh, config)?;
    let summary = export_output(&mesh, config, &output, start.elapsed().as_secs_f64())?;

    log::info!(
        "Run finished in {:.1} s: {} points, |E| {:.3e} .. {:.3e} V/m",
        summary.metadata.computation_time,
        summary.exported_points,
        summary.e_mag_min,
        summary.e_mag_max
    );
    Ok(summary)
}

/// Print the outcome of a run
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Run Summary ===");
    println!("Archive:  {}", summary.files.archive.display());
    println!("Metadata: {}", summary.files.metadata.display());
    println!(
        "Points:   {} of {} nodes ({:.1}%)",
        summary.exported_points,
        summary.mesh_nodes,
        summary.metadata.box_filter_info.percentage
    );
    println!(
        "|E|:      {:.3e} .. {:.3e} V/m",
        summary.e_mag_min, summary.e_mag_max
    );
    for stage in &summary.metadata.stages {
        println!(
            "{}: {} iterations, residual {}{}",
            stage.stage,
            stage.iterations,
            stage
                .residual
                .map_or_else(|| "n/a".to_string(), |r| format!("{r:.2e}")),
            if stage.converged { "" } else { " (not converged)" }
        );
    }
    if let Some(c) = &summary.metadata.conductor_field {
        println!(
            "Conductor |E|: mean {:.3e}, max {:.3e} V/m over {} nodes",
            c.mean, c.max, c.nodes
        );
    }
    println!("Time:     {:.1} s", summary.metadata.computation_time);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TowerError;

    #[test]
    fn test_negative_cap_rejected_before_mesh_is_read() {
        let config = RunConfig {
            mesh_file: PathBuf::from("/nonexistent/tower.msh"),
            max_conductivity: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            run_simulation(&config),
            Err(TowerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_mesh_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            mesh_file: dir.path().join("missing.msh"),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        assert!(matches!(
            run_simulation(&config),
            Err(TowerError::Mesh(MeshError::Io { .. }))
        ));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_empty_mesh_rejected() {
        assert!(matches!(
            simulate(&Mesh::new(), &RunConfig::default()),
            Err(TowerError::Mesh(MeshError::NoVolumeElements))
        ));
    }
}
