//! End-to-end runs on a small synthetic tower box

use approx::assert_relative_eq;
use std::fmt::Write as _;
use std::path::Path;
use tower_em_fem::mesh::{Mesh, box_mesh_tetrahedra};
use tower_em_fem::solver::SolverType;
use tower_em_sim::batch::{BatchCase, run_batch};
use tower_em_sim::excitation::Phase;
use tower_em_sim::export::read_archive;
use tower_em_sim::plots::write_comparison_plots;
use tower_em_sim::simulation::{RunMetadata, export_output};
use tower_em_sim::{RunConfig, Stage, TowerError, run_simulation, simulate};

const BOX: i32 = 10;
const PHASE_A: i32 = 11;
const PHASE_B: i32 = 12;
const PHASE_C: i32 = 13;
const TOWER: i32 = 17;

/// 2 × 1 × 1 box: grounded floor, three phase strips on the lid, Robin sides.
/// The tower body spans the middle of the box, so the outer columns are air.
fn tower_box() -> Mesh {
    let mut mesh = box_mesh_tetrahedra(0.0, 2.0, 0.0, 1.0, 0.0, 1.0, 8, 4, 4);
    mesh.mark_boundary(BOX, |_| true);
    mesh.mark_boundary(TOWER, |c| c.z < 1e-9);
    mesh.mark_boundary(PHASE_A, |c| c.z > 1.0 - 1e-9 && c.x < 0.5);
    mesh.mark_boundary(PHASE_B, |c| c.z > 1.0 - 1e-9 && c.x > 0.75 && c.x < 1.25);
    mesh.mark_boundary(PHASE_C, |c| c.z > 1.0 - 1e-9 && c.x > 1.5);
    mesh
}

fn direct_config(output_dir: &Path) -> RunConfig {
    let mut config = RunConfig {
        output_dir: output_dir.to_path_buf(),
        prefix: "synthetic".to_string(),
        ..Default::default()
    };
    config.solver.method = SolverType::Direct;
    config
}

fn write_msh_v2(mesh: &Mesh, path: &Path) {
    let mut s = String::new();
    writeln!(s, "$MeshFormat\n2.2 0 8\n$EndMeshFormat").unwrap();
    writeln!(s, "$Nodes\n{}", mesh.num_nodes()).unwrap();
    for (i, p) in mesh.nodes.iter().enumerate() {
        writeln!(s, "{} {} {} {}", i + 1, p.x, p.y, p.z).unwrap();
    }
    writeln!(s, "$EndNodes").unwrap();
    writeln!(s, "$Elements\n{}", mesh.boundaries.len() + mesh.num_elements()).unwrap();
    let mut id = 1;
    for face in &mesh.boundaries {
        let [a, b, c] = face.nodes;
        writeln!(s, "{id} 2 2 {m} {m} {} {} {}", a + 1, b + 1, c + 1, m = face.marker).unwrap();
        id += 1;
    }
    for elem in &mesh.elements {
        let [a, b, c, d] = elem.nodes;
        writeln!(s, "{id} 4 2 0 0 {} {} {} {}", a + 1, b + 1, c + 1, d + 1).unwrap();
        id += 1;
    }
    writeln!(s, "$EndElements").unwrap();
    std::fs::write(path, s).unwrap();
}

#[test]
fn test_two_stage_solve_honours_boundary_values() {
    let mesh = tower_box();
    let config = direct_config(Path::new("unused"));
    let output = simulate(&mesh, &config).unwrap();

    let stages = &output.potential.stages;
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0].stage, Stage::Preheat);
    assert_relative_eq!(stages[0].sigma_factor, 0.1);
    assert!(stages[0].converged);
    assert_eq!(stages[1].stage, Stage::Full);
    assert!(stages[1].warm_start);
    assert!(stages[1].converged);

    let va = Phase::A.voltage(config.line_voltage);
    for node in mesh.nodes_with_marker(PHASE_A) {
        assert_relative_eq!(output.potential.phi_real[node], va.re, epsilon = 1e-6);
        assert_relative_eq!(output.potential.phi_imag[node], va.im, epsilon = 1e-6);
    }
    let vc = Phase::C.voltage(config.line_voltage);
    for node in mesh.nodes_with_marker(PHASE_C) {
        assert_relative_eq!(output.potential.phi_real[node], vc.re, epsilon = 1e-6);
        assert_relative_eq!(output.potential.phi_imag[node], vc.im, epsilon = 1e-6);
    }
    for node in mesh.nodes_with_marker(TOWER) {
        assert!(output.potential.phi_real[node].abs() < 1e-6);
        assert!(output.potential.phi_imag[node].abs() < 1e-6);
    }

    for (i, &e) in output.field.e_mag.iter().enumerate() {
        let re = output.field.e_real.row(i);
        let im = output.field.e_imag.row(i);
        let norm = (re.dot(&re) + im.dot(&im)).sqrt();
        assert!(e >= 0.0);
        assert_relative_eq!(e, norm, max_relative = 1e-12, epsilon = 1e-9);
    }
}

#[test]
fn test_two_stage_solve_is_deterministic() {
    let mesh = tower_box();
    let config = direct_config(Path::new("unused"));
    let first = simulate(&mesh, &config).unwrap();
    let second = simulate(&mesh, &config).unwrap();

    let scale = config.line_voltage;
    for (a, b) in first.potential.phi_real.iter().zip(&second.potential.phi_real) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9 * scale);
    }
    for (a, b) in first.potential.phi_imag.iter().zip(&second.potential.phi_imag) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9 * scale);
    }
    assert_eq!(first.materials.region_counts, second.materials.region_counts);
}

#[test]
fn test_default_solver_warm_starts_and_matches_direct() {
    let mesh = tower_box();
    let config = RunConfig::default();
    assert_eq!(config.solver.method, SolverType::GmresIlu);
    let iterative = simulate(&mesh, &config).unwrap();
    let direct = simulate(&mesh, &direct_config(Path::new("unused"))).unwrap();

    let stages = &iterative.potential.stages;
    assert_eq!(stages.len(), 2);
    assert!(stages[0].converged);
    assert!(!stages[0].warm_start);
    assert!(stages[1].converged);
    assert!(stages[1].warm_start);
    for stage in stages {
        let residual = stage.residual.unwrap();
        assert!(residual < 10.0 * config.solver.tolerance, "{stage:?}");
    }

    let scale = config.line_voltage;
    let pairs = [
        (&iterative.potential.phi_real, &direct.potential.phi_real),
        (&iterative.potential.phi_imag, &direct.potential.phi_imag),
    ];
    for (a, b) in pairs {
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-5 * scale);
        }
    }
}

#[test]
fn test_stage_two_failure_is_a_convergence_error() {
    let mesh = tower_box();
    let mut config = direct_config(Path::new("unused"));
    config.solver.method = SolverType::Gmres;
    config.solver.max_iterations = 1;
    config.solver.restart = 1;
    config.solver.tolerance = 1e-14;

    match simulate(&mesh, &config) {
        Err(TowerError::Convergence { stage, iterations, residual }) => {
            assert_eq!(stage, Stage::Full);
            assert!(iterations >= 1);
            assert!(residual > 1e-14);
        }
        other => panic!("expected a stage 2 convergence error, got {other:?}"),
    }
}

#[test]
fn test_export_writes_archive_and_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = tower_box();
    let config = direct_config(dir.path());
    let output = simulate(&mesh, &config).unwrap();
    let summary = export_output(&mesh, &config, &output, 1.5).unwrap();

    assert!(summary.files.archive.exists());
    assert!(summary.files.metadata.exists());
    assert!(summary.exported_points > 0);
    assert!(summary.exported_points < mesh.num_nodes());

    let record = read_archive(&summary.files.archive).unwrap();
    assert_eq!(record.len(), summary.exported_points);
    assert_eq!(record.coordinates.nrows(), record.len());
    assert_eq!(record.e_real.nrows(), record.len());
    assert_relative_eq!(record.freq, 50.0);
    assert!(record.sigma.iter().all(|&s| s < config.export.sigma_threshold));
    assert!(record.e_mag.iter().all(|&e| e >= 0.0));

    let text = std::fs::read_to_string(&summary.files.metadata).unwrap();
    let metadata: RunMetadata = serde_json::from_str(&text).unwrap();
    assert_eq!(metadata.solver, "direct");
    assert_eq!(metadata.stages.len(), 2);
    assert_relative_eq!(metadata.computation_time, 1.5);
    assert_eq!(metadata.box_filter_info.total_points, mesh.num_nodes());
    assert_eq!(metadata.box_filter_info.box_air_points, record.len());
    assert!(metadata.conductor_field.is_some());
}

#[test]
fn test_empty_selection_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mesh = tower_box();
    let config = direct_config(&out);
    let mut output = simulate(&mesh, &config).unwrap();
    for m in &mut output.materials.nodes {
        m.sigma = 1.0;
    }

    match export_output(&mesh, &config, &output, 0.0) {
        Err(TowerError::EmptySelection { total, box_points }) => {
            assert_eq!(total, mesh.num_nodes());
            assert!(box_points > 0);
        }
        other => panic!("expected an empty selection, got {other:?}"),
    }
    assert!(!out.exists());
}

#[test]
fn test_run_from_mesh_file() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_path = dir.path().join("tower_box.msh");
    write_msh_v2(&tower_box(), &mesh_path);

    let mut config = direct_config(&dir.path().join("results"));
    config.mesh_file = mesh_path;
    let summary = run_simulation(&config).unwrap();

    assert!(summary.files.archive.starts_with(dir.path().join("results")));
    let name = summary.files.archive.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("synthetic_"));
    assert!(name.ends_with(".npz"));
    assert!(summary.e_mag_max >= summary.e_mag_min);
}

#[test]
fn test_robin_coefficient_leaves_conductor_potentials() {
    let mesh = tower_box();
    let mut weak = direct_config(Path::new("unused"));
    weak.robin_coeff = 0.1;
    let mut strong = weak.clone();
    strong.robin_coeff = 1.0;

    let a = simulate(&mesh, &weak).unwrap();
    let b = simulate(&mesh, &strong).unwrap();
    for node in mesh.nodes_with_marker(PHASE_B) {
        assert_relative_eq!(a.potential.phi_real[node], b.potential.phi_real[node], epsilon = 1e-6);
        assert_relative_eq!(a.potential.phi_imag[node], b.potential.phi_imag[node], epsilon = 1e-6);
    }
}

#[test]
fn test_batch_cases_compared_and_plotted() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_path = dir.path().join("tower_box.msh");
    write_msh_v2(&tower_box(), &mesh_path);

    let mut base = direct_config(&dir.path().join("sweep"));
    base.mesh_file = mesh_path;
    let cases = [
        BatchCase::new("weak_boundary", 35000.0, 0.1),
        BatchCase::new("strong_boundary", 35000.0, 1.0),
    ];
    let report = run_batch(&base, &cases, 2).unwrap();
    assert_eq!(report.successful().count(), 2);

    let compared = report.compared_cases().unwrap();
    assert_eq!(compared.len(), 2);
    for (case, outcome) in compared.iter().zip(&report.outcomes) {
        assert_eq!(case.name, outcome.case.name);
        let stats = outcome.statistics.as_ref().unwrap();
        assert_eq!(case.e_mag.len(), stats.count);
    }

    let plots = write_comparison_plots(&compared, &dir.path().join("plots")).unwrap();
    assert_eq!(plots.len(), 4);
    assert!(plots.iter().all(|p| p.exists()));
}
