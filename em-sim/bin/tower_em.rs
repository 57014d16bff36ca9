//! Single tower field simulation
//!
//! ```text
//! tower-em --mesh tower.msh --output-dir results --max-conductivity 35000 --robin-coeff 0.5
//! tower-em --analyze results/tower_electric_field_20250101_120000.npz --plot
//! tower-em --analyze low/case_low.npz high/case_high.npz --plot --plot-dir comparison
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tower_em_fem::solver::SolverType;
use tower_em_sim::analysis::{CaseSummary, analyze_record, comparison_table};
use tower_em_sim::config::{RunConfig, print_config_summary};
use tower_em_sim::export::read_archive;
use tower_em_sim::plots::{ComparedCase, write_comparison_plots, write_field_plots};
use tower_em_sim::simulation::{print_run_summary, run_simulation};

#[derive(Parser, Debug)]
#[command(name = "tower-em")]
#[command(about = "Power-frequency electric field around a three-phase transmission tower")]
struct Args {
    /// Path to JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gmsh mesh file [default: tower.msh]
    #[arg(short, long)]
    mesh: Option<PathBuf>,

    /// Output directory [default: results]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Archive name prefix [default: tower_electric_field]
    #[arg(short, long)]
    prefix: Option<String>,

    /// Conductivity cap for metals in S/m [default: 35000]
    #[arg(long)]
    max_conductivity: Option<f64>,

    /// Robin gradient coefficient [default: 0.5]
    #[arg(long)]
    robin_coeff: Option<f64>,

    /// Linear solver [default: gmres-ilu]
    #[arg(short, long)]
    solver: Option<CliSolverType>,

    /// Number of parallel threads (default: all cores)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Print statistics of existing archives instead of solving; several
    /// archives are compared with each other
    #[arg(long, value_name = "NPZ", num_args = 1..)]
    analyze: Vec<PathBuf>,

    /// With --analyze, also write HTML plots
    #[arg(long)]
    plot: bool,

    /// Directory receiving the plots
    #[arg(long, default_value = "analysis_plots")]
    plot_dir: PathBuf,

    /// Write the effective configuration to this file and exit
    #[arg(long, value_name = "JSON")]
    dump_config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSolverType {
    Direct,
    Gmres,
    GmresIlu,
    GmresJacobi,
}

impl From<CliSolverType> for SolverType {
    fn from(value: CliSolverType) -> Self {
        match value {
            CliSolverType::Direct => SolverType::Direct,
            CliSolverType::Gmres => SolverType::Gmres,
            CliSolverType::GmresIlu => SolverType::GmresIlu,
            CliSolverType::GmresJacobi => SolverType::GmresJacobi,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(args: &Args) -> anyhow::Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => {
            println!("Loading configuration from: {}", path.display());
            RunConfig::from_file(path)?
        }
        None => RunConfig::default(),
    };
    if let Some(mesh) = &args.mesh {
        config.mesh_file = mesh.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(prefix) = &args.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(cap) = args.max_conductivity {
        config.max_conductivity = cap;
    }
    if let Some(beta) = args.robin_coeff {
        config.robin_coeff = beta;
    }
    if let Some(solver) = args.solver {
        config.solver.method = solver.into();
    }
    config.validate()?;
    Ok(config)
}
fn case_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn analyze(paths: &[PathBuf], plot_dir: Option<&Path>) -> anyhow::Result<()> {
    if let [path] = paths {
        let record = read_archive(path)?;
        let stats = analyze_record(&record)?;
        print!("{}", stats.report(&format!("Field statistics: {}", path.display())));
        if let Some(dir) = plot_dir {
            let written = write_field_plots(&record, dir)?;
            println!("{} plots written to {}", written.len(), dir.display());
        }
        return Ok(());
    }

    let mut rows = Vec::with_capacity(paths.len());
    let mut cases = Vec::with_capacity(paths.len());
    for path in paths {
        let record = read_archive(path)?;
        let stats = analyze_record(&record)
            .with_context(|| format!("cannot analyze {}", path.display()))?;
        let name = case_name(path);
        rows.push(CaseSummary::from_statistics(&name, &stats));
        cases.push(ComparedCase::new(name, record.e_mag));
    }
    println!("=== Comparison of {} cases ===", rows.len());
    print!("{}", comparison_table(&rows));
    if let Some(dir) = plot_dir {
        let written = write_comparison_plots(&cases, dir)?;
        println!("{} plots written to {}", written.len(), dir.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to set thread pool")?;
    }

    if !args.analyze.is_empty() {
        let plot_dir = args.plot.then_some(args.plot_dir.as_path());
        return analyze(&args.analyze, plot_dir);
    }

    let config = load_config(&args)?;
    if let Some(path) = &args.dump_config {
        config.to_file(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    print_config_summary(&config);
    let summary = run_simulation(&config)
        .with_context(|| format!("simulation of {} failed", config.mesh_file.display()))?;
    print_run_summary(&summary);
    Ok(())
}
