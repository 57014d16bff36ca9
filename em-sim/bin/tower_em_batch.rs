//! Preset parameter sweep over conductivity caps and Robin coefficients

use clap::Parser;
use std::path::PathBuf;
use tower_em_sim::RunConfig;
use tower_em_sim::batch::{DEFAULT_JOBS, preset_cases, print_batch_summary, run_batch};
use tower_em_sim::plots::write_comparison_plots;

const DEFAULT_OUTPUT_DIR: &str = "batch_results";

#[derive(Parser, Debug)]
#[command(name = "tower-em-batch")]
#[command(about = "Run the preset tower field cases and compare their field statistics")]
struct Args {
    /// Base JSON configuration shared by all cases
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gmsh mesh file [default: tower.msh]
    #[arg(short, long)]
    mesh: Option<PathBuf>,

    /// Directory receiving one sub-directory per case [default: batch_results]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Cases solved concurrently
    #[arg(short, long, default_value_t = DEFAULT_JOBS)]
    jobs: usize,

    /// Skip the HTML comparison plots
    #[arg(long)]
    no_plots: bool,

    /// List the cases and exit
    #[arg(long)]
    list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Shared configuration: the file (or defaults), then the flags given
fn base_config(args: &Args) -> anyhow::Result<RunConfig> {
    let mut base = match &args.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            ..Default::default()
        },
    };
    if let Some(mesh) = &args.mesh {
        base.mesh_file = mesh.clone();
    }
    if let Some(dir) = &args.output_dir {
        base.output_dir = dir.clone();
    }
    Ok(base)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let cases = preset_cases();
    println!("{} cases:", cases.len());
    for case in &cases {
        println!(
            "  {:<20} max_conductivity {:>8}  robin_coeff {}",
            case.name, case.max_conductivity, case.robin_coeff
        );
    }
    if args.list {
        return Ok(());
    }

    let base = base_config(&args)?;
    let report = run_batch(&base, &cases, args.jobs)?;
    println!();
    print_batch_summary(&report);
    if report.successful().count() == 0 {
        anyhow::bail!("all {} cases failed", report.outcomes.len());
    }

    if !args.no_plots {
        let dir = base.output_dir.join("comparison_plots");
        let written = write_comparison_plots(&report.compared_cases()?, &dir)?;
        println!("{} comparison plots written to {}", written.len(), dir.display());
    }
    Ok(())
}
