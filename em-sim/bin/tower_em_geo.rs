//! Writes a Gmsh geometry script for a simplified tower

use clap::Parser;
use std::path::PathBuf;
use tower_em_sim::geometry::TowerGeometry;

#[derive(Parser, Debug)]
#[command(name = "tower-em-geo")]
#[command(about = "Generate a simplified transmission tower .geo script for Gmsh")]
struct Args {
    /// Output script
    #[arg(short, long, default_value = "simple_tower.geo")]
    output: PathBuf,

    /// Tower height (m)
    #[arg(long, default_value_t = 50.0)]
    height: f64,

    /// Tower base width (m)
    #[arg(long, default_value_t = 10.0)]
    width: f64,

    /// Conductor height (m)
    #[arg(long, default_value_t = 45.0)]
    wire_height: f64,

    /// Domain size (m)
    #[arg(long, default_value_t = 100.0)]
    domain: f64,

    /// Conductor radius (m)
    #[arg(long, default_value_t = 0.1)]
    wire_radius: f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let geometry = TowerGeometry {
        height: args.height,
        width: args.width,
        wire_height: args.wire_height,
        domain: args.domain,
        wire_radius: args.wire_radius,
    };
    geometry.write(&args.output)?;

    println!(
        "Tower {} m high, {} m wide, conductors at {} m",
        geometry.height, geometry.width, geometry.wire_height
    );
    println!("Domain {} m", geometry.domain);
    println!("Mesh with:");
    println!("  gmsh {} -3 -format msh2 -o simple_tower.msh", args.output.display());
    Ok(())
}
