//! Material assignment for the tower model
//!
//! Materials come either from physical volume tags written by the mesher or
//! from a spatial layout derived from the mesh bounding box. The spatial
//! layout uses smooth tanh indicators
//!
//! ```text
//! s(x; c, w) = 0.5 + 0.5·tanh(k·(w − |x − c|)),   k = 8 / transition_width
//! ```
//!
//! multiplied per axis. A region is a candidate once its product exceeds
//! 0.5; overlapping candidates are resolved by priority
//! (conductor > insulator > tower > air), never summed.

use crate::error::{Result, TowerError};
use crate::excitation::Phase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tower_em_fem::mesh::{BoundingBox, Mesh, Point};

use rayon::prelude::*;

/// Vacuum permittivity (F/m)
pub const EPSILON_0: f64 = 8.85418782e-12;

pub const EPS_R_AIR: f64 = 1.0006;
pub const EPS_R_METAL: f64 = 1.0;
pub const EPS_R_INSULATOR: f64 = 7.5;

/// Steel tower body (S/m)
pub const SIGMA_TOWER: f64 = 5.8e6;
/// Conductor strands (S/m)
pub const SIGMA_CONDUCTOR: f64 = 3.5e7;
pub const SIGMA_INSULATOR: f64 = 1e-12;

const INDICATOR_THRESHOLD: f64 = 0.5;

/// Where cell materials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialSource {
    /// Volume tags when any cell carries a known one, otherwise spatial
    #[default]
    Auto,
    Spatial,
    Tagged,
}

/// Material region, ordered by increasing priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    Air,
    Tower,
    Insulator,
    Conductor(Phase),
}

impl Region {
    /// Region of a physical volume id: 1 air, 2–7 phases A…c, 8 insulator, 9 tower
    pub fn from_volume_id(id: i32) -> Option<Region> {
        match id {
            1 => Some(Region::Air),
            2..=7 => Phase::ALL.get((id - 2) as usize).map(|&p| Region::Conductor(p)),
            8 => Some(Region::Insulator),
            9 => Some(Region::Tower),
            _ => None,
        }
    }

    pub fn volume_id(&self) -> i32 {
        match self {
            Region::Air => 1,
            Region::Conductor(p) => 2 + p.index() as i32,
            Region::Insulator => 8,
            Region::Tower => 9,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Region::Air => "air".to_string(),
            Region::Tower => "tower".to_string(),
            Region::Insulator => "insulator".to_string(),
            Region::Conductor(p) => format!("phase {}", p.name()),
        }
    }
}

/// Highest-priority candidate, or air when there is none
pub fn resolve_overlap(candidates: &[Region]) -> Region {
    candidates.iter().copied().max().unwrap_or(Region::Air)
}

/// Conductivity and permittivity at a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// S/m
    pub sigma: f64,
    /// F/m
    pub epsilon: f64,
}

impl Material {
    pub fn new(sigma: f64, eps_r: f64) -> Self {
        Self {
            sigma,
            epsilon: EPSILON_0 * eps_r,
        }
    }
}

/// Region to material lookup with capped metal conductivities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialTable {
    pub max_conductivity: f64,
}

impl MaterialTable {
    pub fn new(max_conductivity: f64) -> Self {
        Self { max_conductivity }
    }

    pub fn material(&self, region: Region) -> Material {
        match region {
            Region::Air => Material::new(0.0, EPS_R_AIR),
            Region::Tower => Material::new(SIGMA_TOWER.min(self.max_conductivity), EPS_R_METAL),
            Region::Conductor(_) => {
                Material::new(SIGMA_CONDUCTOR.min(self.max_conductivity), EPS_R_METAL)
            }
            Region::Insulator => Material::new(SIGMA_INSULATOR, EPS_R_INSULATOR),
        }
    }
}

/// Region geometry derived from the mesh bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct TowerLayout {
    /// Indicator steepness, 8 / transition width
    pub k: f64,
    pub transition_width: f64,
    pub center: Point,
    pub tower_half_width: f64,
    pub tower_z_min: f64,
    pub tower_z_top: f64,
    pub upper_level: f64,
    pub lower_level: f64,
    /// x of the A, B, C axes; the lower circuit reuses them
    pub phase_x: [f64; 3],
    pub wire_radius: f64,
    pub insulator_center_z: f64,
    pub insulator_half_height: f64,
    pub insulator_half_width: f64,
}

impl TowerLayout {
    pub fn from_bounds(bounds: &BoundingBox) -> Result<Self> {
        let [xs, ys, zs] = bounds.size();
        if !(xs > 0.0 && ys > 0.0) {
            return Err(TowerError::InvalidConfig(format!(
                "mesh bounding box is degenerate ({xs} × {ys} × {zs})"
            )));
        }
        let center = bounds.center();
        let m = xs.min(ys);
        let transition_width = 0.08 * m;
        let tower_z_top = center.z + 0.3 * zs;
        let upper_level = bounds.max.z - 0.2 * zs;
        let insulator_height = 0.3 * (upper_level - tower_z_top);

        Ok(Self {
            k: 8.0 / transition_width,
            transition_width,
            center,
            tower_half_width: 0.3 * m,
            tower_z_min: bounds.min.z,
            tower_z_top,
            upper_level,
            lower_level: center.z,
            phase_x: [center.x - xs / 6.0, center.x, center.x + xs / 6.0],
            wire_radius: 0.03 * m,
            insulator_center_z: tower_z_top + insulator_height / 2.0,
            insulator_half_height: insulator_height / 2.0,
            insulator_half_width: 0.05 * m,
        })
    }

    /// s(x; c, w)
    pub fn indicator(&self, x: f64, center: f64, half_width: f64) -> f64 {
        0.5 + 0.5 * (self.k * (half_width - (x - center).abs())).tanh()
    }

    pub fn tower_indicator(&self, p: &Point) -> f64 {
        if p.z < self.tower_z_min || p.z > self.tower_z_top {
            return 0.0;
        }
        self.indicator(p.x, self.center.x, self.tower_half_width)
            * self.indicator(p.y, self.center.y, self.tower_half_width)
    }

    /// Axis of a phase conductor as (x, y, z)
    pub fn phase_axis(&self, phase: Phase) -> [f64; 3] {
        let level = if phase.is_upper() {
            self.upper_level
        } else {
            self.lower_level
        };
        [self.phase_x[phase.index() % 3], self.center.y, level]
    }

    pub fn phase_indicator(&self, p: &Point, phase: Phase) -> f64 {
        let [ax, ay, level] = self.phase_axis(phase);
        let r = ((p.x - ax).powi(2) + (p.y - ay).powi(2)).sqrt();
        self.indicator(p.z, level, self.transition_width) * self.indicator(r, 0.0, self.wire_radius)
    }

    pub fn insulator_indicator(&self, p: &Point) -> f64 {
        let across = self
            .phase_x
            .iter()
            .map(|&x| self.indicator(p.x, x, self.insulator_half_width))
            .fold(0.0, f64::max);
        self.indicator(p.z, self.insulator_center_z, self.insulator_half_height) * across
    }

    /// Every region whose indicator exceeds the threshold
    pub fn candidates(&self, p: &Point) -> Vec<Region> {
        let mut found: Vec<Region> = Phase::ALL
            .iter()
            .filter(|&&phase| self.phase_indicator(p, phase) > INDICATOR_THRESHOLD)
            .map(|&phase| Region::Conductor(phase))
            .collect();
        if self.insulator_indicator(p) > INDICATOR_THRESHOLD {
            found.push(Region::Insulator);
        }
        if self.tower_indicator(p) > INDICATOR_THRESHOLD {
            found.push(Region::Tower);
        }
        found
    }

    pub fn classify(&self, p: &Point) -> Region {
        resolve_overlap(&self.candidates(p))
    }
}

/// How the materials of a mesh were resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedSource {
    Spatial,
    Tagged,
}

/// Per-cell materials for assembly and per-node materials for export
#[derive(Debug, Clone)]
pub struct MaterialField {
    pub cells: Vec<Material>,
    pub nodes: Vec<Material>,
    pub source: ResolvedSource,
    pub region_counts: BTreeMap<Region, usize>,
}

impl MaterialField {
    pub fn build(
        mesh: &Mesh,
        source: MaterialSource,
        table: &MaterialTable,
        layout: &TowerLayout,
    ) -> Result<Self> {
        let has_known_tag = mesh
            .elements
            .iter()
            .any(|e| e.physical_tag.and_then(Region::from_volume_id).is_some());

        let resolved = match source {
            MaterialSource::Spatial => ResolvedSource::Spatial,
            MaterialSource::Tagged if !has_known_tag => {
                return Err(TowerError::InvalidConfig(
                    "material_source is 'tagged' but no cell carries a volume id in 1..=9"
                        .to_string(),
                ));
            }
            MaterialSource::Tagged => ResolvedSource::Tagged,
            MaterialSource::Auto if has_known_tag => ResolvedSource::Tagged,
            MaterialSource::Auto => ResolvedSource::Spatial,
        };

        let cell_regions: Vec<Region> = match resolved {
            ResolvedSource::Spatial => (0..mesh.num_elements())
                .into_par_iter()
                .map(|e| layout.classify(&mesh.element_centroid(e)))
                .collect(),
            ResolvedSource::Tagged => {
                let regions: Vec<Region> = (0..mesh.num_elements())
                    .into_par_iter()
                    .map(|e| {
                        mesh.elements[e]
                            .physical_tag
                            .and_then(Region::from_volume_id)
                            .unwrap_or_else(|| layout.classify(&mesh.element_centroid(e)))
                    })
                    .collect();
                let untagged = mesh
                    .elements
                    .iter()
                    .filter(|e| e.physical_tag.and_then(Region::from_volume_id).is_none())
                    .count();
                if untagged > 0 {
                    log::warn!("{untagged} cells carry no known volume id, classified spatially");
                }
                regions
            }
        };

        let cells: Vec<Material> = cell_regions.iter().map(|&r| table.material(r)).collect();
        let nodes = match resolved {
            ResolvedSource::Spatial => mesh
                .nodes
                .par_iter()
                .map(|p| table.material(layout.classify(p)))
                .collect(),
            ResolvedSource::Tagged => volume_weighted_nodes(mesh, &cells),
        };

        let mut region_counts = BTreeMap::new();
        for region in &cell_regions {
            *region_counts.entry(*region).or_insert(0) += 1;
        }
        log::info!(
            "Materials ({:?}): {}",
            resolved,
            region_counts
                .iter()
                .map(|(r, n)| format!("{} {}", r.name(), n))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            cells,
            nodes,
            source: resolved,
            region_counts,
        })
    }

    pub fn sigma_range(&self) -> (f64, f64) {
        range(self.cells.iter().map(|m| m.sigma))
    }

    pub fn epsilon_range(&self) -> (f64, f64) {
        range(self.cells.iter().map(|m| m.epsilon))
    }
}

fn range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Node materials as the volume-weighted mean of the incident cells
fn volume_weighted_nodes(mesh: &Mesh, cells: &[Material]) -> Vec<Material> {
    let mut sigma = vec![0.0; mesh.num_nodes()];
    let mut epsilon = vec![0.0; mesh.num_nodes()];
    let mut weight = vec![0.0; mesh.num_nodes()];
    for (e, elem) in mesh.elements.iter().enumerate() {
        let volume = tower_em_fem::basis::tet_volume(&mesh.element_coords(e));
        for &n in &elem.nodes {
            sigma[n] += volume * cells[e].sigma;
            epsilon[n] += volume * cells[e].epsilon;
            weight[n] += volume;
        }
    }
    (0..mesh.num_nodes())
        .map(|n| {
            if weight[n] > 0.0 {
                Material {
                    sigma: sigma[n] / weight[n],
                    epsilon: epsilon[n] / weight[n],
                }
            } else {
                Material::new(0.0, EPS_R_AIR)
            }
        })
        .collect()
}
