//! Three-phase excitation and far-field boundary conditions

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tower_em_fem::boundary::{DirichletBC, RobinBC};
use tower_em_fem::mesh::Mesh;

/// Conductor of the double circuit: A, B, C on the upper cross-arm and
/// a, b, c on the lower one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    A,
    B,
    C,
    LowerA,
    LowerB,
    LowerC,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::A,
        Phase::B,
        Phase::C,
        Phase::LowerA,
        Phase::LowerB,
        Phase::LowerC,
    ];

    pub fn index(&self) -> usize {
        match self {
            Phase::A => 0,
            Phase::B => 1,
            Phase::C => 2,
            Phase::LowerA => 3,
            Phase::LowerB => 4,
            Phase::LowerC => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::A => "A",
            Phase::B => "B",
            Phase::C => "C",
            Phase::LowerA => "a",
            Phase::LowerB => "b",
            Phase::LowerC => "c",
        }
    }

    pub fn is_upper(&self) -> bool {
        self.index() < 3
    }

    /// 0°, 120°, 240°; the lower circuit repeats the upper one
    pub fn angle(&self) -> f64 {
        (self.index() % 3) as f64 * 2.0 * PI / 3.0
    }

    /// V·e^{iφ}
    pub fn voltage(&self, amplitude: f64) -> Complex64 {
        Complex64::from_polar(amplitude, self.angle())
    }
}

/// Physical surface tags of the mesh boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryTags {
    /// Outer box, far field
    pub box_boundary: i32,
    /// Tags of A, B, C, a, b, c
    pub phases: [i32; 6],
    pub tower: i32,
}

impl Default for BoundaryTags {
    fn default() -> Self {
        Self {
            box_boundary: 10,
            phases: [11, 12, 13, 14, 15, 16],
            tower: 17,
        }
    }
}

impl BoundaryTags {
    pub fn phase(&self, phase: Phase) -> i32 {
        self.phases[phase.index()]
    }
}

/// Boundary conditions of one run
#[derive(Debug, Clone)]
pub struct BoundarySet {
    /// Tower first, then A…c; on shared nodes the earlier entry wins
    pub dirichlet: Vec<DirichletBC>,
    pub robin: Vec<RobinBC>,
    /// Configured tags with no boundary face in the mesh
    pub missing_tags: Vec<i32>,
}

/// Dirichlet potentials on the conductors and a Robin condition on the box.
/// Tags absent from the mesh are logged and skipped.
pub fn build_boundary_conditions(
    mesh: &Mesh,
    tags: &BoundaryTags,
    line_voltage: f64,
    robin_alpha: f64,
    robin_beta: f64,
) -> BoundarySet {
    let present = mesh.markers();
    let mut missing_tags = Vec::new();
    let mut dirichlet = Vec::with_capacity(7);

    let conductors = std::iter::once(("Tower", tags.tower, Complex64::new(0.0, 0.0))).chain(
        Phase::ALL
            .iter()
            .map(|&p| (p.name(), tags.phase(p), p.voltage(line_voltage))),
    );
    for (name, tag, value) in conductors {
        if present.contains(&tag) {
            log::debug!(
                "Dirichlet {name} (tag {tag}): {:.1} V at {:.0}°",
                value.norm(),
                value.arg().to_degrees()
            );
            dirichlet.push(DirichletBC::constant(tag, value));
        } else {
            log::warn!("Boundary tag {tag} ({name}) has no faces in the mesh, skipped");
            missing_tags.push(tag);
        }
    }

    let mut robin = Vec::new();
    if present.contains(&tags.box_boundary) {
        robin.push(RobinBC::new(tags.box_boundary, robin_alpha, robin_beta));
    } else {
        log::warn!(
            "Far-field tag {} has no faces in the mesh, Robin condition skipped",
            tags.box_boundary
        );
        missing_tags.push(tags.box_boundary);
    }

    log::info!(
        "Boundary conditions: {} Dirichlet, {} Robin (alpha = {robin_alpha}, beta = {robin_beta})",
        dirichlet.len(),
        robin.len()
    );

    BoundarySet {
        dirichlet,
        robin,
        missing_tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tower_em_fem::boundary::dirichlet_values;
    use tower_em_fem::mesh::unit_cube_tetrahedra;

    #[test]
    fn test_balanced_three_phase() {
        let v = 120e3;
        let [a, b, c] = [Phase::A, Phase::B, Phase::C].map(|p| p.voltage(v));
        assert_relative_eq!(a.norm(), v, max_relative = 1e-14);
        assert_relative_eq!(b.norm(), v, max_relative = 1e-14);
        assert_relative_eq!(c.norm(), v, max_relative = 1e-14);

        let step = 2.0 * PI / 3.0;
        let diff = |x: Complex64, y: Complex64| (y / x).arg().rem_euclid(2.0 * PI);
        assert_relative_eq!(diff(a, b), step, epsilon = 1e-12);
        assert_relative_eq!(diff(b, c), step, epsilon = 1e-12);
        assert_relative_eq!(diff(c, a), step, epsilon = 1e-12);

        // balanced set sums to zero
        let sum = a + b + c;
        assert!(sum.norm() < 1e-9 * v);

        for (upper, lower) in [
            (Phase::A, Phase::LowerA),
            (Phase::B, Phase::LowerB),
            (Phase::C, Phase::LowerC),
        ] {
            assert_eq!(upper.voltage(v), lower.voltage(v));
        }
    }

    fn tagged_cube() -> Mesh {
        let mut mesh = unit_cube_tetrahedra(4);
        mesh.mark_boundary(10, |_| true);
        mesh.mark_boundary(17, |c| c.z < 1e-12);
        mesh.mark_boundary(11, |c| c.z > 1.0 - 1e-12 && c.x < 0.5);
        mesh.mark_boundary(12, |c| c.z > 1.0 - 1e-12 && c.x > 0.5);
        mesh
    }

    #[test]
    fn test_missing_tags_skipped() {
        let mesh = tagged_cube();
        let set = build_boundary_conditions(&mesh, &BoundaryTags::default(), 120e3, 1.0, 0.5);
        assert_eq!(
            set.dirichlet.iter().map(|bc| bc.tag).collect::<Vec<_>>(),
            vec![17, 11, 12]
        );
        assert_eq!(set.missing_tags, vec![13, 14, 15, 16]);
        assert_eq!(set.robin, vec![RobinBC::new(10, 1.0, 0.5)]);
    }

    #[test]
    fn test_robin_coefficient_leaves_dirichlet_unchanged() {
        let mesh = tagged_cube();
        let tags = BoundaryTags::default();
        let weak = build_boundary_conditions(&mesh, &tags, 120e3, 1.0, 0.1);
        let strong = build_boundary_conditions(&mesh, &tags, 120e3, 1.0, 1.0);
        assert_eq!(
            dirichlet_values(&mesh, &weak.dirichlet),
            dirichlet_values(&mesh, &strong.dirichlet)
        );
        assert_ne!(weak.robin, strong.robin);
    }

    #[test]
    fn test_tower_wins_on_shared_nodes() {
        let mut mesh = unit_cube_tetrahedra(2);
        mesh.mark_boundary(17, |c| c.x < 1e-12);
        mesh.mark_boundary(11, |c| c.z < 1e-12);
        let set = build_boundary_conditions(&mesh, &BoundaryTags::default(), 120e3, 1.0, 0.5);
        let values = dirichlet_values(&mesh, &set.dirichlet);
        // node 0 is on both faces
        assert_eq!(values[&0], Complex64::new(0.0, 0.0));
    }
}
