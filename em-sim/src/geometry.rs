//! Gmsh `.geo` script for a simplified single-circuit tower
//!
//! The script describes a pyramid tower inside a box domain, three phase
//! points with insulator strings and the physical groups used when the
//! resulting mesh is tagged by hand. Meshing itself stays with Gmsh:
//!
//! ```text
//! gmsh simple_tower.geo -3 -format msh2 -o simple_tower.msh
//! ```

use crate::error::{Result, TowerError};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Names of the physical groups emitted by [`TowerGeometry::to_geo`]
pub const PHYSICAL_GROUPS: [&str; 9] = [
    "PhaseA",
    "PhaseB",
    "PhaseC",
    "Tower_Edge",
    "Insulator_A",
    "Insulator_B",
    "Insulator_C",
    "Box_Boundary",
    "Air",
];

/// Dimensions of the simplified tower, in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerGeometry {
    pub height: f64,
    pub width: f64,
    pub wire_height: f64,
    pub domain: f64,
    pub wire_radius: f64,
}

impl Default for TowerGeometry {
    fn default() -> Self {
        Self {
            height: 50.0,
            width: 10.0,
            wire_height: 45.0,
            domain: 100.0,
            wire_radius: 0.1,
        }
    }
}

/// Mesh sizes near conductors, near the tower and in the far field
const LC_FINE: f64 = 0.5;
const LC_MEDIUM: f64 = 2.0;
const LC_COARSE: f64 = 5.0;

impl TowerGeometry {
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("height", self.height),
            ("width", self.width),
            ("wire_height", self.wire_height),
            ("domain", self.domain),
            ("wire_radius", self.wire_radius),
        ];
        for (name, value) in dims {
            if !value.is_finite() || value <= 0.0 {
                return Err(TowerError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.wire_height >= self.height {
            return Err(TowerError::InvalidConfig(format!(
                "wire height {} must be below the tower top {}",
                self.wire_height, self.height
            )));
        }
        if self.height >= self.domain || self.width >= self.domain / 2.0 {
            return Err(TowerError::InvalidConfig(format!(
                "tower ({} x {} m) does not fit in a {} m domain",
                self.width, self.height, self.domain
            )));
        }
        Ok(())
    }

    /// Render the script
    pub fn to_geo(&self) -> Result<String> {
        self.validate()?;
        let mut s = String::new();
        let _ = writeln!(s, "// Simplified transmission tower");
        let _ = writeln!(s, "tower_height = {};", self.height);
        let _ = writeln!(s, "tower_width = {};", self.width);
        let _ = writeln!(s, "wire_height = {};", self.wire_height);
        let _ = writeln!(s, "domain_size = {};", self.domain);
        let _ = writeln!(s, "wire_radius = {};", self.wire_radius);
        let _ = writeln!(s, "lc_fine = {LC_FINE};");
        let _ = writeln!(s, "lc_medium = {LC_MEDIUM};");
        let _ = writeln!(s, "lc_coarse = {LC_COARSE};\n");

        // domain box, z from -domain/4 to domain
        let _ = writeln!(s, "// Domain");
        let corners = [
            ("-domain_size/2", "-domain_size/2", "-domain_size/4"),
            ("domain_size/2", "-domain_size/2", "-domain_size/4"),
            ("domain_size/2", "domain_size/2", "-domain_size/4"),
            ("-domain_size/2", "domain_size/2", "-domain_size/4"),
            ("-domain_size/2", "-domain_size/2", "domain_size"),
            ("domain_size/2", "-domain_size/2", "domain_size"),
            ("domain_size/2", "domain_size/2", "domain_size"),
            ("-domain_size/2", "domain_size/2", "domain_size"),
        ];
        for (i, (x, y, z)) in corners.iter().enumerate() {
            let _ = writeln!(s, "Point({}) = {{{x}, {y}, {z}, lc_coarse}};", i + 1);
        }
        let edges = [
            (1, 2),
            (2, 3),
            (3, 4),
            (4, 1),
            (5, 6),
            (6, 7),
            (7, 8),
            (8, 5),
            (1, 5),
            (2, 6),
            (3, 7),
            (4, 8),
        ];
        for (i, (a, b)) in edges.iter().enumerate() {
            let _ = writeln!(s, "Line({}) = {{{a}, {b}}};", i + 1);
        }

        let _ = writeln!(s, "\n// Tower legs and apex");
        let legs = [("-", "-"), ("", "-"), ("", ""), ("-", "")];
        for (i, (sx, sy)) in legs.iter().enumerate() {
            let _ = writeln!(
                s,
                "Point({}) = {{{sx}tower_width/2, {sy}tower_width/2, 0, lc_medium}};",
                100 + i
            );
        }
        let _ = writeln!(s, "Point(104) = {{0, 0, tower_height, lc_medium}};");
        for i in 0..4 {
            let _ = writeln!(s, "Line({}) = {{{}, {}}};", 100 + i, 100 + i, 100 + (i + 1) % 4);
        }
        for i in 0..4 {
            let _ = writeln!(s, "Line({}) = {{{}, 104}};", 104 + i, 100 + i);
        }

        let _ = writeln!(s, "\n// Phase conductors and insulator strings");
        let offsets = ["-tower_width", "0", "tower_width"];
        let hangers = ["-tower_width/3", "0", "tower_width/3"];
        for (i, x) in offsets.iter().enumerate() {
            let _ = writeln!(s, "Point({}) = {{{x}, 0, wire_height, lc_fine}};", 200 + i);
        }
        for (i, x) in hangers.iter().enumerate() {
            let _ = writeln!(
                s,
                "Point({}) = {{{x}, 0, tower_height*0.9, lc_medium}};",
                210 + i
            );
        }
        for i in 0..3 {
            let _ = writeln!(s, "Line({}) = {{{}, {}}};", 200 + i, 210 + i, 200 + i);
        }
        for i in 0..3 {
            let _ = writeln!(s, "Line({}) = {{104, {}}};", 210 + i, 210 + i);
        }

        let _ = writeln!(s, "\nPhysical Point(\"PhaseA\") = {{200}};");
        let _ = writeln!(s, "Physical Point(\"PhaseB\") = {{201}};");
        let _ = writeln!(s, "Physical Point(\"PhaseC\") = {{202}};");
        let _ = writeln!(s, "Physical Line(\"Tower_Edge\") = {{104, 105, 106, 107}};");
        for (i, name) in ["Insulator_A", "Insulator_B", "Insulator_C"].iter().enumerate() {
            let _ = writeln!(s, "Physical Line(\"{name}\") = {{{}}};", 200 + i);
        }

        let _ = writeln!(s, "\n// Box faces");
        let loops = [
            "1, 2, 3, 4",
            "5, 6, 7, 8",
            "1, 10, -5, -9",
            "2, 11, -6, -10",
            "3, 12, -7, -11",
            "4, 9, -8, -12",
        ];
        for (i, lines) in loops.iter().enumerate() {
            let _ = writeln!(s, "Line Loop({}) = {{{lines}}};", i + 1);
            let _ = writeln!(s, "Plane Surface({}) = {{{}}};", i + 1, i + 1);
        }
        let _ = writeln!(s, "Surface Loop(1) = {{1, 2, 3, 4, 5, 6}};");
        let _ = writeln!(s, "Volume(1) = {{1}};");
        let _ = writeln!(s, "Physical Surface(\"Box_Boundary\") = {{1, 2, 3, 4, 5, 6}};");
        let _ = writeln!(s, "Physical Volume(\"Air\") = {{1}};");

        // P1 tetrahedra, the only cells the reader accepts
        let _ = writeln!(s, "\nMesh.CharacteristicLengthMin = {};", self.wire_radius);
        let _ = writeln!(s, "Mesh.CharacteristicLengthMax = {};", self.domain / 10.0);
        let _ = writeln!(s, "Mesh.ElementOrder = 1;");
        let _ = writeln!(s, "Mesh.Algorithm = 6;");
        let _ = writeln!(s, "Mesh.Algorithm3D = 1;");
        Ok(s)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let script = self.to_geo()?;
        std::fs::write(path, script).map_err(|e| TowerError::Export {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        log::info!("Wrote geometry script {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_has_physical_groups() {
        let geo = TowerGeometry::default().to_geo().unwrap();
        for group in PHYSICAL_GROUPS {
            assert!(geo.contains(&format!("\"{group}\"")), "missing {group}");
        }
        assert!(geo.contains("tower_height = 50;"));
        assert!(geo.contains(
            "Point(5) = {-domain_size/2, -domain_size/2, domain_size, lc_coarse};"
        ));
        assert!(geo.contains(
            "Point(1) = {-domain_size/2, -domain_size/2, -domain_size/4, lc_coarse};"
        ));
        assert!(geo.contains("Line(103) = {103, 100};"));
        assert!(geo.contains("Line(200) = {210, 200};"));
        assert!(geo.contains("Mesh.ElementOrder = 1;"));
    }

    #[test]
    fn test_custom_dimensions() {
        let g = TowerGeometry {
            height: 60.0,
            wire_height: 52.5,
            ..Default::default()
        };
        let geo = g.to_geo().unwrap();
        assert!(geo.contains("tower_height = 60;"));
        assert!(geo.contains("wire_height = 52.5;"));
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        let cases = [
            TowerGeometry { height: -1.0, ..Default::default() },
            TowerGeometry { wire_height: 55.0, ..Default::default() },
            TowerGeometry { domain: 40.0, ..Default::default() },
            TowerGeometry { wire_radius: f64::NAN, ..Default::default() },
        ];
        for g in cases {
            assert!(matches!(g.to_geo(), Err(TowerError::InvalidConfig(_))), "{g:?}");
        }
    }

    #[test]
    fn test_write_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tower.geo");
        TowerGeometry::default().write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Physical Volume(\"Air\")"));
    }
}
