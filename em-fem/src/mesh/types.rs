//! Tetrahedral mesh types
//!
//! Volume cells are linear tetrahedra. Boundary faces are triangles that
//! carry a physical marker and a back-reference to the tetrahedron owning
//! them, which the Robin flux term needs for the volume gradient.

use super::MeshError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A point in 3D space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Point {
    fn from(p: [f64; 3]) -> Self {
        Point::new(p[0], p[1], p[2])
    }
}

/// Local vertex triples of the four tetrahedron faces; face `k` is opposite vertex `k`
pub const TET_FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [0, 1, 3], [0, 1, 2]];

/// A linear tetrahedron
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub nodes: [usize; 4],
    /// Physical volume group from the mesh file, if any
    pub physical_tag: Option<i32>,
}

impl Element {
    pub fn new(nodes: [usize; 4], physical_tag: Option<i32>) -> Self {
        Self {
            nodes,
            physical_tag,
        }
    }

    /// Global node indices of local face `k`
    pub fn face(&self, k: usize) -> [usize; 3] {
        TET_FACES[k].map(|local| self.nodes[local])
    }
}

/// A triangular boundary face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryFace {
    pub nodes: [usize; 3],
    /// Physical surface tag; 0 when the face belongs to no group
    pub marker: i32,
    /// Owning tetrahedron
    pub element_idx: usize,
    /// Local face index within the owner
    pub local_idx: usize,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn size(&self) -> [f64; 3] {
        [
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        ]
    }

    pub fn center(&self) -> Point {
        Point::new(
            0.5 * (self.min.x + self.max.x),
            0.5 * (self.min.y + self.max.y),
            0.5 * (self.min.z + self.max.z),
        )
    }

    /// Box shrunk on every side by `fraction` of the extent along that axis
    pub fn shrink(&self, fraction: f64) -> BoundingBox {
        let [sx, sy, sz] = self.size();
        BoundingBox {
            min: Point::new(
                self.min.x + fraction * sx,
                self.min.y + fraction * sy,
                self.min.z + fraction * sz,
            ),
            max: Point::new(
                self.max.x - fraction * sx,
                self.max.y - fraction * sy,
                self.max.z - fraction * sz,
            ),
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// A tetrahedral finite element mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub nodes: Vec<Point>,
    pub elements: Vec<Element>,
    pub boundaries: Vec<BoundaryFace>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, point: Point) -> usize {
        self.nodes.push(point);
        self.nodes.len() - 1
    }

    pub fn add_element(&mut self, nodes: [usize; 4], physical_tag: Option<i32>) -> usize {
        self.elements.push(Element::new(nodes, physical_tag));
        self.elements.len() - 1
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Vertex coordinates of a tetrahedron
    pub fn element_coords(&self, elem_idx: usize) -> [[f64; 3]; 4] {
        self.elements[elem_idx]
            .nodes
            .map(|n| self.nodes[n].to_array())
    }

    pub fn element_centroid(&self, elem_idx: usize) -> Point {
        let c = self.element_coords(elem_idx);
        Point::new(
            0.25 * (c[0][0] + c[1][0] + c[2][0] + c[3][0]),
            0.25 * (c[0][1] + c[1][1] + c[2][1] + c[3][1]),
            0.25 * (c[0][2] + c[1][2] + c[2][2] + c[3][2]),
        )
    }

    /// Bounding box of all nodes, `None` for an empty mesh
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = *self.nodes.first()?;
        let mut bb = BoundingBox {
            min: first,
            max: first,
        };
        for p in &self.nodes[1..] {
            bb.min.x = bb.min.x.min(p.x);
            bb.min.y = bb.min.y.min(p.y);
            bb.min.z = bb.min.z.min(p.z);
            bb.max.x = bb.max.x.max(p.x);
            bb.max.y = bb.max.y.max(p.y);
            bb.max.z = bb.max.z.max(p.z);
        }
        Some(bb)
    }

    /// Check that every element and face references an existing node
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.elements.is_empty() {
            return Err(MeshError::NoVolumeElements);
        }
        let n = self.nodes.len();
        let refs = self
            .elements
            .iter()
            .flat_map(|e| e.nodes.iter())
            .chain(self.boundaries.iter().flat_map(|f| f.nodes.iter()));
        for &node in refs {
            if node >= n {
                return Err(MeshError::UnknownNode { node });
            }
        }
        Ok(())
    }

    /// Map from sorted face triple to (owner, local face) for every tet face
    fn face_owners(&self) -> HashMap<[usize; 3], (usize, usize)> {
        let mut owners = HashMap::with_capacity(self.elements.len() * 2);
        for (e, elem) in self.elements.iter().enumerate() {
            for k in 0..4 {
                let mut key = elem.face(k);
                key.sort_unstable();
                owners.entry(key).or_insert((e, k));
            }
        }
        owners
    }

    /// Replace the boundary with every face that belongs to exactly one
    /// tetrahedron, all with marker 0. Faces are ordered by sorted node triple.
    pub fn detect_boundaries(&mut self) {
        let mut count: HashMap<[usize; 3], (usize, usize, usize)> = HashMap::new();
        for (e, elem) in self.elements.iter().enumerate() {
            for k in 0..4 {
                let mut key = elem.face(k);
                key.sort_unstable();
                count
                    .entry(key)
                    .and_modify(|entry| entry.2 += 1)
                    .or_insert((e, k, 1));
            }
        }

        let mut faces: Vec<BoundaryFace> = count
            .into_iter()
            .filter(|(_, (_, _, c))| *c == 1)
            .map(|(_, (e, k, _))| BoundaryFace {
                nodes: self.elements[e].face(k),
                marker: 0,
                element_idx: e,
                local_idx: k,
            })
            .collect();
        faces.sort_by_key(|f| {
            let mut key = f.nodes;
            key.sort_unstable();
            key
        });
        self.boundaries = faces;
    }

    /// Attach tagged triangles read from a mesh file to their owning tetrahedra
    pub fn resolve_boundary_owners(
        &mut self,
        faces: Vec<([usize; 3], i32)>,
    ) -> Result<(), MeshError> {
        let owners = self.face_owners();
        let mut resolved = Vec::with_capacity(faces.len());
        for (nodes, marker) in faces {
            let mut key = nodes;
            key.sort_unstable();
            let &(element_idx, local_idx) = owners
                .get(&key)
                .ok_or(MeshError::OrphanFace { face: nodes, marker })?;
            resolved.push(BoundaryFace {
                nodes,
                marker,
                element_idx,
                local_idx,
            });
        }
        self.boundaries = resolved;
        Ok(())
    }

    /// Set `marker` on every boundary face whose centroid satisfies `predicate`;
    /// returns the number of faces changed
    pub fn mark_boundary<F>(&mut self, marker: i32, predicate: F) -> usize
    where
        F: Fn(&Point) -> bool,
    {
        let mut changed = 0;
        for face in &mut self.boundaries {
            let [a, b, c] = face.nodes.map(|n| self.nodes[n]);
            let centroid = Point::new(
                (a.x + b.x + c.x) / 3.0,
                (a.y + b.y + c.y) / 3.0,
                (a.z + b.z + c.z) / 3.0,
            );
            if predicate(&centroid) {
                face.marker = marker;
                changed += 1;
            }
        }
        changed
    }

    /// Nodes lying on faces with the given marker, in ascending order
    pub fn nodes_with_marker(&self, marker: i32) -> BTreeSet<usize> {
        self.boundaries
            .iter()
            .filter(|f| f.marker == marker)
            .flat_map(|f| f.nodes)
            .collect()
    }

    /// Distinct boundary markers present
    pub fn markers(&self) -> BTreeSet<i32> {
        self.boundaries.iter().map(|f| f.marker).collect()
    }

    /// Distinct physical volume tags present
    pub fn physical_tags(&self) -> BTreeSet<i32> {
        self.elements.iter().filter_map(|e| e.physical_tag).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn single_tet() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_node(Point::new(0.0, 0.0, 0.0));
        mesh.add_node(Point::new(1.0, 0.0, 0.0));
        mesh.add_node(Point::new(0.0, 1.0, 0.0));
        mesh.add_node(Point::new(0.0, 0.0, 1.0));
        mesh.add_element([0, 1, 2, 3], Some(1));
        mesh
    }

    #[test]
    fn test_detect_boundaries_single_tet() {
        let mut mesh = single_tet();
        mesh.detect_boundaries();
        assert_eq!(mesh.boundaries.len(), 4);
        for face in &mesh.boundaries {
            assert_eq!(face.element_idx, 0);
            assert_eq!(mesh.elements[0].face(face.local_idx), face.nodes);
        }
    }

    #[test]
    fn test_resolve_owners_and_orphans() {
        let mut mesh = single_tet();
        mesh.resolve_boundary_owners(vec![([2, 1, 0], 11)]).unwrap();
        assert_eq!(mesh.boundaries[0].local_idx, 3);
        assert_eq!(mesh.boundaries[0].nodes, [2, 1, 0]);

        let err = mesh
            .resolve_boundary_owners(vec![([0, 1, 4], 11)])
            .unwrap_err();
        assert!(matches!(err, MeshError::OrphanFace { marker: 11, .. }));
    }

    #[test]
    fn test_bounding_box_shrink() {
        let mesh = single_tet();
        let bb = mesh.bounding_box().unwrap();
        assert_eq!(bb.size(), [1.0, 1.0, 1.0]);
        let inner = bb.shrink(0.01);
        assert_relative_eq!(inner.min.x, 0.01);
        assert_relative_eq!(inner.max.z, 0.99);
        assert!(!inner.contains(&Point::new(0.0, 0.5, 0.5)));
        assert!(inner.contains(&Point::new(0.5, 0.5, 0.5)));
        assert!(Mesh::new().bounding_box().is_none());
    }

    #[test]
    fn test_mark_boundary_and_markers() {
        let mut mesh = single_tet();
        mesh.detect_boundaries();
        let changed = mesh.mark_boundary(17, |c| c.z.abs() < 1e-12);
        assert_eq!(changed, 1);
        assert_eq!(mesh.nodes_with_marker(17).into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(mesh.markers().into_iter().collect::<Vec<_>>(), vec![0, 17]);
        assert_eq!(mesh.physical_tags().len(), 1);
    }

    #[test]
    fn test_validate_unknown_node() {
        let mut mesh = single_tet();
        mesh.add_element([0, 1, 2, 9], None);
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::UnknownNode { node: 9 })
        ));
        assert!(matches!(
            Mesh::new().validate(),
            Err(MeshError::NoVolumeElements)
        ));
    }
}
