//! Surface terms on tagged boundary faces

use super::TripletMatrix;
use crate::basis::physical_gradients;
use crate::mesh::{BoundaryFace, Mesh};

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn face_vertices(mesh: &Mesh, face: &BoundaryFace) -> [[f64; 3]; 3] {
    face.nodes.map(|n| mesh.nodes[n].to_array())
}

pub fn face_area(mesh: &Mesh, face: &BoundaryFace) -> f64 {
    let [a, b, c] = face_vertices(mesh, face);
    let n = cross(sub(b, a), sub(c, a));
    0.5 * dot(n, n).sqrt()
}

/// Unit normal pointing out of the owning tetrahedron
fn outward_normal(mesh: &Mesh, face: &BoundaryFace) -> [f64; 3] {
    let [a, b, c] = face_vertices(mesh, face);
    let mut n = cross(sub(b, a), sub(c, a));
    let len = dot(n, n).sqrt();
    n = n.map(|v| v / len);

    let opposite = mesh.nodes[mesh.elements[face.element_idx].nodes[face.local_idx]].to_array();
    let centroid = [
        (a[0] + b[0] + c[0]) / 3.0,
        (a[1] + b[1] + c[1]) / 3.0,
        (a[2] + b[2] + c[2]) / 3.0,
    ];
    if dot(n, sub(centroid, opposite)) < 0.0 {
        n.map(|v| -v)
    } else {
        n
    }
}

/// Surface mass ∫_Γ N_i N_j dΓ over faces with `marker`
pub fn assemble_boundary_mass(mesh: &Mesh, marker: i32) -> TripletMatrix {
    let mut matrix = TripletMatrix::new(mesh.num_nodes());
    for face in mesh.boundaries.iter().filter(|f| f.marker == marker) {
        // (A/12)·[[2,1,1],[1,2,1],[1,1,2]]
        let factor = face_area(mesh, face) / 12.0;
        for &i in &face.nodes {
            for &j in &face.nodes {
                matrix.add(i, j, if i == j { 2.0 * factor } else { factor });
            }
        }
    }
    matrix
}

/// Normal-flux surface term ∫_Γ (∇N_j · n) N_i dΓ over faces with `marker`
///
/// Rows are the three face nodes, columns the four nodes of the owning
/// tetrahedron, so the matrix is not symmetric. Each row sums to zero.
pub fn assemble_boundary_flux(mesh: &Mesh, marker: i32) -> TripletMatrix {
    let mut matrix = TripletMatrix::new(mesh.num_nodes());
    for face in mesh.boundaries.iter().filter(|f| f.marker == marker) {
        let owner = mesh.elements[face.element_idx].nodes;
        let (grads, _) = physical_gradients(&mesh.element_coords(face.element_idx));
        let normal = outward_normal(mesh, face);
        // ∫_Γ N_i dΓ = A/3 for a linear triangle
        let weight = face_area(mesh, face) / 3.0;

        for &i in &face.nodes {
            for (local_j, &j) in owner.iter().enumerate() {
                matrix.add(i, j, dot(grads[local_j], normal) * weight);
            }
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::unit_cube_tetrahedra;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    fn top_marked(n: usize) -> Mesh {
        let mut mesh = unit_cube_tetrahedra(n);
        mesh.mark_boundary(10, |c| (c.z - 1.0).abs() < 1e-12);
        mesh
    }

    #[test]
    fn test_boundary_mass_total_area() {
        let mesh = top_marked(3);
        let mb = assemble_boundary_mass(&mesh, 10);
        let ones = Array1::from_elem(mesh.num_nodes(), 1.0);
        assert_relative_eq!(ones.dot(&mb.matvec(&ones)), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flux_vanishes_for_constant_field() {
        let mesh = top_marked(2);
        let flux = assemble_boundary_flux(&mesh, 10);
        let y = flux.matvec(&Array1::from_elem(mesh.num_nodes(), 7.0));
        assert!(y.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_flux_of_linear_field_uses_outward_normal() {
        // u = z has ∂u/∂n = 1 on the top face, so Σ_i (F u)_i = area = 1
        let mesh = top_marked(2);
        let flux = assemble_boundary_flux(&mesh, 10);
        let u = Array1::from_iter(mesh.nodes.iter().map(|p| p.z));
        assert_relative_eq!(flux.matvec(&u).sum(), 1.0, epsilon = 1e-12);

        let mut bottom = unit_cube_tetrahedra(2);
        bottom.mark_boundary(10, |c| c.z.abs() < 1e-12);
        let flux = assemble_boundary_flux(&bottom, 10);
        assert_relative_eq!(flux.matvec(&u).sum(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unmarked_faces_contribute_nothing() {
        let mesh = unit_cube_tetrahedra(2);
        assert_eq!(assemble_boundary_mass(&mesh, 10).nnz(), 0);
        assert_eq!(assemble_boundary_flux(&mesh, 10).nnz(), 0);
    }
}
