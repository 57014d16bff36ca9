//! Robin condition α u + β ∂u/∂n = 0
//!
//! Weak form adds ∫_Γ α u v dΓ + ∫_Γ β (∇u · n) v dΓ. The second term uses
//! the gradient of the owning tetrahedron.

use crate::assembly::{TripletMatrix, assemble_boundary_flux, assemble_boundary_mass};
use crate::mesh::Mesh;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobinBC {
    pub tag: i32,
    pub alpha: f64,
    pub beta: f64,
}

impl RobinBC {
    pub fn new(tag: i32, alpha: f64, beta: f64) -> Self {
        Self { tag, alpha, beta }
    }

    /// α M_Γ + β F_Γ on this condition's faces
    pub fn operator(&self, mesh: &Mesh) -> TripletMatrix {
        let mut op = TripletMatrix::new(mesh.num_nodes());
        op.add_scaled(&assemble_boundary_mass(mesh, self.tag), self.alpha);
        op.add_scaled(&assemble_boundary_flux(mesh, self.tag), self.beta);
        op
    }
}

/// Add every Robin operator to `block`. In the coupled formulation the real
/// operator block multiplies both components, so one call covers both.
pub fn apply_robin(block: &mut TripletMatrix, mesh: &Mesh, bcs: &[RobinBC]) {
    for bc in bcs {
        let faces = mesh.boundaries.iter().filter(|f| f.marker == bc.tag).count();
        log::debug!(
            "Robin on tag {}: {} faces, alpha = {}, beta = {}",
            bc.tag,
            faces,
            bc.alpha,
            bc.beta
        );
        block.add_scaled(&bc.operator(mesh), 1.0);
    }
}
