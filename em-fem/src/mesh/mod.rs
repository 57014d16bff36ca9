//! Mesh data structures, generators and Gmsh input

mod error;
mod generators;
mod gmsh;
mod types;

pub use error::MeshError;
pub use generators::{box_mesh_tetrahedra, unit_cube_tetrahedra};
pub use gmsh::{parse_msh, read_msh};
pub use types::{BoundaryFace, BoundingBox, Element, Mesh, Point, TET_FACES};
