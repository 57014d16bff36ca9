//! Finite element matrix assembly
//!
//! Element contributions are computed independently (in parallel with the
//! `parallel` feature) and merged into a [`TripletMatrix`].

mod boundary;
mod coupled;
mod load;
mod mass;
mod stiffness;
mod triplet;

pub use boundary::{assemble_boundary_flux, assemble_boundary_mass, face_area};
pub use coupled::{CoupledProblem, deinterleave, interleave};
pub use load::assemble_load;
pub use mass::assemble_weighted_mass;
pub use stiffness::assemble_weighted_stiffness;
pub use triplet::TripletMatrix;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Run `element_fn` on every element index and concatenate the triplets
pub(crate) fn collect_element_triplets<F>(
    num_elements: usize,
    element_fn: F,
) -> Vec<(usize, usize, f64)>
where
    F: Fn(usize) -> Vec<(usize, usize, f64)> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..num_elements)
            .into_par_iter()
            .flat_map_iter(element_fn)
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..num_elements).flat_map(element_fn).collect()
    }
}
