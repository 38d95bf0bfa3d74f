//! Quads, layer transforms and the shared homography solver.

mod homography;
mod quad;
mod transform;

pub use homography::{Homography, solve_linear_8};
pub use quad::{MIN_QUAD_AREA, Quad};
pub use transform::{LayerBounds, TransformMatrix, extract_quad};
