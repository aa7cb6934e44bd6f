//! Sky geometry: pixelization, coordinate transforms and depth models.

pub mod depth;
pub mod grid;
pub mod transform;

pub use depth::{DepthModel, FlatSedDepth};
pub use grid::{HealpixGrid, SkyMap};
pub use transform::Site;
