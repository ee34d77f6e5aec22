//! Geometry and numeric primitives.
//!
//! Points, vectors, sample grids and the handful of linear algebra and
//! statistics routines the rest of the pipeline builds on.

mod image;
pub mod linalg;
mod point;
pub mod stats;

pub use image::Image;
pub use linalg::SymmetricEigen2;
pub use point::{Point, Vector};
