//! Stylus processing.
//!
//! Holds the DFT position estimator for devices that report raw antenna
//! measurements, and the touch rejection cone that follows the stylus tip.

mod cone;
mod dft;

pub use cone::{Cone, ConeState};
pub use dft::{Calibration, DftStylus};
