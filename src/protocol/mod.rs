//! Typed events handed over by the report decoder.
//!
//! The byte-level decoding of device reports happens elsewhere; this module
//! only defines the shapes the processing core consumes and produces.

mod dft;
mod heatmap;
mod metadata;
mod stylus;

pub use dft::{Antenna, DftKind, DftWindow, WindowMeta};
pub use heatmap::HeatmapFrame;
pub use metadata::{ToolMetadata, Transform};
pub use stylus::{StylusEvent, StylusReport, StylusSample, BUTTON_BARREL, BUTTON_ERASER};

/// Largest horizontal device coordinate.
pub const MAX_X: f64 = 9600.0;
/// Largest vertical device coordinate.
pub const MAX_Y: f64 = 7200.0;

/// One decoded input event.
#[derive(Debug, Clone)]
pub enum Event {
    /// A capacitive heatmap frame.
    Heatmap(HeatmapFrame),
    /// A stylus sample computed by the device.
    Stylus(StylusReport),
    /// Raw antenna measurements for the stylus estimator.
    Dft(DftWindow),
}
