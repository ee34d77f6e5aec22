//! Stylus samples and the events emitted for them.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Barrel button bit in [`StylusSample::buttons`].
pub const BUTTON_BARREL: u8 = 1 << 0;
/// Eraser (rubber) bit in [`StylusSample::buttons`].
pub const BUTTON_ERASER: u8 = 1 << 1;

/// One instant of stylus state in device coordinates.
///
/// `x` and `y` range over `[0, MAX_X] x [0, MAX_Y]` and carry no meaning
/// unless `proximity` is set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StylusSample {
    /// Horizontal position in device units.
    pub x: f64,
    /// Vertical position in device units.
    pub y: f64,
    /// Tip pressure in device units.
    pub pressure: f64,
    /// Tilt towards +x, in degrees.
    pub tilt_x: f64,
    /// Tilt towards +y, in degrees.
    pub tilt_y: f64,
    /// Button bits.
    pub buttons: u8,
    /// The stylus is in range.
    pub proximity: bool,
    /// The tip touches the display.
    pub contact: bool,
    /// Tool serial number; 0 if unknown.
    pub serial: u32,
}

impl StylusSample {
    /// A sample reporting that no stylus is in range.
    pub fn out_of_range(serial: u32) -> Self {
        Self {
            serial,
            ..Default::default()
        }
    }

    /// Whether the barrel button is held.
    #[inline]
    pub fn barrel(&self) -> bool {
        self.buttons & BUTTON_BARREL != 0
    }

    /// Whether the eraser end is in use.
    #[inline]
    pub fn eraser(&self) -> bool {
        self.buttons & BUTTON_ERASER != 0
    }
}

/// A stylus sample reported directly by the device, with its receive time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StylusReport {
    /// The reported state.
    pub sample: StylusSample,
    /// Receive timestamp.
    pub timestamp: Instant,
}

impl StylusReport {
    /// Stamps `sample` with the current time.
    pub fn new(sample: StylusSample) -> Self {
        Self::with_timestamp(sample, Instant::now())
    }

    /// Stamps `sample` with `timestamp`.
    pub fn with_timestamp(sample: StylusSample, timestamp: Instant) -> Self {
        Self { sample, timestamp }
    }
}

impl From<StylusSample> for StylusReport {
    fn from(sample: StylusSample) -> Self {
        Self::new(sample)
    }
}

/// Stylus state handed to the output sink, in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StylusEvent {
    /// Tip position in mm.
    pub position: Point,
    /// Tip pressure in device units.
    pub pressure: f64,
    /// Tilt towards +x, in degrees.
    pub tilt_x: f64,
    /// Tilt towards +y, in degrees.
    pub tilt_y: f64,
    /// Button bits.
    pub buttons: u8,
    /// The stylus is in range.
    pub proximity: bool,
    /// The tip touches the display.
    pub contact: bool,
    /// Tool serial number.
    pub serial: u32,
}

impl StylusEvent {
    /// Converts a sample whose position was already mapped to mm.
    pub fn from_sample(sample: &StylusSample, position: Point) -> Self {
        Self {
            position,
            pressure: sample.pressure,
            tilt_x: sample.tilt_x,
            tilt_y: sample.tilt_y,
            buttons: sample.buttons,
            proximity: sample.proximity,
            contact: sample.contact,
            serial: sample.serial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_bits() {
        let sample = StylusSample {
            buttons: BUTTON_ERASER,
            ..Default::default()
        };
        assert!(sample.eraser());
        assert!(!sample.barrel());
    }

    #[test]
    fn test_out_of_range_has_no_proximity() {
        let sample = StylusSample::out_of_range(42);
        assert!(!sample.proximity);
        assert!(!sample.contact);
        assert_eq!(sample.serial, 42);
    }
}
