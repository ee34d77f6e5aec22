//! DFT antenna measurement windows.

use std::time::Instant;

/// A single antenna measurement as a complex DFT coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Antenna {
    /// Real part.
    pub real: f64,
    /// Imaginary part.
    pub imag: f64,
}

impl Antenna {
    /// Creates a coefficient.
    pub const fn new(real: f64, imag: f64) -> Self {
        Self { real, imag }
    }

    /// Signal magnitude.
    #[inline]
    pub fn amplitude(&self) -> f64 {
        self.real.hypot(self.imag)
    }

    /// Signal phase in radians.
    #[inline]
    pub fn phase(&self) -> f64 {
        self.imag.atan2(self.real)
    }

    /// Real part of `self * conj(other)`: positive when both are in phase.
    #[inline]
    pub fn coherence(&self, other: &Antenna) -> f64 {
        self.real * other.real + self.imag * other.imag
    }
}

/// What a window measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DftKind {
    /// Tip electrode position.
    Position,
    /// Secondary electrode position, used to derive tilt.
    Tilt,
    /// Frequency bins encoding tip pressure.
    Pressure,
    /// Button signal.
    Button,
    /// A window type the estimator does not interpret.
    Unknown(u8),
}

/// Window metadata defined by the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowMeta {
    /// Measurement type.
    pub kind: DftKind,
    /// Index of the first row antenna covered by `rows`.
    pub first_row: u16,
    /// Index of the first column antenna covered by `columns`.
    pub first_column: u16,
    /// Measurement group; windows of one burst share it.
    pub group: Option<u32>,
}

impl WindowMeta {
    /// Metadata for a window starting at antenna 0 with no group.
    pub fn new(kind: DftKind) -> Self {
        Self {
            kind,
            first_row: 0,
            first_column: 0,
            group: None,
        }
    }
}

/// A burst of antenna measurements.
///
/// Row antennas resolve the vertical axis, column antennas the horizontal
/// one. Pressure windows carry one entry per frequency bin in `rows`.
#[derive(Debug, Clone)]
pub struct DftWindow {
    /// Row antenna measurements.
    pub rows: Vec<Antenna>,
    /// Column antenna measurements.
    pub columns: Vec<Antenna>,
    /// Protocol metadata.
    pub meta: WindowMeta,
    /// Receive timestamp.
    pub timestamp: Instant,
}

impl DftWindow {
    /// Creates a window stamped with the current time.
    pub fn new(kind: DftKind, rows: Vec<Antenna>, columns: Vec<Antenna>) -> Self {
        Self {
            rows,
            columns,
            meta: WindowMeta::new(kind),
            timestamp: Instant::now(),
        }
    }

    /// Sets the antenna offsets of the measured ranges.
    pub fn with_offsets(mut self, first_row: u16, first_column: u16) -> Self {
        self.meta.first_row = first_row;
        self.meta.first_column = first_column;
        self
    }

    /// Total signal energy across both axes.
    pub fn energy(&self) -> f64 {
        self.rows
            .iter()
            .chain(self.columns.iter())
            .map(|a| a.real * a.real + a.imag * a.imag)
            .sum()
    }
}
