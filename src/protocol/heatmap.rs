//! Capacitive heatmap frames.

use std::time::Instant;

/// A single capacitive sensor sample as handed over by the report decoder.
///
/// Low raw values mean strong capacitive coupling; the processor inverts
/// the polarity while normalizing.
#[derive(Clone)]
pub struct HeatmapFrame {
    /// Raw cell intensities, row-major.
    cells: Vec<u8>,
    /// Number of sensor columns.
    width: u32,
    /// Number of sensor rows.
    height: u32,
    /// Declared lower intensity bound.
    z_min: u8,
    /// Declared upper intensity bound.
    z_max: u8,
    /// Receive timestamp.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl HeatmapFrame {
    /// Creates a new frame stamped with the current time.
    pub fn new(cells: Vec<u8>, width: u32, height: u32, z_min: u8, z_max: u8) -> Self {
        Self::with_timestamp(cells, width, height, z_min, z_max, Instant::now())
    }

    /// Creates a frame with an explicit receive time.
    pub fn with_timestamp(
        cells: Vec<u8>,
        width: u32,
        height: u32,
        z_min: u8,
        z_max: u8,
        timestamp: Instant,
    ) -> Self {
        Self {
            cells,
            width,
            height,
            z_min,
            z_max,
            timestamp,
            sequence: 0,
        }
    }

    /// Attaches a sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Raw cell intensities, row-major.
    #[inline]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Number of sensor columns.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of sensor rows.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Declared lower intensity bound.
    #[inline]
    pub fn z_min(&self) -> u8 {
        self.z_min
    }

    /// Declared upper intensity bound.
    #[inline]
    pub fn z_max(&self) -> u8 {
        self.z_max
    }

    /// Receive timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Monotonic sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the declared number of cells (width * height).
    #[inline]
    pub fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the payload matches the declared dimensions and range.
    pub fn is_valid(&self) -> bool {
        self.cell_count() > 0 && self.cells.len() == self.cell_count() && self.z_max > self.z_min
    }
}

impl std::fmt::Debug for HeatmapFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeatmapFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("z_min", &self.z_min)
            .field("z_max", &self.z_max)
            .field("sequence", &self.sequence)
            .field("cell_bytes", &self.cells.len())
            .finish()
    }
}
