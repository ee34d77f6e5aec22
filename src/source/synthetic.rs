//! Synthetic input for demos and benchmarks.

use super::{EventSource, SourceError};
use crate::protocol::{Event, HeatmapFrame, StylusReport, StylusSample, ToolMetadata, MAX_X, MAX_Y};

/// Raw cell value of an untouched cell.
const Z_MAX: u8 = 255;
const Z_MIN: u8 = 0;

/// A Gaussian touch blob in cell units.
#[derive(Debug, Clone, Copy)]
struct Blob {
    x: f64,
    y: f64,
    sx: f64,
    sy: f64,
    amplitude: f64,
}

impl Blob {
    fn intensity(&self, col: f64, row: f64) -> f64 {
        let dx = (col - self.x) / self.sx;
        let dy = (row - self.y) / self.sy;
        self.amplitude * (-0.5 * (dx * dx + dy * dy)).exp()
    }
}

/// Scripts a hand writing with a stylus while a finger rests on the screen.
///
/// Each tick yields a stylus sample followed by a heatmap frame. The palm
/// trails the stylus tip down and to the right, the finger stays put. The
/// source never runs out.
#[derive(Debug)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    serial: u32,
    tick: u64,
    pending: Option<Event>,
    open: bool,
}

impl SyntheticSource {
    /// Creates a source producing `width × height` heatmaps.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            serial: 0x5a17,
            tick: 0,
            pending: None,
            open: false,
        }
    }

    /// Stylus tip position in cells at the current tick.
    fn tip(&self) -> (f64, f64) {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        let phase = (self.tick % 200) as f64 / 200.0;
        (w * (0.3 + 0.3 * phase), h * 0.4)
    }

    fn stylus(&self) -> StylusSample {
        let (x, y) = self.tip();
        StylusSample {
            x: x / f64::from(self.width) * MAX_X,
            y: y / f64::from(self.height) * MAX_Y,
            pressure: 1200.0,
            proximity: true,
            contact: true,
            serial: self.serial,
            ..Default::default()
        }
    }

    fn heatmap(&self) -> HeatmapFrame {
        let (tx, ty) = self.tip();
        let blobs = [
            Blob {
                x: f64::from(self.width) * 0.12,
                y: f64::from(self.height) * 0.2,
                sx: 1.0,
                sy: 1.0,
                amplitude: 0.8,
            },
            Blob {
                x: tx + 8.0,
                y: ty + 6.0,
                sx: 4.0,
                sy: 2.5,
                amplitude: 0.9,
            },
        ];

        let range = f64::from(Z_MAX - Z_MIN);
        let cells = (0..self.height)
            .flat_map(|row| (0..self.width).map(move |col| (f64::from(col), f64::from(row))))
            .map(|(col, row)| {
                let touch: f64 = blobs.iter().map(|b| b.intensity(col, row)).sum();
                (f64::from(Z_MAX) - touch.min(1.0) * range).round() as u8
            })
            .collect();

        HeatmapFrame::new(cells, self.width, self.height, Z_MIN, Z_MAX).with_sequence(self.tick)
    }
}

impl EventSource for SyntheticSource {
    fn open(&mut self) -> Result<Option<ToolMetadata>, SourceError> {
        if self.width == 0 || self.height == 0 {
            return Err(SourceError::OpenFailed(format!(
                "invalid heatmap size {}x{}",
                self.width, self.height
            )));
        }
        self.tick = 0;
        self.pending = None;
        self.open = true;
        tracing::info!(width = self.width, height = self.height, "Synthetic source opened");
        Ok(None)
    }

    fn next_event(&mut self) -> Result<Event, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        if let Some(frame) = self.pending.take() {
            self.tick += 1;
            return Ok(frame);
        }
        self.pending = Some(Event::Heatmap(self.heatmap()));
        Ok(Event::Stylus(StylusReport::new(self.stylus())))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
        tracing::info!("Synthetic source closed");
    }
}
