//! Touch size calibration.
//!
//! Collects the size and aspect ratio of every stable contact so the
//! contact thresholds can be tuned to a specific device and user.

use crate::app::EventSink;
use crate::config::TouchConfig;
use crate::contacts::Contact;
use crate::geometry::stats;
use crate::protocol::StylusEvent;
use std::fmt;

/// Mean and outer percentiles of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Distribution {
    /// Arithmetic mean.
    pub mean: f64,
    /// 1st percentile.
    pub low: f64,
    /// 99th percentile.
    pub high: f64,
}

impl Distribution {
    fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            mean: stats::mean(&sorted),
            low: stats::percentile(&sorted, 0.01)?,
            high: stats::percentile(&sorted, 0.99)?,
        })
    }
}

/// Calibration results.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Stable contacts recorded.
    pub samples: usize,
    /// Major axis length in millimetres.
    pub size: Distribution,
    /// Major over minor axis.
    pub aspect: Distribution,
}

impl Summary {
    /// Touch thresholds admitting the observed contacts.
    pub fn suggest(&self, touch: &TouchConfig) -> TouchConfig {
        TouchConfig {
            size_min: self.size.low.floor().max(0.0),
            size_max: self.size.high.ceil(),
            aspect_min: 1.0,
            aspect_max: (self.aspect.high * 10.0).ceil() / 10.0,
            ..touch.clone()
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Samples: {}", self.samples)?;
        writeln!(
            f,
            "Size:    {:.3} mm (Min: {:.3} mm; Max: {:.3} mm)",
            self.size.mean, self.size.low, self.size.high
        )?;
        write!(
            f,
            "Aspect:  {:.3} (Min: {:.3}; Max: {:.3})",
            self.aspect.mean, self.aspect.low, self.aspect.high
        )
    }
}

/// Sink that records contact shapes instead of forwarding them.
#[derive(Debug)]
pub struct CalibrationSink {
    diagonal: f64,
    sizes: Vec<f64>,
    aspects: Vec<f64>,
}

impl CalibrationSink {
    /// Creates a sink for a display with the given diagonal in millimetres.
    pub fn new(diagonal: f64) -> Self {
        Self {
            diagonal,
            sizes: Vec::new(),
            aspects: Vec::new(),
        }
    }

    /// Number of contacts recorded so far.
    pub fn samples(&self) -> usize {
        self.sizes.len()
    }

    /// Summarizes the samples so far; `None` if nothing was recorded.
    pub fn summary(&self) -> Option<Summary> {
        Some(Summary {
            samples: self.sizes.len(),
            size: Distribution::from_samples(&self.sizes)?,
            aspect: Distribution::from_samples(&self.aspects)?,
        })
    }
}

impl EventSink for CalibrationSink {
    fn on_contacts(&mut self, contacts: &[Contact]) {
        for contact in contacts.iter().filter(|c| c.stable) {
            self.sizes.push(contact.size_major * self.diagonal);
            self.aspects.push(contact.aspect());
        }
    }

    fn on_stylus(&mut self, _stylus: &StylusEvent) {}

    fn on_stop(&mut self) {
        match self.summary() {
            Some(summary) => tracing::info!(
                samples = summary.samples,
                size = summary.size.mean,
                aspect = summary.aspect.mean,
                "Calibration finished"
            ),
            None => tracing::warn!("Calibration finished without stable contacts"),
        }
    }
}
