//! Metrics collection and registry.

use crate::app::PipelineStats;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registering or encoding a metric failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of pipeline state for metrics update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Heatmap frames received.
    pub heatmap_frames: u64,
    /// Stylus samples processed, direct or DFT derived.
    pub stylus_samples: u64,
    /// DFT windows received.
    pub dft_windows: u64,
    /// Contacts handed to the sink.
    pub contacts: u64,
    /// Contacts invalidated by a rejection cone.
    pub rejected_contacts: u64,
    /// Frames that were repaired or dropped.
    pub malformed_frames: u64,
    /// Reallocations of the normalized heatmap.
    pub heatmap_resizes: u64,
    /// Rejection cones currently active.
    pub active_cones: u64,
}

/// Prometheus metrics registry for the processing pipeline.
pub struct MetricsRegistry {
    registry: Registry,

    // Input metrics
    heatmap_frames: IntCounter,
    stylus_samples: IntCounter,
    dft_windows: IntCounter,
    malformed_frames: IntCounter,
    heatmap_resizes: IntCounter,

    // Output metrics
    contacts: IntCounter,
    rejected_contacts: IntCounter,
    active_cones: IntGauge,
}

/// Advances a counter to an absolute total.
fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all pipeline metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let heatmap_frames = IntCounter::new(
            "digitizer_heatmap_frames_total",
            "Total number of heatmap frames received",
        )?;
        let stylus_samples = IntCounter::new(
            "digitizer_stylus_samples_total",
            "Total number of stylus samples processed",
        )?;
        let dft_windows = IntCounter::new(
            "digitizer_dft_windows_total",
            "Total number of DFT windows received",
        )?;
        let malformed_frames = IntCounter::new(
            "digitizer_malformed_frames_total",
            "Heatmap frames that were repaired or dropped",
        )?;
        let heatmap_resizes = IntCounter::new(
            "digitizer_heatmap_resizes_total",
            "Reallocations of the normalized heatmap buffer",
        )?;

        let contacts = IntCounter::new(
            "digitizer_contacts_total",
            "Total number of contacts emitted",
        )?;
        let rejected_contacts = IntCounter::new(
            "digitizer_contacts_rejected_total",
            "Contacts invalidated by a stylus rejection cone",
        )?;
        let active_cones = IntGauge::new(
            "digitizer_active_cones",
            "Rejection cones currently able to reject touches",
        )?;

        registry.register(Box::new(heatmap_frames.clone()))?;
        registry.register(Box::new(stylus_samples.clone()))?;
        registry.register(Box::new(dft_windows.clone()))?;
        registry.register(Box::new(malformed_frames.clone()))?;
        registry.register(Box::new(heatmap_resizes.clone()))?;
        registry.register(Box::new(contacts.clone()))?;
        registry.register(Box::new(rejected_contacts.clone()))?;
        registry.register(Box::new(active_cones.clone()))?;

        Ok(Self {
            registry,
            heatmap_frames,
            stylus_samples,
            dft_windows,
            malformed_frames,
            heatmap_resizes,
            contacts,
            rejected_contacts,
            active_cones,
        })
    }

    /// Updates all metrics from a snapshot of pipeline state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        advance(&self.heatmap_frames, snapshot.heatmap_frames);
        advance(&self.stylus_samples, snapshot.stylus_samples);
        advance(&self.dft_windows, snapshot.dft_windows);
        advance(&self.malformed_frames, snapshot.malformed_frames);
        advance(&self.heatmap_resizes, snapshot.heatmap_resizes);
        advance(&self.contacts, snapshot.contacts);
        advance(&self.rejected_contacts, snapshot.rejected_contacts);

        self.active_cones.set(snapshot.active_cones as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the processor's counters.
    pub fn from_stats(stats: &PipelineStats) -> Self {
        Self {
            heatmap_frames: stats.heatmap_frames,
            stylus_samples: stats.stylus_samples,
            dft_windows: stats.dft_windows,
            contacts: stats.contacts,
            rejected_contacts: stats.rejected_contacts,
            malformed_frames: stats.malformed_frames,
            heatmap_resizes: stats.heatmap_resizes,
            active_cones: stats.active_cones,
        }
    }
}
