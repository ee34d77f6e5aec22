//! The frame processor.
//!
//! Routes every decoded event through the pipeline:
//!
//! ```text
//! heatmap → normalize → find contacts → update cones → filter contacts → sink
//! stylus  ─────────────────────────────┐
//! dft     → interpolate ───────────────┴→ update cone origin → sink
//! ```

use super::sink::EventSink;
use super::styli::StylusTable;
use crate::config::{Config, ConfigError};
use crate::contacts::{Contact, Finder, Validity};
use crate::geometry::{Image, Point};
use crate::protocol::{
    DftWindow, Event, HeatmapFrame, StylusEvent, StylusReport, StylusSample, ToolMetadata, MAX_X,
    MAX_Y,
};
use crate::stylus::DftStylus;
use std::time::Instant;
use thiserror::Error;

/// Errors that prevent a processing session from starting.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Counters describing the work done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Heatmap frames received, usable or not.
    pub heatmap_frames: u64,
    /// Stylus samples handled, direct or DFT derived.
    pub stylus_samples: u64,
    /// DFT windows received.
    pub dft_windows: u64,
    /// Contacts handed to the sink.
    pub contacts: u64,
    /// Contacts invalidated by a rejection cone.
    pub rejected_contacts: u64,
    /// Frames that needed repair or were dropped.
    pub malformed_frames: u64,
    /// Reallocations of the normalized heatmap.
    pub heatmap_resizes: u64,
    /// Cones able to reject touches at the last heatmap frame.
    pub active_cones: u64,
}

/// Normalizes a raw frame into `heatmap`, inverting its polarity.
///
/// Returns whether the frame was usable and whether `heatmap` had to be
/// resized. Missing cells are treated as untouched and extra cells are
/// ignored.
fn normalize(frame: &HeatmapFrame, heatmap: &mut Image<f64>) -> (bool, bool) {
    let rows = frame.height() as usize;
    let cols = frame.width() as usize;
    if rows == 0 || cols == 0 || frame.z_max() <= frame.z_min() {
        return (false, false);
    }

    let resized = heatmap.resize(rows, cols);

    let z_min = f64::from(frame.z_min());
    let range = f64::from(frame.z_max()) - z_min;
    let cells = frame.cells();

    for (i, out) in heatmap.data_mut().iter_mut().enumerate() {
        *out = match cells.get(i) {
            Some(&raw) => (1.0 - (f64::from(raw) - z_min) / range).clamp(0.0, 1.0),
            None => 0.0,
        };
    }

    (true, resized)
}

/// Drives contact detection, DFT interpolation and palm rejection.
pub struct FrameProcessor<S> {
    config: Config,
    metadata: Option<ToolMetadata>,
    heatmap: Image<f64>,
    finder: Finder,
    contacts: Vec<Contact>,
    dft: DftStylus,
    styli: StylusTable,
    stats: PipelineStats,
    sink: S,
}

impl<S: EventSink> FrameProcessor<S> {
    /// Creates a processor for one session.
    ///
    /// Fails if the configuration is invalid, in particular if the display
    /// has no area.
    pub fn new(
        config: Config,
        metadata: Option<ToolMetadata>,
        sink: S,
    ) -> Result<Self, ProcessorError> {
        config.validate()?;

        match &metadata {
            Some(meta) => {
                let t = meta.transform;
                tracing::info!(
                    rows = meta.rows,
                    columns = meta.columns,
                    width = meta.width,
                    height = meta.height,
                    transform = ?[t.xx, t.yx, t.tx, t.xy, t.yy, t.ty],
                    vendor = ?meta.vendor,
                    "Tool metadata"
                );
            }
            None => tracing::info!("No tool metadata, using defaults"),
        }

        Ok(Self {
            finder: Finder::new(config.contacts()),
            dft: DftStylus::new(&config, metadata.as_ref()),
            styli: StylusTable::new(&config.cone),
            config,
            metadata,
            heatmap: Image::default(),
            contacts: Vec::new(),
            stats: PipelineStats::default(),
            sink,
        })
    }

    /// Session configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tool metadata reported by the device, if any.
    pub fn metadata(&self) -> Option<&ToolMetadata> {
        self.metadata.as_ref()
    }

    /// The most recent normalized heatmap.
    pub fn heatmap(&self) -> &Image<f64> {
        &self.heatmap
    }

    /// The contact set of the most recent heatmap frame.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Per-stylus state.
    pub fn styli(&self) -> &StylusTable {
        &self.styli
    }

    /// Work counters.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// The output sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the processor, returning its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Processes one decoded event.
    pub fn process(&mut self, event: &Event) {
        match event {
            Event::Heatmap(frame) => self.process_heatmap(frame),
            Event::Stylus(report) => self.process_stylus(report),
            Event::Dft(window) => self.process_dft(window),
        }
    }

    /// Runs contact detection and palm rejection on a heatmap.
    ///
    /// A frame that cannot be normalized leaves no contacts behind and is
    /// not reported to the sink.
    pub fn process_heatmap(&mut self, frame: &HeatmapFrame) {
        self.stats.heatmap_frames += 1;

        if !frame.is_valid() {
            self.stats.malformed_frames += 1;
            tracing::warn!(?frame, "Malformed heatmap frame");
        }

        let (usable, resized) = normalize(frame, &mut self.heatmap);
        if resized {
            self.stats.heatmap_resizes += 1;
            tracing::debug!(
                rows = self.heatmap.rows(),
                cols = self.heatmap.cols(),
                "Heatmap buffer resized"
            );
        }
        if !usable {
            self.contacts.clear();
            return;
        }

        self.finder.find(&self.heatmap, &mut self.contacts);
        self.update_touch_cone(frame.timestamp());
        self.stats.active_cones = self.styli.active_count(frame.timestamp()) as u64;

        self.stats.contacts += self.contacts.len() as u64;
        self.sink.on_contacts(&self.contacts);
    }

    /// Handles a stylus sample reported directly by the device.
    pub fn process_stylus(&mut self, report: &StylusReport) {
        self.update_stylus(&report.sample, report.timestamp);
    }

    /// Feeds a DFT window to the estimator and handles the resulting sample.
    pub fn process_dft(&mut self, window: &DftWindow) {
        self.stats.dft_windows += 1;
        self.dft.input(window);
        let sample = self.dft.stylus();
        self.update_stylus(&sample, window.timestamp);
    }

    fn update_stylus(&mut self, sample: &StylusSample, now: Instant) {
        self.stats.stylus_samples += 1;

        let position = Point::new(
            sample.x / MAX_X * self.config.width,
            sample.y / MAX_Y * self.config.height,
        );

        let state = self.styli.switch(sample.serial);
        state.last = Some(*sample);
        if sample.proximity {
            state.cone.update_position(position, now);
        }

        self.sink.on_stylus(&StylusEvent::from_sample(sample, position));
    }

    /// Turns the cones towards invalid contacts, then invalidates every
    /// other contact inside an active cone.
    fn update_touch_cone(&mut self, now: Instant) {
        if !self.config.cone.enabled || !self.styli.any_alive() {
            return;
        }

        let (width, height) = (self.config.width, self.config.height);

        for contact in self.contacts.iter().filter(|c| c.valid == Validity::Invalid) {
            self.styli.update_direction(contact.physical(width, height), now);
        }

        for contact in self.contacts.iter_mut().filter(|c| c.valid != Validity::Invalid) {
            if self.styli.rejects(contact.physical(width, height), now) {
                contact.valid = Validity::Invalid;
                self.stats.rejected_contacts += 1;
                tracing::trace!(id = contact.id, "Contact rejected by cone");
            }
        }
    }
}

impl<S> std::fmt::Debug for FrameProcessor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameProcessor")
            .field("heatmap", &self.heatmap)
            .field("contacts", &self.contacts.len())
            .field("styli", &self.styli.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::sink::RecordingSink;
    use crate::protocol::{Antenna, DftKind};
    use proptest::prelude::*;
    use std::time::Duration;

    fn processor(config: Config) -> FrameProcessor<RecordingSink> {
        FrameProcessor::new(config, None, RecordingSink::new()).unwrap()
    }

    fn contact(id: usize, x: f64, y: f64, valid: Validity) -> Contact {
        Contact {
            id,
            mean: Point::new(x, y),
            size_major: 0.05,
            size_minor: 0.05,
            orientation: 0.0,
            stable: true,
            valid,
        }
    }

    fn stylus_at(x: f64, y: f64, config: &Config) -> StylusReport {
        StylusReport::new(StylusSample {
            x: x / config.width * MAX_X,
            y: y / config.height * MAX_Y,
            proximity: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_zero_display_rejected() {
        let result = FrameProcessor::new(Config::with_display(300.0, 0.0), None, RecordingSink::new());
        assert!(matches!(result, Err(ProcessorError::Config(ConfigError::InvalidDisplaySize { .. }))));
    }

    #[test]
    fn test_normalization_endpoints() {
        let mut p = processor(Config::with_display(300.0, 200.0));
        p.process_heatmap(&HeatmapFrame::new(vec![10, 200, 105, 10], 2, 2, 10, 200));

        let data = p.heatmap().data();
        assert_eq!(data[0], 1.0);
        assert_eq!(data[1], 0.0);
        assert!((data[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_cells_clamped() {
        let mut p = processor(Config::with_display(300.0, 200.0));
        p.process_heatmap(&HeatmapFrame::new(vec![0, 255, 50, 50], 2, 2, 20, 220));

        let data = p.heatmap().data();
        assert_eq!(data[0], 1.0);
        assert_eq!(data[1], 0.0);
    }

    #[test]
    fn test_resize_only_on_dimension_change() {
        let mut p = processor(Config::with_display(300.0, 200.0));
        let frame = HeatmapFrame::new(vec![255; 20], 5, 4, 0, 255);

        p.process_heatmap(&frame);
        p.process_heatmap(&frame);
        assert_eq!(p.stats().heatmap_resizes, 1);

        p.process_heatmap(&HeatmapFrame::new(vec![255; 12], 3, 4, 0, 255));
        assert_eq!(p.stats().heatmap_resizes, 2);
        assert_eq!((p.heatmap().rows(), p.heatmap().cols()), (4, 3));
    }

    #[test]
    fn test_short_payload_is_padded() {
        let mut p = processor(Config::with_display(300.0, 200.0));
        p.process_heatmap(&HeatmapFrame::new(vec![0; 5], 4, 4, 0, 255));

        assert_eq!(p.stats().malformed_frames, 1);
        assert_eq!(p.heatmap().len(), 16);
        assert_eq!(p.heatmap().get(3, 3), Some(0.0));
        assert_eq!(p.sink().frames.len(), 1);
    }

    #[test]
    fn test_empty_frame_is_absorbed() {
        let mut p = processor(Config::with_display(300.0, 200.0));
        p.process_heatmap(&HeatmapFrame::new(vec![], 0, 0, 0, 255));
        p.process_heatmap(&HeatmapFrame::new(vec![7; 4], 2, 2, 9, 9));

        assert_eq!(p.stats().malformed_frames, 2);
        assert!(p.sink().frames.is_empty());
    }

    #[test]
    fn test_dropped_frame_clears_contacts() {
        let mut p = processor(Config::with_display(300.0, 200.0));
        p.contacts = vec![contact(0, 0.5, 0.5, Validity::Valid)];

        p.process_heatmap(&HeatmapFrame::new(vec![7; 4], 2, 2, 9, 9));
        assert!(p.contacts().is_empty());
        assert!(p.sink().frames.is_empty());
    }

    #[test]
    fn test_stylus_makes_cone_alive() {
        let config = Config::with_display(300.0, 200.0);
        let mut p = processor(config.clone());
        p.process_stylus(&stylus_at(150.0, 100.0, &config));

        let cone = &p.styli().current().cone;
        assert!(cone.alive());
        let origin = cone.origin().unwrap();
        assert!((origin.x - 150.0).abs() < 1e-9);
        assert!((origin.y - 100.0).abs() < 1e-9);

        let event = p.sink().styli[0];
        assert!((event.position.x - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_stylus_keeps_cone_dead() {
        let mut p = processor(Config::with_display(300.0, 200.0));
        p.process_stylus(&StylusSample::out_of_range(0).into());
        assert!(!p.styli().any_alive());
        assert_eq!(p.sink().styli.len(), 1);
    }

    #[test]
    fn test_palm_rejection_updates_direction_before_check() {
        let config = Config::with_display(300.0, 200.0);
        let mut p = processor(config.clone());
        p.process_stylus(&stylus_at(150.0, 100.0, &config));

        p.contacts = vec![
            // Palm right of the stylus.
            contact(0, 160.0 / 300.0, 0.5, Validity::Invalid),
            // Finger between stylus and palm.
            contact(1, 170.0 / 300.0, 0.5, Validity::Undetermined),
            // Finger far away.
            contact(2, 10.0 / 300.0, 10.0 / 200.0, Validity::Valid),
        ];
        p.update_touch_cone(Instant::now());

        assert_eq!(p.contacts[0].valid, Validity::Invalid);
        assert_eq!(p.contacts[1].valid, Validity::Invalid);
        assert_eq!(p.contacts[2].valid, Validity::Valid);
        assert_eq!(p.stats().rejected_contacts, 1);
    }

    #[test]
    fn test_stale_stylus_report_does_not_reject() {
        let config = Config::with_display(300.0, 200.0);
        let timeout = Duration::from_millis(config.cone.timeout_ms);
        let mut p = processor(config.clone());

        let t0 = Instant::now();
        let mut report = stylus_at(150.0, 100.0, &config);
        report.timestamp = t0;
        p.process_stylus(&report);

        // Palm right of the tip turns the cone, finger between them.
        let later = t0 + timeout * 4;
        p.contacts = vec![
            contact(0, 160.0 / 300.0, 0.5, Validity::Invalid),
            contact(1, 170.0 / 300.0, 0.5, Validity::Valid),
        ];
        p.update_touch_cone(later);
        assert_eq!(p.contacts[1].valid, Validity::Valid);
        assert_eq!(p.stats().rejected_contacts, 0);
        assert_eq!(p.styli().active_count(later), 0);
    }

    #[test]
    fn test_disabled_cone_leaves_contacts() {
        let mut config = Config::with_display(300.0, 200.0);
        config.cone.enabled = false;
        let mut p = processor(config.clone());
        p.process_stylus(&stylus_at(150.0, 100.0, &config));

        p.contacts = vec![
            contact(0, 160.0 / 300.0, 0.5, Validity::Invalid),
            contact(1, 170.0 / 300.0, 0.5, Validity::Valid),
        ];
        p.update_touch_cone(Instant::now());
        assert_eq!(p.contacts[1].valid, Validity::Valid);
    }

    #[test]
    fn test_dft_window_drives_stylus_path() {
        let mut p = processor(Config::with_display(300.0, 200.0));
        let peak = |len: usize, at: usize| -> Vec<Antenna> {
            (0..len)
                .map(|i| if i == at { Antenna::new(500.0, 0.0) } else { Antenna::default() })
                .collect()
        };

        p.process_dft(&DftWindow::new(DftKind::Position, peak(44, 22), peak(64, 32)));
        assert!(p.styli().any_alive());
        assert_eq!(p.stats().dft_windows, 1);

        p.process_dft(&DftWindow::new(DftKind::Position, vec![Antenna::default(); 44], vec![Antenna::default(); 64]));
        let last = p.sink().styli.last().unwrap();
        assert!(!last.proximity);
    }

    proptest! {
        #[test]
        fn prop_normalized_values_in_unit_range(
            cells in prop::collection::vec(any::<u8>(), 12),
            z_min in 0u8..128,
            span in 1u8..128,
        ) {
            let mut p = processor(Config::with_display(300.0, 200.0));
            p.process_heatmap(&HeatmapFrame::new(cells, 4, 3, z_min, z_min + span));

            for &v in p.heatmap().data() {
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
