//! Contact detection on normalized heatmaps.
//!
//! The finder turns a heatmap with values in `[0, 1]` (1 = strongest
//! coupling) into a set of tracked, classified touch contacts:
//!
//! ```text
//! neutral subtraction → blob isolation → peak fitting → tracking → classification
//! ```
//!
//! Positions are normalized to `[0, 1]` per axis. Sizes are normalized to
//! the heatmap diagonal so that multiplying by the display diagonal gives a
//! physical length.

mod blob;
mod fitting;
mod tracking;

pub use blob::Blob;
pub use fitting::PeakFit;
pub use tracking::{Candidate, Tracker};

use crate::config::Neutral;
use crate::geometry::{Image, Point};
use serde::{Deserialize, Serialize};

/// Shape classification of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Validity {
    /// Plausibly shaped finger contact.
    Valid,
    /// Palm or edge effect.
    Invalid,
    /// Shape could not be measured.
    #[default]
    Undetermined,
}

impl Validity {
    /// Undetermined contacts are reported as valid.
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Validity::Invalid
    }
}

/// A detected touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Tracking identity, stable while the contact remains trackable.
    pub id: usize,
    /// Sub-pixel mean position, normalized per axis.
    pub mean: Point,
    /// Length along the principal axis (2σ), relative to the grid diagonal.
    pub size_major: f64,
    /// Length across the principal axis (2σ), relative to the grid diagonal.
    pub size_minor: f64,
    /// Angle of the principal axis in radians, `[0, π)`.
    pub orientation: f64,
    /// Tracked for the configured number of frames.
    pub stable: bool,
    /// Shape classification, possibly overridden by palm rejection.
    pub valid: Validity,
}

impl Contact {
    /// Ratio between the major and minor size.
    pub fn aspect(&self) -> f64 {
        if self.size_minor > 0.0 {
            self.size_major / self.size_minor
        } else {
            f64::INFINITY
        }
    }

    /// Position scaled into a physical coordinate space.
    pub fn physical(&self, width: f64, height: f64) -> Point {
        self.mean.scale(width, height)
    }
}

/// Contact finder parameters in normalized units.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderConfig {
    /// A blob needs at least one cell above this value.
    pub activation_threshold: f64,
    /// Blobs grow through cells above this value.
    pub deactivation_threshold: f64,
    /// Resting level estimate.
    pub neutral: Neutral,
    /// Half-size of the fitting window, in cells.
    pub fitting_radius: usize,
    /// Largest per-frame movement that keeps an identity.
    pub tracking_distance: f64,
    /// Largest relative size change that keeps a contact stable.
    pub size_tolerance: f64,
    /// Consecutive frames before a contact is stable.
    pub stability_frames: u32,
    /// Smallest plausible major size, relative to the diagonal.
    pub size_min: f64,
    /// Largest plausible major size, relative to the diagonal.
    pub size_max: f64,
    /// Smallest accepted aspect ratio.
    pub aspect_min: f64,
    /// Largest accepted aspect ratio.
    pub aspect_max: f64,
    /// Contacts reported per frame at most.
    pub max_contacts: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.24,
            deactivation_threshold: 0.20,
            neutral: Neutral::Mode,
            fitting_radius: 2,
            tracking_distance: 0.2,
            size_tolerance: 0.5,
            stability_frames: 3,
            size_min: 0.003,
            size_max: 0.13,
            aspect_min: 1.0,
            aspect_max: 2.5,
            max_contacts: 16,
        }
    }
}

/// Finds and tracks contacts.
///
/// Scratch buffers are kept between frames and only reallocated when the
/// heatmap dimensions change.
#[derive(Debug)]
pub struct Finder {
    config: FinderConfig,
    baseline: Image<f64>,
    labels: Image<u32>,
    candidates: Vec<Candidate>,
    tracker: Tracker,
}

impl Finder {
    /// Creates a finder with empty scratch buffers.
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            baseline: Image::default(),
            labels: Image::default(),
            candidates: Vec::new(),
            tracker: Tracker::new(),
        }
    }

    /// Parameters in use.
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Replaces the contents of `contacts` with this frame's contacts.
    ///
    /// A heatmap without signal yields an empty set.
    pub fn find(&mut self, heatmap: &Image<f64>, contacts: &mut Vec<Contact>) {
        self.candidates.clear();

        if heatmap.is_empty() {
            self.tracker.update(&self.candidates, &self.config, contacts);
            return;
        }

        let level = blob::neutral_level(heatmap, self.config.neutral);
        blob::subtract_neutral(heatmap, level, &mut self.baseline);

        let mut blobs = blob::find_blobs(
            &self.baseline,
            self.config.activation_threshold,
            self.config.deactivation_threshold,
            &mut self.labels,
        );

        if blobs.len() > self.config.max_contacts {
            tracing::debug!(
                found = blobs.len(),
                max = self.config.max_contacts,
                "Too many blobs, keeping the strongest"
            );
            blobs.sort_by(|a, b| b.peak_value.total_cmp(&a.peak_value).then(a.label.cmp(&b.label)));
            blobs.truncate(self.config.max_contacts);
            blobs.sort_by_key(|b| b.label);
        }

        let rows = heatmap.rows() as f64;
        let cols = heatmap.cols() as f64;
        let diagonal = cols.hypot(rows);

        for blob in &blobs {
            let Some(fit) = fitting::fit(&self.baseline, &self.labels, blob, self.config.fitting_radius)
            else {
                continue;
            };

            let eigen = fit.eigen();
            self.candidates.push(Candidate {
                mean: Point::new(
                    ((fit.x + 0.5) / cols).clamp(0.0, 1.0),
                    ((fit.y + 0.5) / rows).clamp(0.0, 1.0),
                ),
                major: 2.0 * eigen.major.max(0.0).sqrt() / diagonal,
                minor: 2.0 * eigen.minor.max(0.0).sqrt() / diagonal,
                orientation: eigen.angle,
            });
        }

        self.tracker.update(&self.candidates, &self.config, contacts);

        tracing::trace!(
            blobs = blobs.len(),
            contacts = contacts.len(),
            level,
            "Contact detection finished"
        );
    }

    /// Drops all tracking state.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn blob_frame(rows: usize, cols: usize, cells: &[(usize, usize)]) -> Image<f64> {
        let mut image = Image::new(rows, cols);
        for &(r, c) in cells {
            image.set(r, c, 1.0);
        }
        image
    }

    fn permissive() -> FinderConfig {
        FinderConfig {
            size_min: 0.0,
            size_max: 1.0,
            aspect_max: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_all_zero_grid_yields_nothing() {
        let mut finder = Finder::new(FinderConfig::default());
        let mut contacts = Vec::new();
        finder.find(&Image::new(10, 10), &mut contacts);
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_empty_grid_yields_nothing() {
        let mut finder = Finder::new(FinderConfig::default());
        let mut contacts = vec![Contact {
            id: 3,
            mean: Point::default(),
            size_major: 0.0,
            size_minor: 0.0,
            orientation: 0.0,
            stable: true,
            valid: Validity::Valid,
        }];
        finder.find(&Image::default(), &mut contacts);
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_square_blob_becomes_stable_contact() {
        let mut finder = Finder::new(permissive());
        let heatmap = blob_frame(5, 5, &[(2, 2), (2, 3), (3, 2), (3, 3)]);
        let mut contacts = Vec::new();

        for frame in 1..=3 {
            finder.find(&heatmap, &mut contacts);
            assert_eq!(contacts.len(), 1);
            assert_eq!(contacts[0].stable, frame == 3);
            assert_eq!(contacts[0].valid, Validity::Valid);
        }

        let contact = contacts[0];
        assert!((contact.mean.x - 0.6).abs() < 1e-9);
        assert!((contact.mean.y - 0.6).abs() < 1e-9);
        assert!((contact.aspect() - 1.0).abs() < 1e-9);
        assert_eq!(contact.valid, Validity::Valid);
    }

    #[test]
    fn test_max_contacts_keeps_strongest() {
        let config = FinderConfig {
            max_contacts: 1,
            ..permissive()
        };
        let mut finder = Finder::new(config);
        let mut heatmap = Image::new(8, 8);
        heatmap.set(1, 1, 0.6);
        heatmap.set(6, 6, 0.9);

        let mut contacts = Vec::new();
        finder.find(&heatmap, &mut contacts);

        assert_eq!(contacts.len(), 1);
        assert!(contacts[0].mean.x > 0.5);
    }

    proptest! {
        #[test]
        fn prop_finder_never_panics(cells in prop::collection::vec(0.0f64..=1.0, 1..=144), cols in 1usize..=12) {
            let rows = (cells.len() / cols).max(1);
            let mut data = cells;
            data.resize(rows * cols, 0.0);
            let heatmap = Image::from_vec(rows, cols, data).unwrap();

            let mut finder = Finder::new(FinderConfig::default());
            let mut contacts = Vec::new();
            finder.find(&heatmap, &mut contacts);

            for contact in &contacts {
                prop_assert!((0.0..=1.0).contains(&contact.mean.x));
                prop_assert!((0.0..=1.0).contains(&contact.mean.y));
                prop_assert!(contact.size_major >= contact.size_minor);
            }
        }
    }
}
