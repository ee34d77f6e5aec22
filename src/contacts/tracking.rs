//! Cross-frame contact tracking and classification.

use super::{Contact, FinderConfig, Validity};
use crate::geometry::Point;

/// A refined blob before it has been given an identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Mean position, normalized per axis.
    pub mean: Point,
    /// Major size, relative to the grid diagonal.
    pub major: f64,
    /// Minor size, relative to the grid diagonal.
    pub minor: f64,
    /// Principal axis angle in radians.
    pub orientation: f64,
}

#[derive(Debug, Clone, Copy)]
struct Track {
    id: usize,
    mean: Point,
    major: f64,
    /// Consecutive frames within the size tolerance.
    frames: u32,
    /// Classified as a palm; stays so while tracked.
    palm: bool,
}

/// Keeps contact identities stable across frames.
#[derive(Debug, Default)]
pub struct Tracker {
    tracks: Vec<Track>,
}

impl Tracker {
    /// Creates a tracker with no identities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of contacts tracked from the previous frame.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether no contact is tracked.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Forgets all identities.
    pub fn reset(&mut self) {
        self.tracks.clear();
    }

    /// Matches this frame's candidates against the previous frame and
    /// writes the classified contacts to `out` in candidate order.
    ///
    /// Pairs are assigned greedily by ascending distance, then by smaller
    /// size change, then by candidate and track order.
    pub fn update(&mut self, candidates: &[Candidate], config: &FinderConfig, out: &mut Vec<Contact>) {
        out.clear();

        let mut pairs = Vec::new();
        for (ci, cand) in candidates.iter().enumerate() {
            for (ti, track) in self.tracks.iter().enumerate() {
                let distance = track.mean.distance(cand.mean);
                if distance <= config.tracking_distance {
                    pairs.push((distance, (cand.major - track.major).abs(), ci, ti));
                }
            }
        }
        pairs.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.1.total_cmp(&b.1))
                .then(a.2.cmp(&b.2))
                .then(a.3.cmp(&b.3))
        });

        let mut matched: Vec<Option<usize>> = vec![None; candidates.len()];
        let mut taken = vec![false; self.tracks.len()];
        for &(_, _, ci, ti) in &pairs {
            if matched[ci].is_none() && !taken[ti] {
                matched[ci] = Some(ti);
                taken[ti] = true;
            }
        }

        let mut used: Vec<usize> = matched
            .iter()
            .flatten()
            .map(|&ti| self.tracks[ti].id)
            .collect();

        let mut next = Vec::with_capacity(candidates.len());
        for (cand, slot) in candidates.iter().zip(&matched) {
            let track = match slot.map(|ti| self.tracks[ti]) {
                Some(prev) => {
                    let relative = if prev.major > 0.0 {
                        (cand.major - prev.major).abs() / prev.major
                    } else {
                        f64::INFINITY
                    };
                    Track {
                        id: prev.id,
                        mean: cand.mean,
                        major: cand.major,
                        frames: if relative <= config.size_tolerance {
                            prev.frames.saturating_add(1)
                        } else {
                            1
                        },
                        palm: prev.palm,
                    }
                }
                None => {
                    let id = (0..).find(|id| !used.contains(id)).unwrap_or(used.len());
                    used.push(id);
                    Track {
                        id,
                        mean: cand.mean,
                        major: cand.major,
                        frames: 1,
                        palm: false,
                    }
                }
            };

            let (validity, palm) = classify(cand, track.palm, config);
            let track = Track { palm, ..track };

            out.push(Contact {
                id: track.id,
                mean: cand.mean,
                size_major: cand.major,
                size_minor: cand.minor,
                orientation: cand.orientation,
                stable: track.frames >= config.stability_frames,
                valid: validity,
            });
            next.push(track);
        }

        let lost = self.tracks.len() - taken.iter().filter(|&&t| t).count();
        if lost > 0 {
            tracing::trace!(lost, "Contacts lost tracking");
        }

        self.tracks = next;
    }
}

/// Shape classification. Returns the validity and whether the contact is
/// remembered as a palm.
///
/// Stability plays no part here. A shape that cannot be measured yet stays
/// undetermined.
fn classify(cand: &Candidate, palm: bool, config: &FinderConfig) -> (Validity, bool) {
    if palm {
        return (Validity::Invalid, true);
    }
    if !cand.major.is_finite() || !cand.minor.is_finite() {
        return (Validity::Undetermined, false);
    }

    let aspect = if cand.minor > 0.0 {
        cand.major / cand.minor
    } else {
        f64::INFINITY
    };

    if cand.major > config.size_max || aspect > config.aspect_max {
        return (Validity::Invalid, true);
    }
    if cand.major < config.size_min || aspect < config.aspect_min {
        return (Validity::Invalid, false);
    }

    (Validity::Valid, false)
}
