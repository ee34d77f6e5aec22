//! Blob isolation on a normalized heatmap.
//!
//! A blob is an 8-connected region of cells above the deactivation
//! threshold that contains at least one cell above the activation
//! threshold. Regions are labeled in scan order, so the output order only
//! depends on the input.

use crate::config::Neutral;
use crate::geometry::{stats, Image};

/// Histogram resolution for the neutral mode estimate.
const MODE_BINS: usize = 256;

/// A connected region of elevated intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    /// Label of the region in the label image (starting at 1).
    pub label: u32,
    /// Row of the highest cell.
    pub peak_row: usize,
    /// Column of the highest cell.
    pub peak_col: usize,
    /// Highest intensity above the neutral level.
    pub peak_value: f64,
    /// Number of cells in the region.
    pub area: usize,
}

/// Estimates the resting level of a heatmap.
pub fn neutral_level(heatmap: &Image<f64>, neutral: Neutral) -> f64 {
    match neutral {
        Neutral::Mode => stats::histogram_mode(heatmap.data(), MODE_BINS),
        Neutral::Average => stats::mean(heatmap.data()),
        Neutral::Constant(value) => value,
    }
}

/// Writes `max(value - level, 0)` for every cell of `input` into `output`.
pub fn subtract_neutral(input: &Image<f64>, level: f64, output: &mut Image<f64>) {
    output.resize(input.rows(), input.cols());
    for (out, &v) in output.data_mut().iter_mut().zip(input.data()) {
        let d = v - level;
        *out = if d.is_finite() { d.max(0.0) } else { 0.0 };
    }
}

/// Labels all blobs of `heatmap`, returning them in scan order.
pub fn find_blobs(
    heatmap: &Image<f64>,
    activation: f64,
    deactivation: f64,
    labels: &mut Image<u32>,
) -> Vec<Blob> {
    labels.resize(heatmap.rows(), heatmap.cols());
    labels.fill(0);

    let rows = heatmap.rows();
    let cols = heatmap.cols();
    let mut blobs = Vec::new();
    let mut stack = Vec::new();

    for (row, col, value) in heatmap.indexed() {
        if value <= activation || labels.get(row, col) != Some(0) {
            continue;
        }

        let label = blobs.len() as u32 + 1;
        let mut blob = Blob {
            label,
            peak_row: row,
            peak_col: col,
            peak_value: value,
            area: 0,
        };

        labels.set(row, col, label);
        stack.push((row, col));

        while let Some((r, c)) = stack.pop() {
            blob.area += 1;

            let v = heatmap.get(r, c).unwrap_or(0.0);
            let earlier = (r, c) < (blob.peak_row, blob.peak_col);
            if v > blob.peak_value || (v == blob.peak_value && earlier) {
                blob.peak_row = r;
                blob.peak_col = c;
                blob.peak_value = v;
            }

            for nr in r.saturating_sub(1)..=(r + 1).min(rows - 1) {
                for nc in c.saturating_sub(1)..=(c + 1).min(cols - 1) {
                    if labels.get(nr, nc) != Some(0) {
                        continue;
                    }
                    if heatmap.get(nr, nc).is_some_and(|n| n > deactivation) {
                        labels.set(nr, nc, label);
                        stack.push((nr, nc));
                    }
                }
            }
        }

        blobs.push(blob);
    }

    blobs
}
