//! Sub-pixel refinement of blobs.
//!
//! The neighborhood of a blob peak is fitted with a 2-D Gaussian by weighted
//! least squares on the logarithm of the samples. Flat or under-sampled
//! blobs, where that fit is ill-posed, fall back to intensity moments.

use super::blob::Blob;
use crate::geometry::{linalg, Image, SymmetricEigen2};

/// Samples at or below this value carry no usable shape information.
const MIN_SAMPLE: f64 = 1e-6;

/// Variance of a uniform distribution over one cell.
const CELL_VARIANCE: f64 = 1.0 / 12.0;

/// Fitted peak in grid units (x = column, y = row).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakFit {
    /// Peak column.
    pub x: f64,
    /// Peak row.
    pub y: f64,
    /// Column variance; the covariance is `[[xx, xy], [xy, yy]]`.
    pub xx: f64,
    /// Column/row covariance.
    pub xy: f64,
    /// Row variance.
    pub yy: f64,
}

impl PeakFit {
    /// Principal axes of the covariance.
    pub fn eigen(&self) -> SymmetricEigen2 {
        SymmetricEigen2::new(self.xx, self.xy, self.yy)
    }
}

struct Sample {
    dx: f64,
    dy: f64,
    value: f64,
}

/// Fits the blob within a `(2 * radius + 1)` square window around its peak.
///
/// Only cells carrying the blob's label take part. Returns `None` if the
/// window holds no signal.
pub fn fit(heatmap: &Image<f64>, labels: &Image<u32>, blob: &Blob, radius: usize) -> Option<PeakFit> {
    let samples = window_samples(heatmap, labels, blob, radius);
    let (ox, oy) = (blob.peak_col as f64, blob.peak_row as f64);

    let local = gaussian_fit(&samples, radius as f64).or_else(|| moments(&samples))?;

    Some(PeakFit {
        x: ox + local.x,
        y: oy + local.y,
        ..local
    })
}

fn window_samples(heatmap: &Image<f64>, labels: &Image<u32>, blob: &Blob, radius: usize) -> Vec<Sample> {
    let row_end = (blob.peak_row + radius).min(heatmap.rows().saturating_sub(1));
    let col_end = (blob.peak_col + radius).min(heatmap.cols().saturating_sub(1));

    let mut samples = Vec::new();
    for row in blob.peak_row.saturating_sub(radius)..=row_end {
        for col in blob.peak_col.saturating_sub(radius)..=col_end {
            if labels.get(row, col) != Some(blob.label) {
                continue;
            }
            let value = heatmap.get(row, col).unwrap_or(0.0);
            if value > MIN_SAMPLE {
                samples.push(Sample {
                    dx: col as f64 - blob.peak_col as f64,
                    dy: row as f64 - blob.peak_row as f64,
                    value,
                });
            }
        }
    }
    samples
}

/// Fits `ln v = a x² + b xy + c y² + d x + e y + f`, weighting by `v²`.
fn gaussian_fit(samples: &[Sample], radius: f64) -> Option<PeakFit> {
    if samples.len() < 6 {
        return None;
    }

    let mut lhs = [[0.0; 6]; 6];
    let mut rhs = [0.0; 6];

    for s in samples {
        let phi = [s.dx * s.dx, s.dx * s.dy, s.dy * s.dy, s.dx, s.dy, 1.0];
        let w = s.value * s.value;
        let z = s.value.ln();

        for i in 0..6 {
            for j in 0..6 {
                lhs[i][j] += w * phi[i] * phi[j];
            }
            rhs[i] += w * phi[i] * z;
        }
    }

    let [a, b, c, d, e, _] = linalg::solve(lhs, rhs)?;

    // The quadratic form must open downwards for a peak.
    let det = 4.0 * a * c - b * b;
    if a >= 0.0 || c >= 0.0 || det <= f64::EPSILON {
        return None;
    }

    let x = (b * e - 2.0 * c * d) / det;
    let y = (b * d - 2.0 * a * e) / det;
    if x.abs() > radius + 0.5 || y.abs() > radius + 0.5 {
        return None;
    }

    let fit = PeakFit {
        x,
        y,
        xx: -2.0 * c / det,
        xy: b / det,
        yy: -2.0 * a / det,
    };

    let eigen = fit.eigen();
    let limit = (2.0 * radius + 1.0).powi(2);
    (eigen.minor > 0.0 && eigen.major < limit && eigen.major.is_finite()).then_some(fit)
}

/// Intensity-weighted mean and covariance.
fn moments(samples: &[Sample]) -> Option<PeakFit> {
    let total: f64 = samples.iter().map(|s| s.value).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let x = samples.iter().map(|s| s.value * s.dx).sum::<f64>() / total;
    let y = samples.iter().map(|s| s.value * s.dy).sum::<f64>() / total;

    let mut xx = 0.0;
    let mut xy = 0.0;
    let mut yy = 0.0;
    for s in samples {
        let (ex, ey) = (s.dx - x, s.dy - y);
        xx += s.value * ex * ex;
        xy += s.value * ex * ey;
        yy += s.value * ey * ey;
    }

    Some(PeakFit {
        x,
        y,
        xx: xx / total + CELL_VARIANCE,
        xy: xy / total,
        yy: yy / total + CELL_VARIANCE,
    })
}
