//! Descriptive statistics over sample sets.

/// Arithmetic mean; zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Nearest-rank percentile of an ascending sorted slice.
///
/// `p` is a fraction in `[0, 1]`. Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let idx = ((sorted.len() - 1) as f64 * p.clamp(0.0, 1.0)).round() as usize;
    sorted.get(idx).copied()
}

/// Most frequent value of samples in `[0, 1]`, using a fixed histogram.
///
/// The result is the mean of the samples in the fullest bin, so a constant
/// background yields exactly that constant.
pub fn histogram_mode(values: &[f64], bins: usize) -> f64 {
    let bins = bins.max(1);
    let mut counts = vec![0usize; bins];
    let mut sums = vec![0.0f64; bins];

    for &v in values {
        let v = v.clamp(0.0, 1.0);
        let bin = ((v * bins as f64) as usize).min(bins - 1);
        counts[bin] += 1;
        sums[bin] += v;
    }

    // First fullest bin wins, keeping the result independent of sort stability.
    let mut best = 0;
    for (i, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = i;
        }
    }

    if counts[best] == 0 {
        0.0
    } else {
        sums[best] / counts[best] as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&v), 2.5);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_percentile_bounds() {
        let sorted: Vec<f64> = (0..101).map(|i| i as f64).collect();
        assert_eq!(percentile(&sorted, 0.01), Some(1.0));
        assert_eq!(percentile(&sorted, 0.99), Some(99.0));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn test_mode_of_constant_background() {
        let mut values = vec![0.1; 20];
        values.extend([0.9, 0.95, 1.0]);
        assert!((histogram_mode(&values, 64) - 0.1).abs() < 1e-12);
    }
}
