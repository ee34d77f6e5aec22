//! Small dense linear algebra helpers.

/// Solves `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` if the system is singular or badly conditioned relative
/// to the magnitude of its largest diagonal entry.
#[allow(clippy::needless_range_loop)]
pub fn solve<const N: usize>(mut a: [[f64; N]; N], mut b: [f64; N]) -> Option<[f64; N]> {
    let scale = (0..N).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let tolerance = scale * 1e-10;

    for col in 0..N {
        let pivot = (col..N).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() <= tolerance {
            return None;
        }

        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; N];
    for row in (0..N).rev() {
        let mut sum = b[row];
        for k in (row + 1)..N {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Eigen decomposition of a symmetric 2x2 matrix `[[a, b], [b, c]]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricEigen2 {
    /// Larger eigenvalue.
    pub major: f64,
    /// Smaller eigenvalue.
    pub minor: f64,
    /// Angle of the major eigenvector in `[0, π)`.
    pub angle: f64,
}

impl SymmetricEigen2 {
    /// Decomposes `[[a, b], [b, c]]`.
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        let mean = (a + c) / 2.0;
        let diff = (a - c) / 2.0;
        let radius = diff.hypot(b);

        let mut angle = 0.5 * (2.0 * b).atan2(a - c);
        if angle < 0.0 {
            angle += std::f64::consts::PI;
        }

        Self {
            major: mean + radius,
            minor: mean - radius,
            angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_identity() {
        let a = [[2.0, 0.0], [0.0, 4.0]];
        let x = solve(a, [2.0, 2.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 3.0]];
        let x = solve(a, [5.0, 7.0, 9.0]).unwrap();
        assert!((x[0] - 7.0).abs() < 1e-12);
        assert!((x[1] - 5.0).abs() < 1e-12);
        assert!((x[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        let a = [[1.0, 2.0], [2.0, 4.0]];
        assert!(solve(a, [1.0, 2.0]).is_none());
    }

    #[test]
    fn test_eigen_diagonal() {
        let e = SymmetricEigen2::new(1.0, 0.0, 4.0);
        assert!((e.major - 4.0).abs() < 1e-12);
        assert!((e.minor - 1.0).abs() < 1e-12);
        assert!((e.angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_eigen_rotated() {
        // Covariance elongated along the diagonal.
        let e = SymmetricEigen2::new(2.0, 1.0, 2.0);
        assert!((e.major - 3.0).abs() < 1e-12);
        assert!((e.minor - 1.0).abs() < 1e-12);
        assert!((e.angle - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }
}
