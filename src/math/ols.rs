//! Linear least squares helpers.
//!
//! Each Levenberg–Marquardt step is a small linear least squares problem of the form:
//!
//! ```text
//! minimize ‖J δ − r‖² + λ ‖D δ‖²
//! ```
//!
//! which we solve as an ordinary least squares problem on the stacked system
//! `[J; √λ D] δ = [r; 0]`.
//!
//! Implementation choices:
//! - We use SVD so the solve stays robust when `J` is tall and badly scaled.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - The parameter dimension is tiny (4–7 columns), so SVD cost is negligible.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(delta) = svd.solve(y, tol) {
            if delta.iter().all(|v| v.is_finite()) {
                return Some(delta);
            }
        }
    }

    None
}

/// Reciprocal condition number `σ_min / σ_max` of a matrix.
///
/// Returns `0.0` for an all-zero or non-finite matrix.
pub fn reciprocal_condition(x: &DMatrix<f64>) -> f64 {
    if x.is_empty() || !x.iter().all(|v| v.is_finite()) {
        return 0.0;
    }
    let sv = x.singular_values();
    let max = sv.max();
    let min = sv.min();
    if max <= 0.0 { 0.0 } else { min / max }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let coef = solve_least_squares(&x, &y).unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-10);
        assert!((coef[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn duplicate_columns_have_zero_rcond() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert!(reciprocal_condition(&x) < 1e-12);

        let ok = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        assert!(reciprocal_condition(&ok) > 0.1);
    }
}
