//! Nonlinear least squares fit of one magnetization model.
//!
//! Given:
//! - temperatures `T_i`
//! - observed magnetization `m_i`
//! - an initial parameter guess
//!
//! we run Levenberg–Marquardt on `S(p) = Σ (m_i − f(T_i; p))²` and return the
//! final iterate with a status. On convergence we also report the linearized
//! covariance `s² (JᵀJ)⁻¹`, `s² = S / (n − k)`.
//!
//! `fit` never returns an error: bad inputs become `FitStatus::InvalidInput`
//! and numerical trouble becomes `FitStatus::FailedToConverge`.

use nalgebra::{DMatrix, DVector};

use crate::domain::{FailureReason, FitResult, FitStatus, ModelKind};
use crate::math::{LeastSquaresProblem, LmOutcome, LmSettings, minimize, reciprocal_condition};
use crate::models::{fill_jacobian_row, predict};

/// Convergence controls for a single fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Iteration cap; `None` means `200 × (k + 1)`.
    pub max_iterations: Option<usize>,
    /// Relative SSE reduction tolerance.
    pub ftol: f64,
    /// Relative step size tolerance.
    pub xtol: f64,
    /// Gradient max-norm tolerance.
    pub gtol: f64,
    /// Reciprocal condition number below which a Jacobian counts as singular.
    pub rcond: f64,
    pub initial_lambda: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: None,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            rcond: 1e-12,
            initial_lambda: 1e-3,
        }
    }
}

impl FitOptions {
    fn settings(&self, k: usize) -> LmSettings {
        LmSettings {
            max_iterations: self.max_iterations.unwrap_or(200 * (k + 1)),
            ftol: self.ftol,
            xtol: self.xtol,
            gtol: self.gtol,
            rcond: self.rcond,
            initial_lambda: self.initial_lambda,
        }
    }
}

/// Model + data in residual form.
struct CurveProblem<'a> {
    model: ModelKind,
    x: &'a [f64],
    y: &'a [f64],
}

impl LeastSquaresProblem for CurveProblem<'_> {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let p = params.as_slice();
        DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y)
                .map(|(&t, &m)| m - predict(self.model, t, p)),
        )
    }

    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let p = params.as_slice();
        let k = self.model.param_count();
        let mut j = DMatrix::<f64>::zeros(self.x.len(), k);
        let mut row = vec![0.0; k];
        for (i, &t) in self.x.iter().enumerate() {
            fill_jacobian_row(self.model, t, p, &mut row);
            for (col, &v) in row.iter().enumerate() {
                j[(i, col)] = v;
            }
        }
        j
    }
}

/// Fit `model` to `(x, y)` starting from `initial_guess`.
pub fn fit(model: ModelKind, x: &[f64], y: &[f64], initial_guess: &[f64], opts: &FitOptions) -> FitResult {
    let k = model.param_count();
    let n = x.len();

    if let Err(reason) = validate(model, x, y, initial_guess) {
        log::warn!("fit rejected: {reason}");
        return FitResult {
            model,
            params: initial_guess.to_vec(),
            covariance: None,
            status: FitStatus::InvalidInput(reason),
            sse: f64::NAN,
            iterations: 0,
            n_points: n,
        };
    }

    let problem = CurveProblem { model, x, y };
    let report = minimize(&problem, DVector::from_column_slice(initial_guess), &opts.settings(k));

    let (status, covariance) = match report.outcome {
        LmOutcome::Converged => match covariance(&report.jacobian, report.sse, n, k, opts.rcond) {
            Some(cov) => (FitStatus::Converged, Some(cov)),
            None => (FitStatus::FailedToConverge(FailureReason::SingularJacobian), None),
        },
        LmOutcome::IterationLimit => (FitStatus::FailedToConverge(FailureReason::IterationLimit), None),
        LmOutcome::SingularJacobian => (FitStatus::FailedToConverge(FailureReason::SingularJacobian), None),
        LmOutcome::NonFinite => (FitStatus::FailedToConverge(FailureReason::NonFiniteModel), None),
    };

    match &status {
        FitStatus::Converged => log::info!(
            "{model:?} fit converged after {} iterations (SSE={:.6e}, n={n})",
            report.iterations,
            report.sse
        ),
        other => log::warn!("{model:?} fit {other} after {} iterations", report.iterations),
    }

    FitResult {
        model,
        params: report.params.iter().copied().collect(),
        covariance,
        status,
        sse: report.sse,
        iterations: report.iterations,
        n_points: n,
    }
}

fn validate(model: ModelKind, x: &[f64], y: &[f64], guess: &[f64]) -> Result<(), String> {
    let k = model.param_count();
    if x.len() != y.len() {
        return Err(format!("x has {} values but y has {}", x.len(), y.len()));
    }
    if guess.len() != k {
        return Err(format!("model expects {k} parameters, guess has {}", guess.len()));
    }
    if x.len() <= k {
        return Err(format!("{} points cannot determine {k} parameters", x.len()));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err("data contains non-finite values".to_string());
    }
    if guess.iter().any(|v| !v.is_finite()) {
        return Err("initial guess contains non-finite values".to_string());
    }
    Ok(())
}

/// `s² (JᵀJ)⁻¹`, or `None` when `J` is rank deficient at the solution.
fn covariance(jacobian: &DMatrix<f64>, sse: f64, n: usize, k: usize, rcond: f64) -> Option<DMatrix<f64>> {
    if reciprocal_condition(jacobian) < rcond {
        return None;
    }
    let jtj = jacobian.tr_mul(jacobian);
    let inverse = jtj.cholesky()?.inverse();
    let s2 = sse / (n - k) as f64;
    let cov = inverse * s2;
    cov.iter().all(|v| v.is_finite()).then_some(cov)
}
