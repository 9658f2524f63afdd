//! Levenberg–Marquardt nonlinear least squares.
//!
//! We minimize `S(p) = Σ (y_i − f(x_i; p))²` starting from a caller-supplied
//! guess. Each iteration solves the damped linearized problem
//!
//! ```text
//! minimize ‖J δ − r‖² + λ ‖D δ‖²,   D = diag(‖J_j‖)
//! ```
//!
//! and accepts the step only if it lowers `S`. Accepted steps shrink `λ`
//! (towards Gauss–Newton); rejected steps grow it (towards scaled gradient descent).
//!
//! Stopping rules (any of them means converged):
//! - relative SSE reduction of an accepted step ≤ `ftol`
//! - relative step size ≤ `xtol`
//! - gradient max-norm `‖Jᵀr‖∞` ≤ `gtol`
//! - no downhill step exists even at maximal damping (SSE is stationary)
//!
//! A rank-deficient starting Jacobian is reported as `SingularJacobian` before any
//! step is taken.

use nalgebra::{DMatrix, DVector};

use crate::math::ols::{reciprocal_condition, solve_least_squares};

/// A nonlinear least squares problem in residual form.
pub trait LeastSquaresProblem {
    /// Residuals `r = y − f(p)`.
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// Jacobian of the model `∂f/∂p` (one row per observation).
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64>;
}

#[derive(Debug, Clone)]
pub struct LmSettings {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Minimum reciprocal condition number of the starting Jacobian.
    pub rcond: f64,
    pub initial_lambda: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmOutcome {
    Converged,
    IterationLimit,
    SingularJacobian,
    NonFinite,
}

#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: DVector<f64>,
    pub sse: f64,
    /// Outer iterations performed (inner damping retries are not counted).
    pub iterations: usize,
    pub outcome: LmOutcome,
    /// Jacobian at `params`.
    pub jacobian: DMatrix<f64>,
}

const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e16;
/// Floor for squared column norms so a vanishing column still gets damped.
const SCALE_FLOOR: f64 = 1e-12;

/// Run Levenberg–Marquardt from `initial`.
pub fn minimize<P: LeastSquaresProblem>(problem: &P, initial: DVector<f64>, settings: &LmSettings) -> LmReport {
    let mut params = initial;
    let mut residuals = problem.residuals(&params);
    let mut sse = residuals.norm_squared();
    let mut jacobian = problem.jacobian(&params);

    if !sse.is_finite() || !all_finite(&jacobian) {
        return finish(params, sse, 0, LmOutcome::NonFinite, jacobian);
    }
    let rcond = reciprocal_condition(&jacobian);
    if rcond < settings.rcond {
        log::debug!("starting Jacobian is rank deficient (rcond={rcond:.3e})");
        return finish(params, sse, 0, LmOutcome::SingularJacobian, jacobian);
    }

    let mut lambda = settings.initial_lambda;
    let mut iterations = 0usize;

    loop {
        if sse == 0.0 {
            return finish(params, sse, iterations, LmOutcome::Converged, jacobian);
        }
        let gradient = jacobian.tr_mul(&residuals);
        if gradient.amax() <= settings.gtol {
            return finish(params, sse, iterations, LmOutcome::Converged, jacobian);
        }
        if iterations >= settings.max_iterations {
            return finish(params, sse, iterations, LmOutcome::IterationLimit, jacobian);
        }
        iterations += 1;

        let scale: Vec<f64> = jacobian
            .column_iter()
            .map(|col| col.norm_squared().max(SCALE_FLOOR).sqrt())
            .collect();

        let accepted = loop {
            if let Some(step) = damped_step(&jacobian, &residuals, &scale, lambda) {
                let trial = &params + &step;
                let trial_residuals = problem.residuals(&trial);
                let trial_sse = trial_residuals.norm_squared();
                if trial_sse.is_finite() && trial_sse < sse {
                    break Some((step, trial, trial_residuals, trial_sse));
                }
            }
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                break None;
            }
        };

        let Some((step, trial, trial_residuals, trial_sse)) = accepted else {
            log::debug!("lm iter {iterations}: no downhill step, sse={sse:.6e} is stationary");
            return finish(params, sse, iterations, LmOutcome::Converged, jacobian);
        };

        let reduction = (sse - trial_sse) / sse;
        let step_small = step.norm() <= settings.xtol * (params.norm() + settings.xtol);

        params = trial;
        residuals = trial_residuals;
        sse = trial_sse;
        jacobian = problem.jacobian(&params);
        if !all_finite(&jacobian) {
            return finish(params, sse, iterations, LmOutcome::NonFinite, jacobian);
        }
        lambda = (lambda / 10.0).max(MIN_LAMBDA);

        log::debug!("lm iter {iterations}: sse={sse:.6e} lambda={lambda:.1e}");

        if reduction <= settings.ftol || step_small {
            return finish(params, sse, iterations, LmOutcome::Converged, jacobian);
        }
    }
}

fn finish(
    params: DVector<f64>,
    sse: f64,
    iterations: usize,
    outcome: LmOutcome,
    jacobian: DMatrix<f64>,
) -> LmReport {
    LmReport {
        params,
        sse,
        iterations,
        outcome,
        jacobian,
    }
}

/// Solve the stacked system `[J; √λ D] δ = [r; 0]`.
fn damped_step(
    jacobian: &DMatrix<f64>,
    residuals: &DVector<f64>,
    scale: &[f64],
    lambda: f64,
) -> Option<DVector<f64>> {
    let (n, k) = jacobian.shape();

    let mut a = DMatrix::<f64>::zeros(n + k, k);
    a.rows_mut(0, n).copy_from(jacobian);
    let root = lambda.sqrt();
    for (j, &s) in scale.iter().enumerate() {
        a[(n + j, j)] = root * s;
    }

    let mut b = DVector::<f64>::zeros(n + k);
    b.rows_mut(0, n).copy_from(residuals);

    solve_least_squares(&a, &b)
}

fn all_finite(m: &DMatrix<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `y = p0 · exp(−p1 · x)`
    struct ExpDecay {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpDecay {
        fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.x.len(),
                self.x.iter().zip(&self.y).map(|(&x, &y)| y - p[0] * (-p[1] * x).exp()),
            )
        }

        fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
            let mut j = DMatrix::zeros(self.x.len(), 2);
            for (i, &x) in self.x.iter().enumerate() {
                let e = (-p[1] * x).exp();
                j[(i, 0)] = e;
                j[(i, 1)] = -p[0] * x * e;
            }
            j
        }
    }

    fn settings() -> LmSettings {
        LmSettings {
            max_iterations: 600,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            rcond: 1e-12,
            initial_lambda: 1e-3,
        }
    }

    fn decay_problem() -> ExpDecay {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.2).collect();
        let y = x.iter().map(|&x| 3.0 * (-0.7 * x).exp()).collect();
        ExpDecay { x, y }
    }

    #[test]
    fn recovers_exponential_decay() {
        let problem = decay_problem();
        let report = minimize(&problem, DVector::from_row_slice(&[1.0, 0.1]), &settings());

        assert_eq!(report.outcome, LmOutcome::Converged);
        assert!((report.params[0] - 3.0).abs() < 1e-6, "{}", report.params);
        assert!((report.params[1] - 0.7).abs() < 1e-6, "{}", report.params);
        assert!(report.sse < 1e-12);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let problem = decay_problem();
        let mut s = settings();
        s.max_iterations = 1;
        let report = minimize(&problem, DVector::from_row_slice(&[1.0, 0.1]), &s);

        assert_eq!(report.outcome, LmOutcome::IterationLimit);
        assert_eq!(report.iterations, 1);
    }

    #[test]
    fn zero_amplitude_start_is_singular() {
        // With p0 = 0 the p1 column vanishes.
        let problem = decay_problem();
        let report = minimize(&problem, DVector::from_row_slice(&[0.0, 0.5]), &settings());

        assert_eq!(report.outcome, LmOutcome::SingularJacobian);
        assert_eq!(report.iterations, 0);
    }
}
