//! Model evaluation for the tanh magnetization models.
//!
//! The fitter relies on two primitive operations:
//! - predict m(T) given parameters (for residuals/plots)
//! - fill a Jacobian row ∂m/∂p at one temperature (for the LM step)
//!
//! These are implemented here for each model kind.

use crate::domain::{CurveGridSpec, ModelKind};

/// Predict `m(T)` for the given model kind.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_count()`.
pub fn predict(model: ModelKind, t: f64, params: &[f64]) -> f64 {
    match model {
        ModelKind::DoubleTanh => {
            let (amp_a, amp_b, offset) = (params[0], params[1], params[2]);
            let (a, b, c, d) = (params[3], params[4], params[5], params[6]);
            offset + amp_a * (a * t + b).tanh() + amp_b * (c * t + d).tanh()
        }
        ModelKind::TanhStep => {
            let (a, b, offset, amp) = (params[0], params[1], params[2], params[3]);
            offset + amp * (-a * t + b).tanh()
        }
    }
}

/// Fill the Jacobian row `∂m(T)/∂p` for the given model kind.
///
/// # Panics
/// Panics if `params` or `out` is shorter than `model.param_count()`.
pub fn fill_jacobian_row(model: ModelKind, t: f64, params: &[f64], out: &mut [f64]) {
    match model {
        ModelKind::DoubleTanh => {
            let (amp_a, amp_b) = (params[0], params[1]);
            let (a, b, c, d) = (params[3], params[4], params[5], params[6]);
            let u = (a * t + b).tanh();
            let v = (c * t + d).tanh();
            // d/dx tanh(x) = 1 - tanh(x)^2
            let su = 1.0 - u * u;
            let sv = 1.0 - v * v;

            out[0] = u;
            out[1] = v;
            out[2] = 1.0;
            out[3] = amp_a * t * su;
            out[4] = amp_a * su;
            out[5] = amp_b * t * sv;
            out[6] = amp_b * sv;
        }
        ModelKind::TanhStep => {
            let (a, b, amp) = (params[0], params[1], params[3]);
            let u = (-a * t + b).tanh();
            let su = 1.0 - u * u;

            out[0] = -amp * t * su;
            out[1] = amp * su;
            out[2] = 1.0;
            out[3] = u;
        }
    }
}

/// Evaluate a model on an evenly spaced temperature grid `[t_min, t_max)`.
///
/// An unusable or oversized grid yields empty vectors.
pub fn curve_grid(model: ModelKind, params: &[f64], spec: &CurveGridSpec) -> (Vec<f64>, Vec<f64>) {
    let Some(n) = spec.point_count() else {
        return (Vec::new(), Vec::new());
    };

    let mut temps = Vec::with_capacity(n);
    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        let t = spec.t_min + i as f64 * spec.step;
        if t >= spec.t_max {
            break;
        }
        temps.push(t);
        values.push(predict(model, t, params));
    }
    (temps, values)
}
