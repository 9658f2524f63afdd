//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the loading/fitting code stays clean and testable
//! - output changes are localized

use std::collections::BTreeMap;

use crate::data::Aggregate;
use crate::domain::{FitResult, Observable, SizeKey};
use crate::report::peaks::peak_temperatures;

/// Dataset overview: one line per loaded size, then the skipped sizes and why.
pub fn format_dataset_summary(aggregate: &Aggregate, failures: &[(SizeKey, &str)]) -> String {
    let mut out = String::new();

    out.push_str("=== ising - 2D Ising observables ===\n");
    out.push_str(&format!("Sizes loaded: {}\n", aggregate.len()));

    for size in aggregate.sizes() {
        let temps = aggregate.temperatures(size).unwrap_or(&[]);
        let (t_lo, t_hi) = min_max(temps);
        out.push_str(&format!(
            "  {:<7} rows={:<4} T=[{t_lo:.3}, {t_hi:.3}]\n",
            size.label(),
            aggregate.row_count(size)
        ));
    }

    if !failures.is_empty() {
        out.push_str(&format!("Skipped sizes: {}\n", failures.len()));
        for (size, reason) in failures {
            out.push_str(&format!("  {:<7} {reason}\n", size.label()));
        }
    }

    out
}

/// Reference fit: model, status and parameters with one-sigma errors.
pub fn format_fit_summary(size: SizeKey, fit: &FitResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("\nFit ({}): {}\n", size.label(), fit.model.display_name()));
    out.push_str(&format!("- status: {}\n", fit.status));
    out.push_str(&format!(
        "- points: {} | iterations: {} | SSE={} | RMSE={}\n",
        fit.n_points,
        fit.iterations,
        fmt_num(fit.sse),
        fmt_num(fit.rmse())
    ));

    let errors = fit.std_errors();
    for (i, (name, value)) in fit.model.param_names().iter().zip(&fit.params).enumerate() {
        match errors.as_ref().and_then(|e| e.get(i)) {
            Some(err) => out.push_str(&format!("  {name:<2} = {value:>12.6} ± {err:.6}\n")),
            None => out.push_str(&format!("  {name:<2} = {value:>12.6}\n")),
        }
    }

    out
}

/// One line per size for `--fit-all`.
pub fn format_fit_table(fits: &BTreeMap<SizeKey, FitResult>) -> String {
    let mut out = String::new();
    out.push_str("\nPer-size fits:\n");
    out.push_str(
        format!("{:<7} {:>6} {:>6} {:>12} {:<}\n", "size", "n", "iter", "SSE", "status").trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<7} {:-<6} {:-<6} {:-<12} {:-<10}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for (size, fit) in fits {
        out.push_str(
            format!(
                "{:<7} {:>6} {:>6} {:>12} {}\n",
                size.label(),
                fit.n_points,
                fit.iterations,
                fmt_num(fit.sse),
                fit.status
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Peak temperatures of heat capacity and susceptibility per size.
pub fn format_peaks(aggregate: &Aggregate) -> String {
    let c = peak_temperatures(aggregate, Observable::HeatCapacity);
    let chi = peak_temperatures(aggregate, Observable::Susceptibility);

    let mut out = String::new();
    out.push_str("\nPeak temperatures:\n");
    out.push_str(&format!("{:<7} {:>10} {:>10}\n", "size", "T(C max)", "T(χ max)"));
    for size in aggregate.sizes() {
        let tc = c.get(&size).map(|p| format!("{:.3}", p.temperature)).unwrap_or_else(|| "-".into());
        let tx = chi.get(&size).map(|p| format!("{:.3}", p.temperature)).unwrap_or_else(|| "-".into());
        out.push_str(&format!("{:<7} {tc:>10} {tx:>10}\n", size.label()));
    }
    out
}

fn fmt_num(v: f64) -> String {
    if v.is_finite() { format!("{v:.6e}") } else { "n/a".to_string() }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate;
    use crate::domain::{FitStatus, ModelKind, ObservableTable};
    use crate::error::DataError;
    use nalgebra::DMatrix;

    fn agg() -> Aggregate {
        let mut tables = BTreeMap::new();
        let rows = vec![
            [3.0, 0.1, -0.8, 0.5, 0.2],
            [2.0, 0.9, -1.7, 1.5, 3.0],
            [1.0, 1.0, -2.0, 0.1, 0.1],
        ];
        tables.insert(SizeKey(8), ObservableTable::from_rows(rows));
        aggregate(&tables).unwrap()
    }

    #[test]
    fn dataset_summary_lists_sizes_and_failures() {
        let reason = DataError::EmptyDataset { size: SizeKey(4) }.to_string();
        let txt = format_dataset_summary(&agg(), &[(SizeKey(4), reason.as_str())]);
        assert!(txt.contains("L=8     rows=3    T=[1.000, 3.000]"));
        assert!(txt.contains("Skipped sizes: 1"));
        assert!(txt.contains("L=4     dataset for L=4 has no rows"));
    }

    #[test]
    fn fit_summary_shows_errors_when_converged() {
        let fit = FitResult {
            model: ModelKind::TanhStep,
            params: vec![1.0, 2.27, 0.5, 0.5],
            covariance: Some(DMatrix::from_diagonal_element(4, 4, 1e-4)),
            status: FitStatus::Converged,
            sse: 1e-3,
            iterations: 7,
            n_points: 46,
        };
        let txt = format_fit_summary(SizeKey(64), &fit);
        assert!(txt.contains("status: converged"));
        assert!(txt.contains("B  =     2.270000 ± 0.010000"));
    }

    #[test]
    fn peaks_table_has_one_row_per_size() {
        let txt = format_peaks(&agg());
        assert!(txt.contains("L=8          2.000      2.000"));
    }
}
