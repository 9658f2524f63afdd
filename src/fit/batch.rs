//! Magnetization fits driven by aggregated series.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::data::Aggregate;
use crate::domain::{FitResult, ModelKind, Observable, SizeKey};
use crate::fit::{FitOptions, fit};

/// Fit one size's magnetization against its own temperature grid.
///
/// Returns `None` if the size is not part of the aggregate.
pub fn magnetization_fit(
    aggregate: &Aggregate,
    size: SizeKey,
    model: ModelKind,
    initial_guess: &[f64],
    opts: &FitOptions,
) -> Option<FitResult> {
    let temps = aggregate.temperatures(size)?;
    let mag = aggregate.values(Observable::Magnetization, size)?;
    log::debug!("fitting {model:?} to {} ({} points)", size.label(), temps.len());
    Some(fit(model, temps, mag, initial_guess, opts))
}

/// Fit every size independently (in parallel).
pub fn fit_all_sizes(
    aggregate: &Aggregate,
    model: ModelKind,
    initial_guess: &[f64],
    opts: &FitOptions,
) -> BTreeMap<SizeKey, FitResult> {
    let sizes: Vec<SizeKey> = aggregate.sizes().collect();
    sizes
        .par_iter()
        .filter_map(|&size| {
            magnetization_fit(aggregate, size, model, initial_guess, opts).map(|fit| (size, fit))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate;
    use crate::domain::ObservableTable;
    use crate::models::predict;

    fn table(truth: &[f64]) -> ObservableTable {
        let rows = (0..46)
            .map(|i| {
                let t = 5.0 - i as f64 * 0.1;
                [t, predict(ModelKind::TanhStep, t, truth), -1.0, 0.5, 0.1]
            })
            .collect();
        ObservableTable::from_rows(rows)
    }

    #[test]
    fn fits_every_size_and_skips_unknown_sizes() {
        let mut tables = BTreeMap::new();
        tables.insert(SizeKey(16), table(&[1.2, 2.8, 0.5, 0.5]));
        tables.insert(SizeKey(32), table(&[2.0, 4.6, 0.5, 0.5]));
        let agg = aggregate(&tables).unwrap();

        let guess = ModelKind::TanhStep.default_guess();
        let fits = fit_all_sizes(&agg, ModelKind::TanhStep, &guess, &FitOptions::default());
        assert_eq!(fits.keys().copied().collect::<Vec<_>>(), vec![SizeKey(16), SizeKey(32)]);
        assert!(fits.values().all(|f| f.is_converged()));

        assert!(magnetization_fit(&agg, SizeKey(64), ModelKind::TanhStep, &guess, &FitOptions::default()).is_none());
    }
}
