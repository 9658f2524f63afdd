//! Peak locations of response functions.
//!
//! Heat capacity and susceptibility peak near the critical temperature; on a
//! finite lattice the peak position is a finite-size estimate of `T_c`.

use std::collections::BTreeMap;

use crate::data::Aggregate;
use crate::domain::{Observable, SizeKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub temperature: f64,
    pub value: f64,
}

/// First maximum of `values` (NaN entries are skipped).
pub fn peak(temperatures: &[f64], values: &[f64]) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for (&t, &v) in temperatures.iter().zip(values) {
        if v.is_nan() || t.is_nan() {
            continue;
        }
        if best.is_none_or(|b| v > b.value) {
            best = Some(Peak { temperature: t, value: v });
        }
    }
    best
}

/// Peak of one observable for every size.
pub fn peak_temperatures(aggregate: &Aggregate, observable: Observable) -> BTreeMap<SizeKey, Peak> {
    aggregate
        .sizes()
        .filter_map(|size| {
            let temps = aggregate.temperatures(size)?;
            let values = aggregate.values(observable, size)?;
            peak(temps, values).map(|p| (size, p))
        })
        .collect()
}
