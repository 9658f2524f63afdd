//! Observable aggregation: per-size tables → per-observable series.
//!
//! Every size goes through the same column extraction, so adding a lattice size
//! is a data change, not a code change. Sizes are not aligned against each other:
//! each one keeps its own temperature grid and row count.

use std::collections::BTreeMap;

use crate::domain::{
    Observable, ObservableSeries, ObservableTable, SizeKey, TemperatureGrid, TEMPERATURE_COLUMN,
};
use crate::error::DataError;

/// Aggregated series for a run.
///
/// Invariant: for every size, the temperature grid and each observable series
/// have the same length (the size's row count), which is at least 1.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    temperatures: BTreeMap<SizeKey, TemperatureGrid>,
    series: BTreeMap<Observable, ObservableSeries>,
}

/// Reshape per-size tables into per-observable series keyed by size.
pub fn aggregate(tables: &BTreeMap<SizeKey, ObservableTable>) -> Result<Aggregate, DataError> {
    let mut temperatures = BTreeMap::new();
    let mut series: BTreeMap<Observable, ObservableSeries> = Observable::ALL
        .iter()
        .map(|&obs| (obs, ObservableSeries::new()))
        .collect();

    for (&size, table) in tables {
        if table.is_empty() {
            return Err(DataError::EmptyDataset { size });
        }

        temperatures.insert(size, extract_column(table, TEMPERATURE_COLUMN));
        for obs in Observable::ALL {
            series
                .entry(obs)
                .or_default()
                .insert(size, extract_column(table, obs.column()));
        }
    }

    Ok(Aggregate {
        temperatures,
        series,
    })
}

fn extract_column(table: &ObservableTable, column: usize) -> Vec<f64> {
    table.rows().iter().map(|row| row[column]).collect()
}

impl Aggregate {
    /// Sizes in ascending order.
    pub fn sizes(&self) -> impl Iterator<Item = SizeKey> + '_ {
        self.temperatures.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    pub fn contains(&self, size: SizeKey) -> bool {
        self.temperatures.contains_key(&size)
    }

    pub fn largest_size(&self) -> Option<SizeKey> {
        self.temperatures.keys().next_back().copied()
    }

    pub fn temperatures(&self, size: SizeKey) -> Option<&[f64]> {
        self.temperatures.get(&size).map(Vec::as_slice)
    }

    pub fn series(&self, observable: Observable) -> Option<&ObservableSeries> {
        self.series.get(&observable)
    }

    pub fn values(&self, observable: Observable, size: SizeKey) -> Option<&[f64]> {
        self.series.get(&observable)?.get(&size).map(Vec::as_slice)
    }

    pub fn row_count(&self, size: SizeKey) -> usize {
        self.temperatures.get(&size).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize, offset: f64) -> ObservableTable {
        ObservableTable::from_rows(
            (0..n)
                .map(|i| {
                    let t = 0.5 + i as f64 * 0.5;
                    [t, 1.0 - 0.1 * i as f64, -2.0 + offset, 0.1 * i as f64, offset]
                })
                .collect(),
        )
    }

    #[test]
    fn one_series_per_observable_with_row_count_length() {
        let mut tables = BTreeMap::new();
        tables.insert(SizeKey(4), table(6, 0.0));
        tables.insert(SizeKey(8), table(3, 1.0));

        let agg = aggregate(&tables).unwrap();
        assert_eq!(agg.sizes().collect::<Vec<_>>(), vec![SizeKey(4), SizeKey(8)]);
        assert_eq!(agg.largest_size(), Some(SizeKey(8)));

        for obs in Observable::ALL {
            let series = agg.series(obs).unwrap();
            assert_eq!(series[&SizeKey(4)].len(), 6);
            assert_eq!(series[&SizeKey(8)].len(), 3);
        }
        assert_eq!(agg.temperatures(SizeKey(8)).unwrap(), &[0.5, 1.0, 1.5]);
        assert_eq!(agg.values(Observable::Susceptibility, SizeKey(8)).unwrap(), &[1.0, 1.0, 1.0]);
        assert!((agg.values(Observable::Magnetization, SizeKey(4)).unwrap()[2] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn zero_row_table_is_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert(SizeKey(4), table(2, 0.0));
        tables.insert(SizeKey(16), ObservableTable::default());

        match aggregate(&tables) {
            Err(DataError::EmptyDataset { size }) => assert_eq!(size, SizeKey(16)),
            other => panic!("expected EmptyDataset, got {other:?}"),
        }
    }

    #[test]
    fn sizes_keep_their_own_grids() {
        let mut tables = BTreeMap::new();
        tables.insert(SizeKey(2), table(4, 0.0));
        tables.insert(SizeKey(32), table(7, 0.0));

        let agg = aggregate(&tables).unwrap();
        assert_eq!(agg.row_count(SizeKey(2)), 4);
        assert_eq!(agg.row_count(SizeKey(32)), 7);
        assert!(agg.values(Observable::Energy, SizeKey(64)).is_none());
        assert_eq!(agg.largest_size(), Some(SizeKey(32)));
    }
}
