//! Synthetic observable tables for demos and tests.
//!
//! These are smooth closed-form stand-ins for simulator output, not a Monte
//! Carlo simulation: each observable is a tanh / sech² crossover around a
//! size-shifted critical temperature, sharpened with `L`, plus Gaussian noise.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{MAX_GRID_POINTS, ObservableTable, SizeKey, grid_intervals};
use crate::error::AppError;
use crate::io::export::write_table;
use crate::io::ingest::size_file_name;

/// Onsager's critical temperature of the infinite 2D Ising lattice.
pub const CRITICAL_TEMPERATURE: f64 = 2.269_185;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub sizes: Vec<SizeKey>,
    /// Sweep start (the simulator cools from here).
    pub t_max: f64,
    /// Sweep end, inclusive.
    pub t_min: f64,
    pub step: f64,
    /// Standard deviation of the additive noise.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            sizes: [2, 4, 8, 16, 32, 64, 128].into_iter().map(SizeKey).collect(),
            t_max: 5.0,
            t_min: 0.5,
            step: 0.1,
            noise: 0.005,
            seed: 42,
        }
    }
}

impl SampleSpec {
    fn validate(&self) -> Result<(), AppError> {
        if self.sizes.is_empty() || self.sizes.iter().any(|s| s.0 == 0) {
            return Err(AppError::new(2, "Sample sizes must be non-empty and > 0."));
        }
        if !(self.t_min.is_finite() && self.t_max.is_finite() && self.t_max > self.t_min) {
            return Err(AppError::new(2, "Invalid temperature range for sample generation."));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(AppError::new(2, "Temperature step must be > 0."));
        }
        if grid_intervals(self.t_min, self.t_max, self.step).is_none() {
            return Err(AppError::new(
                2,
                format!("Temperature sweep exceeds {MAX_GRID_POINTS} points; use a larger step."),
            ));
        }
        Ok(())
    }

    /// Descending sweep `t_max, t_max − step, …, t_min`.
    ///
    /// Empty if the sweep would exceed `MAX_GRID_POINTS`.
    pub fn temperatures(&self) -> Vec<f64> {
        let intervals = ((self.t_max - self.t_min) / self.step).round();
        if !(intervals >= 0.0 && intervals <= MAX_GRID_POINTS as f64) {
            return Vec::new();
        }
        (0..=intervals as usize).map(|i| self.t_max - i as f64 * self.step).collect()
    }
}

/// Generate one size's table.
pub fn generate_table(spec: &SampleSpec, size: SizeKey) -> Result<ObservableTable, AppError> {
    spec.validate()?;

    let mut rng = StdRng::seed_from_u64(spec.seed.wrapping_add(size.0 as u64));
    let normal = Normal::new(0.0, spec.noise)
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;

    let l = size.0 as f64;
    let tc = CRITICAL_TEMPERATURE + 1.0 / l;
    let width = 1.5 / l.sqrt() + 0.05;
    let floor = 1.0 / l;

    let rows = spec
        .temperatures()
        .into_iter()
        .map(|t| {
            let x = (t - tc) / width;
            let sech2 = 1.0 / x.cosh().powi(2);

            let m = floor + (1.0 - floor) * 0.5 * (1.0 - x.tanh());
            let e = -2.0 + 0.75 * (1.0 + (x / 2.0).tanh());
            let c = (0.4 + 0.3 * l.ln()) * sech2;
            let chi = 0.02 * l.powf(1.75) * sech2;

            [
                t,
                (m + normal.sample(&mut rng)).abs(),
                e + normal.sample(&mut rng),
                (c + normal.sample(&mut rng)).max(0.0),
                (chi + normal.sample(&mut rng)).max(0.0),
            ]
        })
        .collect();

    Ok(ObservableTable::from_rows(rows))
}

/// Generate every size in the spec.
pub fn generate_tables(spec: &SampleSpec) -> Result<BTreeMap<SizeKey, ObservableTable>, AppError> {
    spec.sizes
        .iter()
        .map(|&size| generate_table(spec, size).map(|t| (size, t)))
        .collect()
}

/// Write `test_L<size>.txt` files into `dir`.
pub fn write_samples(spec: &SampleSpec, dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;

    let mut written = Vec::with_capacity(spec.sizes.len());
    for (size, table) in generate_tables(spec)? {
        let path = dir.join(size_file_name(size));
        write_table(&path, &table)?;
        log::debug!("wrote {} rows to {}", table.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::{discover_size_files, load_tables};

    #[test]
    fn sweep_matches_simulator_grid() {
        let spec = SampleSpec::default();
        let t = spec.temperatures();
        assert_eq!(t.len(), 46);
        assert_eq!(t[0], 5.0);
        assert!((t[45] - 0.5).abs() < 1e-9);
        assert!(t.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn noise_free_magnetization_rises_on_cooling() {
        let spec = SampleSpec {
            noise: 0.0,
            ..SampleSpec::default()
        };
        let table = generate_table(&spec, SizeKey(32)).unwrap();
        let m: Vec<f64> = table.rows().iter().map(|r| r[1]).collect();
        assert!(m.windows(2).all(|w| w[1] >= w[0]));
        assert!(m[0] < 0.1);
        assert!(m[45] > 0.99);
    }

    #[test]
    fn same_seed_same_tables() {
        let spec = SampleSpec::default();
        assert_eq!(
            generate_table(&spec, SizeKey(8)).unwrap(),
            generate_table(&spec, SizeKey(8)).unwrap()
        );
    }

    #[test]
    fn written_samples_are_discovered_and_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let spec = SampleSpec {
            sizes: vec![SizeKey(4), SizeKey(16)],
            ..SampleSpec::default()
        };
        let written = write_samples(&spec, dir.path()).unwrap();
        assert_eq!(written.len(), 2);

        let files = discover_size_files(dir.path()).unwrap();
        let batch = load_tables(&files);
        assert!(batch.failures.is_empty());
        assert_eq!(batch.tables[&SizeKey(16)].len(), 46);
    }

    #[test]
    fn rejects_bad_range() {
        let spec = SampleSpec {
            t_min: 5.0,
            t_max: 1.0,
            ..SampleSpec::default()
        };
        assert_eq!(generate_table(&spec, SizeKey(4)).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn rejects_oversized_sweep() {
        let spec = SampleSpec {
            step: 1e-300,
            ..SampleSpec::default()
        };
        assert!(spec.temperatures().is_empty());
        assert_eq!(generate_table(&spec, SizeKey(4)).unwrap_err().exit_code(), 2);

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(write_samples(&spec, dir.path()).unwrap_err().exit_code(), 2);
    }
}
