//! Shared analysis pipeline used by the `analyze` and `fit` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! discover files -> load (per size) -> aggregate -> fit reference -> overlay -> charts
//!
//! The commands can then focus on presentation (printing vs rendering).

use std::collections::BTreeMap;

use crate::data::{Aggregate, aggregate};
use crate::domain::{AnalysisConfig, FitResult, ModelKind, SizeKey};
use crate::error::{AppError, DataError};
use crate::fit::{fit_all_sizes, magnetization_fit};
use crate::io::ingest::{BatchLoad, LoadFailure, discover_size_files, load_tables};
use crate::plot::{ChartRenderer, ObservableChart, Overlay, build_charts, overlay_from_fit, render_all};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub aggregate: Aggregate,
    /// Sizes that were skipped, with the reason.
    pub failures: Vec<FailureSummary>,
    pub reference_size: SizeKey,
    pub reference_fit: FitResult,
    /// Per-size fits (`fit_all` only).
    pub size_fits: BTreeMap<SizeKey, FitResult>,
    pub overlay: Option<Overlay>,
    pub charts: Vec<ObservableChart>,
}

/// A skipped size, kept as text so `RunOutput` stays cloneable.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureSummary {
    pub size: SizeKey,
    pub message: String,
}

/// Execute the full pipeline: discover and load files, then analyze.
pub fn run_analysis(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    // 1) Discover size files.
    let mut files = discover_size_files(&config.data_dir)?;
    if let Some(sizes) = &config.sizes {
        files.retain(|size, _| sizes.contains(size));
        for size in sizes.iter().filter(|s| !files.contains_key(s)) {
            log::warn!("no input file for {}", size.label());
        }
    }
    if files.is_empty() {
        return Err(AppError::new(
            3,
            format!("No test_L<size>.txt files found in '{}'.", config.data_dir.display()),
        ));
    }
    log::info!("found {} size files in {}", files.len(), config.data_dir.display());

    // 2) Load every size; failures are per size.
    let batch = load_tables(&files);

    run_analysis_with_tables(config, batch)
}

/// Execute the analysis on already-loaded tables.
///
/// Empty tables are moved to the failure list. The run fails only if nothing
/// usable remains or the requested reference size is missing.
pub fn run_analysis_with_tables(config: &AnalysisConfig, batch: BatchLoad) -> Result<RunOutput, AppError> {
    let BatchLoad { mut tables, failures } = batch;
    let mut failures: Vec<LoadFailure> = failures;

    // 3) Drop empty datasets (reported, not fatal).
    let empty: Vec<SizeKey> = tables.iter().filter(|(_, t)| t.is_empty()).map(|(&s, _)| s).collect();
    for size in empty {
        tables.remove(&size);
        let error = DataError::EmptyDataset { size };
        log::warn!("{error}");
        failures.push(LoadFailure { size, error });
    }
    failures.sort_by_key(|f| f.size);

    if tables.is_empty() {
        return Err(AppError::new(3, "No usable datasets (every size failed to load)."));
    }

    // 4) Aggregate.
    let aggregate = aggregate(&tables)?;
    log::info!("aggregated {} sizes", aggregate.len());

    // 5) Fit the reference size.
    let reference_size = match config.reference_size {
        Some(size) if aggregate.contains(size) => size,
        Some(size) => {
            return Err(AppError::new(
                2,
                format!("Reference size {} was not loaded.", size.label()),
            ));
        }
        None => aggregate
            .largest_size()
            .ok_or_else(|| AppError::new(3, "No sizes available to fit."))?,
    };

    let guess = initial_guess(config.model, config.initial_guess.as_deref());
    let size_fits = if config.fit_all {
        fit_all_sizes(&aggregate, config.model, &guess, &config.fit_options)
    } else {
        BTreeMap::new()
    };

    // With `fit_all` the reference size is already among the per-size fits.
    let reference_fit = match size_fits.get(&reference_size) {
        Some(fit) => fit.clone(),
        None => magnetization_fit(&aggregate, reference_size, config.model, &guess, &config.fit_options)
            .ok_or_else(|| AppError::new(4, format!("No magnetization series for {}.", reference_size.label())))?,
    };

    // 6) Fit failures degrade to "no overlay".
    let overlay = overlay_from_fit(&reference_fit, reference_size, &config.curve_grid);
    if overlay.is_none() {
        log::warn!(
            "no fitted overlay for {}: {}",
            reference_size.label(),
            reference_fit.status
        );
    }

    // 7) Prepare charts.
    let charts = build_charts(&aggregate, overlay.as_ref(), &config.chart_min_sizes);

    let failures = failures
        .into_iter()
        .map(|f| FailureSummary {
            size: f.size,
            message: f.error.to_string(),
        })
        .collect();

    Ok(RunOutput {
        aggregate,
        failures,
        reference_size,
        reference_fit,
        size_fits,
        overlay,
        charts,
    })
}

/// Hand the prepared charts to a renderer.
pub fn render_charts(run: &RunOutput, renderer: &mut dyn ChartRenderer) -> Result<(), AppError> {
    render_all(&run.charts, renderer)
}

fn initial_guess(model: ModelKind, supplied: Option<&[f64]>) -> Vec<f64> {
    match supplied {
        Some(guess) => guess.to_vec(),
        None => model.default_guess(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use crate::domain::{CurveGridSpec, FitStatus, Observable, ObservableTable};
    use crate::fit::FitOptions;

    fn config(dir: &Path) -> AnalysisConfig {
        AnalysisConfig {
            data_dir: dir.to_path_buf(),
            sizes: None,
            reference_size: None,
            model: ModelKind::DoubleTanh,
            initial_guess: None,
            fit_options: FitOptions::default(),
            fit_all: false,
            curve_grid: CurveGridSpec::default(),
            chart_min_sizes: BTreeMap::new(),
            plot: false,
            plot_width: 60,
            plot_height: 15,
            out_dir: None,
            export_series: None,
            export_fit: None,
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        charts: Vec<ObservableChart>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&mut self, chart: &ObservableChart) -> Result<(), AppError> {
            self.charts.push(chart.clone());
            Ok(())
        }
    }

    fn write_monotone(dir: &Path, size: u32) -> PathBuf {
        let mut text = String::new();
        for i in 0..10 {
            let t = 4.0 - 0.3 * i as f64;
            let m = 0.1 * (i + 1) as f64;
            text.push_str(&format!("{t}\t{m}\t{}\t{}\t{}\t\n", -0.1 * i as f64, 0.05 * i as f64, 0.02 * i as f64));
        }
        let path = dir.join(format!("test_L{size}.txt"));
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn end_to_end_two_sizes_feed_the_renderer() {
        let dir = tempfile::tempdir().unwrap();
        write_monotone(dir.path(), 4);
        write_monotone(dir.path(), 8);

        let run = run_analysis(&config(dir.path())).unwrap();
        assert_eq!(run.aggregate.sizes().collect::<Vec<_>>(), vec![SizeKey(4), SizeKey(8)]);
        for size in [SizeKey(4), SizeKey(8)] {
            assert_eq!(run.aggregate.temperatures(size).unwrap().len(), 10);
            for obs in Observable::ALL {
                assert_eq!(run.aggregate.values(obs, size).unwrap().len(), 10);
            }
        }
        assert_eq!(run.reference_size, SizeKey(8));
        assert!(run.failures.is_empty());

        let mut renderer = RecordingRenderer::default();
        render_charts(&run, &mut renderer).unwrap();
        assert_eq!(renderer.charts.len(), 4);

        let mag = renderer
            .charts
            .iter()
            .find(|c| c.observable == Observable::Magnetization)
            .unwrap();
        let labels: Vec<&str> = mag.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["L=4", "L=8"]);
        assert_eq!(mag.series[1].y.len(), 10);
    }

    #[test]
    fn fit_failure_still_renders_raw_series() {
        let dir = tempfile::tempdir().unwrap();
        write_monotone(dir.path(), 4);
        write_monotone(dir.path(), 8);

        let mut cfg = config(dir.path());
        // a = c = 0 makes the starting Jacobian singular.
        cfg.initial_guess = Some(vec![1.0, 0.5, 0.2, 0.0, 0.0, 0.0, 0.5]);

        let run = run_analysis(&cfg).unwrap();
        assert!(matches!(run.reference_fit.status, FitStatus::FailedToConverge(_)));
        assert!(run.overlay.is_none());
        assert!(run.charts.iter().all(|c| c.overlay.is_none()));
        assert_eq!(run.charts[0].series.len(), 2);
    }

    #[test]
    fn fit_all_reuses_the_reference_fit() {
        let dir = tempfile::tempdir().unwrap();
        write_monotone(dir.path(), 4);
        write_monotone(dir.path(), 8);

        let mut cfg = config(dir.path());
        cfg.fit_all = true;

        let run = run_analysis(&cfg).unwrap();
        assert_eq!(run.size_fits.keys().copied().collect::<Vec<_>>(), vec![SizeKey(4), SizeKey(8)]);

        let per_size = &run.size_fits[&run.reference_size];
        assert_eq!(run.reference_fit.status, per_size.status);
        assert_eq!(run.reference_fit.params, per_size.params);
        assert_eq!(run.reference_fit.iterations, per_size.iterations);
    }

    #[test]
    fn malformed_and_empty_sizes_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_monotone(dir.path(), 8);
        std::fs::write(dir.path().join("test_L4.txt"), "1 2 3 4 x\n").unwrap();
        std::fs::write(dir.path().join("test_L16.txt"), "\n\n").unwrap();

        let run = run_analysis(&config(dir.path())).unwrap();
        assert_eq!(run.aggregate.sizes().collect::<Vec<_>>(), vec![SizeKey(8)]);
        let skipped: Vec<SizeKey> = run.failures.iter().map(|f| f.size).collect();
        assert_eq!(skipped, vec![SizeKey(4), SizeKey(16)]);
        assert!(run.failures[0].message.contains(":1: malformed row"));
    }

    #[test]
    fn missing_reference_size_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        write_monotone(dir.path(), 4);

        let mut cfg = config(dir.path());
        cfg.reference_size = Some(SizeKey(64));
        assert_eq!(run_analysis(&cfg).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn all_sizes_empty_means_no_data() {
        let mut batch = BatchLoad::default();
        batch.tables.insert(SizeKey(4), ObservableTable::default());
        let err = run_analysis_with_tables(&config(Path::new(".")), batch).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
