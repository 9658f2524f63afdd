//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - runs load → aggregate → fit
//! - prints reports/plots and writes SVG charts
//! - writes optional exports

use std::collections::BTreeMap;
use std::io;

use clap::Parser;

use crate::cli::{AnalyzeArgs, Command, PlotArgs, SynthArgs};
use crate::data::{SampleSpec, write_samples};
use crate::domain::{AnalysisConfig, CurveGridSpec, MAX_GRID_POINTS, SizeKey};
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::plot::{AsciiChartRenderer, SvgChartRenderer};

pub mod pipeline;

/// `env_logger` filter used when `RUST_LOG` is unset: `info` for this crate only.
pub const DEFAULT_LOG_FILTER: &str = "ising_curves=info";

/// SVG canvas size in pixels.
const SVG_SIZE: (u32, u32) = (900, 600);

/// Entry point for the `ising` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args, OutputMode::Full),
        Command::Fit(args) => handle_analyze(args, OutputMode::FitOnly),
        Command::Plot(args) => handle_plot(args),
        Command::Synth(args) => handle_synth(args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    FitOnly,
}

fn handle_analyze(args: AnalyzeArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args)?;
    let run = pipeline::run_analysis(&config)?;

    let failures: Vec<_> = run
        .failures
        .iter()
        .map(|f| (f.size, f.message.as_str()))
        .collect();
    print!("{}", crate::report::format_dataset_summary(&run.aggregate, &failures));
    print!("{}", crate::report::format_fit_summary(run.reference_size, &run.reference_fit));
    if !run.size_fits.is_empty() {
        print!("{}", crate::report::format_fit_table(&run.size_fits));
    }

    if mode == OutputMode::Full {
        print!("{}", crate::report::format_peaks(&run.aggregate));
        println!();

        if config.plot {
            let stdout = io::stdout().lock();
            let mut ascii = AsciiChartRenderer::new(stdout, config.plot_width, config.plot_height);
            pipeline::render_charts(&run, &mut ascii)?;
        }
        if let Some(dir) = &config.out_dir {
            let mut svg = SvgChartRenderer::new(dir, SVG_SIZE.0, SVG_SIZE.1);
            pipeline::render_charts(&run, &mut svg)?;
            println!("\nCharts:");
            for path in svg.written() {
                println!("  {}", path.display());
            }
        }
    }

    // Optional exports.
    if let Some(path) = &config.export_series {
        crate::io::export::write_series_csv(path, &run.aggregate)?;
    }
    if let Some(path) = &config.export_fit {
        crate::io::curve::write_fit_json(path, Some(run.reference_size), &run.reference_fit, &config.curve_grid)?;
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let saved = crate::io::curve::read_fit_json(&args.fit)?;
    if saved.grid.temperature.is_empty() {
        return Err(AppError::new(
            3,
            format!("Fit in '{}' has no fitted grid (status: {}).", args.fit.display(), saved.status),
        ));
    }

    let label = saved.size.map(|s| s.label()).unwrap_or_else(|| "?".to_string());
    println!("{} fit ({label}): {}", saved.model.display_name(), saved.status);
    let plot = crate::plot::render_ascii_curve(
        &saved.grid.temperature,
        &saved.grid.magnetization,
        args.width,
        args.height,
    );
    println!("{plot}");
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let spec = SampleSpec {
        sizes: args.sizes.iter().copied().map(SizeKey).collect(),
        t_max: args.t_max,
        t_min: args.t_min,
        step: args.step,
        noise: args.noise,
        seed: args.seed,
    };
    let written = write_samples(&spec, &args.data_dir)?;
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}

/// Turn CLI flags into the pipeline's configuration.
pub fn analysis_config_from_args(args: &AnalyzeArgs) -> Result<AnalysisConfig, AppError> {
    let curve_grid = CurveGridSpec {
        t_min: args.grid_min,
        t_max: args.grid_max,
        step: args.grid_step,
    };
    if !(curve_grid.t_min.is_finite() && curve_grid.t_max > curve_grid.t_min) {
        return Err(AppError::new(2, "Invalid fitted-curve grid range."));
    }
    if !(curve_grid.step.is_finite() && curve_grid.step > 0.0) {
        return Err(AppError::new(2, "Fitted-curve grid step must be > 0."));
    }
    if curve_grid.point_count().is_none() {
        return Err(AppError::new(
            2,
            format!("Fitted-curve grid exceeds {MAX_GRID_POINTS} points; use a larger --grid-step."),
        ));
    }

    let fit_options = FitOptions {
        max_iterations: args.solver.max_iterations,
        ftol: args.solver.ftol,
        xtol: args.solver.xtol,
        gtol: args.solver.gtol,
        rcond: args.solver.rcond,
        ..FitOptions::default()
    };

    let chart_min_sizes: BTreeMap<_, _> = args.chart_min_size.iter().copied().collect();

    Ok(AnalysisConfig {
        data_dir: args.data_dir.clone(),
        sizes: (!args.sizes.is_empty()).then(|| args.sizes.iter().copied().map(SizeKey).collect()),
        reference_size: args.reference.map(SizeKey),
        model: args.model,
        initial_guess: (!args.guess.is_empty()).then(|| args.guess.clone()),
        fit_options,
        fit_all: args.fit_all,
        curve_grid,
        chart_min_sizes,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        out_dir: args.out_dir.clone(),
        export_series: args.export.clone(),
        export_fit: args.export_fit.clone(),
    })
}
