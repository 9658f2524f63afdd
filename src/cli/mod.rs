//! Command-line parsing for the Ising observables tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{ModelKind, Observable, SizeKey};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ising", version, about = "2D Ising observables: aggregate, fit, and chart")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load every size, fit the reference magnetization, print reports, and render charts.
    Analyze(AnalyzeArgs),
    /// Load and fit only (no charts). Useful for scripting.
    Fit(AnalyzeArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
    /// Write synthetic `test_L<size>.txt` files.
    Synth(SynthArgs),
}

/// Common options for analysis and fitting.
#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    /// Directory holding `test_L<size>.txt` files.
    #[arg(short = 'd', long, env = "ISING_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Only load these sizes (comma-separated). Default: every file found.
    #[arg(long, value_delimiter = ',')]
    pub sizes: Vec<u32>,

    /// Size whose magnetization is fitted for the overlay. Default: the largest loaded.
    #[arg(short = 'L', long = "reference")]
    pub reference: Option<u32>,

    /// Magnetization model.
    #[arg(long, value_enum, default_value_t = ModelKind::DoubleTanh)]
    pub model: ModelKind,

    /// Initial parameter guess (comma-separated, model order). Default: the model's built-in guess.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub guess: Vec<f64>,

    #[command(flatten)]
    pub solver: SolverArgs,

    /// Also fit every loaded size and print a table.
    #[arg(long)]
    pub fit_all: bool,

    /// Lower end of the fitted-curve grid.
    #[arg(long, default_value_t = 0.5)]
    pub grid_min: f64,

    /// Upper end (exclusive) of the fitted-curve grid.
    #[arg(long, default_value_t = 5.0)]
    pub grid_max: f64,

    /// Spacing of the fitted-curve grid.
    #[arg(long, default_value_t = 0.01)]
    pub grid_step: f64,

    /// Hide sizes below L on one chart, e.g. `susceptibility=32`. Repeatable.
    #[arg(long = "chart-min-size", value_name = "OBSERVABLE=L", value_parser = parse_chart_min_size)]
    pub chart_min_size: Vec<(Observable, SizeKey)>,

    /// Render ASCII charts in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal charts.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Write one SVG chart per observable into this directory.
    #[arg(short = 'o', long, env = "ISING_OUT_DIR")]
    pub out_dir: Option<PathBuf>,

    /// Export all aggregated series to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the reference fit (params + fitted grid) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,
}

/// Levenberg–Marquardt controls.
#[derive(Debug, Args, Clone)]
pub struct SolverArgs {
    /// Iteration cap. Default: 200 × (parameters + 1).
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Relative SSE reduction tolerance.
    #[arg(long, default_value_t = 1.49012e-8)]
    pub ftol: f64,

    /// Relative step size tolerance.
    #[arg(long, default_value_t = 1.49012e-8)]
    pub xtol: f64,

    /// Gradient max-norm tolerance.
    #[arg(long, default_value_t = 0.0)]
    pub gtol: f64,

    /// Reciprocal condition number below which the Jacobian counts as singular.
    #[arg(long, default_value_t = 1e-12)]
    pub rcond: f64,
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `ising analyze --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser)]
pub struct SynthArgs {
    /// Output directory.
    #[arg(short = 'd', long, env = "ISING_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Lattice sizes (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "2,4,8,16,32,64,128")]
    pub sizes: Vec<u32>,

    /// Sweep start temperature.
    #[arg(long, default_value_t = 5.0)]
    pub t_max: f64,

    /// Sweep end temperature (inclusive).
    #[arg(long, default_value_t = 0.5)]
    pub t_min: f64,

    /// Temperature step.
    #[arg(long, default_value_t = 0.1)]
    pub step: f64,

    /// Standard deviation of the additive noise.
    #[arg(long, default_value_t = 0.005)]
    pub noise: f64,

    /// Random seed (combined with each size for reproducibility).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Parse `<observable>=<L>`, e.g. `susceptibility=32`.
pub fn parse_chart_min_size(s: &str) -> Result<(Observable, SizeKey), String> {
    let (name, size) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OBSERVABLE=L, got '{s}'"))?;
    let observable = Observable::from_str(name.trim(), true)?;
    let size: u32 = size
        .trim()
        .parse()
        .map_err(|e| format!("invalid lattice size '{size}': {e}"))?;
    Ok((observable, SizeKey(size)))
}
