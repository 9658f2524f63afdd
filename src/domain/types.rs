//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - produced once by the loader/aggregator and read everywhere else
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Linear size `L` of a simulated lattice (e.g. 2, 4, ..., 128).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeKey(pub u32);

impl SizeKey {
    /// Legend label, e.g. `L=16`.
    pub fn label(self) -> String {
        format!("L={}", self.0)
    }
}

impl fmt::Display for SizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of columns in every data row: `[T, |M|/N, E/N, C/N, χ/N]`.
pub const TABLE_COLUMNS: usize = 5;

/// Column index of the temperature.
pub const TEMPERATURE_COLUMN: usize = 0;

/// A per-spin observable written by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Observable {
    Magnetization,
    Energy,
    HeatCapacity,
    Susceptibility,
}

impl Observable {
    pub const ALL: [Observable; 4] = [
        Observable::Magnetization,
        Observable::Energy,
        Observable::HeatCapacity,
        Observable::Susceptibility,
    ];

    /// Fixed column index in the input table.
    pub fn column(self) -> usize {
        match self {
            Observable::Magnetization => 1,
            Observable::Energy => 2,
            Observable::HeatCapacity => 3,
            Observable::Susceptibility => 4,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Observable::Magnetization => "Magnetization",
            Observable::Energy => "Energy",
            Observable::HeatCapacity => "Heat capacity",
            Observable::Susceptibility => "Susceptibility",
        }
    }

    /// Y-axis label for charts.
    pub fn axis_label(self) -> &'static str {
        match self {
            Observable::Magnetization => "<|M|>/N",
            Observable::Energy => "E/N",
            Observable::HeatCapacity => "C/N",
            Observable::Susceptibility => "χ/N",
        }
    }

    /// File stem used for rendered charts and CSV headers.
    pub fn file_stem(self) -> &'static str {
        match self {
            Observable::Magnetization => "magnetization",
            Observable::Energy => "energy",
            Observable::HeatCapacity => "heat_capacity",
            Observable::Susceptibility => "susceptibility",
        }
    }
}

/// One loaded dataset for a single lattice size.
///
/// Rows are kept in file order. The sweep order is meaningful and nothing in the
/// pipeline sorts, deduplicates, or interpolates it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservableTable {
    rows: Vec<[f64; TABLE_COLUMNS]>,
}

impl ObservableTable {
    pub fn from_rows(rows: Vec<[f64; TABLE_COLUMNS]>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[f64; TABLE_COLUMNS]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Temperatures of one size's sweep, in row order.
pub type TemperatureGrid = Vec<f64>;

/// One observable across lattice sizes, each in row order.
pub type ObservableSeries = BTreeMap<SizeKey, Vec<f64>>;

/// Parametric magnetization model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// `C + A·tanh(a·T + b) + B·tanh(c·T + d)`, parameters `[A, B, C, a, b, c, d]`.
    DoubleTanh,
    /// `C + D·tanh(−A·T + B)`, parameters `[A, B, C, D]`.
    TanhStep,
}

impl ModelKind {
    /// Human-readable formula for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::DoubleTanh => "C + A·tanh(a·T + b) + B·tanh(c·T + d)",
            ModelKind::TanhStep => "C + D·tanh(-A·T + B)",
        }
    }

    pub fn param_count(self) -> usize {
        self.param_names().len()
    }

    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::DoubleTanh => &["A", "B", "C", "a", "b", "c", "d"],
            ModelKind::TanhStep => &["A", "B", "C", "D"],
        }
    }

    /// Starting point used when the caller supplies none.
    ///
    /// Both steps sit near the 2D Ising critical temperature (≈2.27) with
    /// different widths so the two tanh terms start out distinguishable.
    pub fn default_guess(self) -> Vec<f64> {
        match self {
            ModelKind::DoubleTanh => vec![-0.35, -0.15, 0.5, 2.0, -4.5, 1.0, -2.5],
            ModelKind::TanhStep => vec![1.0, 2.27, 0.5, 0.5],
        }
    }
}

/// Why a fit stopped without a usable estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Iteration cap reached before any convergence criterion held.
    IterationLimit,
    /// Jacobian rank deficient at the start or at the solution.
    SingularJacobian,
    /// The model produced non-finite values or derivatives.
    NonFiniteModel,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::IterationLimit => "iteration limit reached",
            FailureReason::SingularJacobian => "singular Jacobian",
            FailureReason::NonFiniteModel => "non-finite model values",
        };
        f.write_str(text)
    }
}

/// Outcome of a single fit invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Converged,
    FailedToConverge(FailureReason),
    /// Inputs were rejected before any optimization was attempted.
    InvalidInput(String),
}

impl fmt::Display for FitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitStatus::Converged => f.write_str("converged"),
            FitStatus::FailedToConverge(reason) => write!(f, "failed to converge ({reason})"),
            FitStatus::InvalidInput(reason) => write!(f, "invalid input ({reason})"),
        }
    }
}

/// Output of one fit.
///
/// `params` is the final iterate (or the initial guess for `InvalidInput`);
/// only a `Converged` result should be treated as an estimate.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub model: ModelKind,
    pub params: Vec<f64>,
    /// `s² (JᵀJ)⁻¹` at the solution; present only when converged.
    pub covariance: Option<DMatrix<f64>>,
    pub status: FitStatus,
    pub sse: f64,
    pub iterations: usize,
    pub n_points: usize,
}

impl FitResult {
    pub fn is_converged(&self) -> bool {
        self.status == FitStatus::Converged
    }

    /// One-sigma parameter uncertainties from the covariance diagonal.
    pub fn std_errors(&self) -> Option<Vec<f64>> {
        let cov = self.covariance.as_ref()?;
        Some(cov.diagonal().iter().map(|v| v.max(0.0).sqrt()).collect())
    }

    pub fn rmse(&self) -> f64 {
        if self.n_points == 0 {
            return f64::NAN;
        }
        (self.sse / self.n_points as f64).sqrt()
    }
}

/// Upper bound on points in any generated temperature grid.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Number of `step` intervals covering `[t_min, t_max]`.
///
/// `None` if the range or step is unusable, or the count exceeds
/// `MAX_GRID_POINTS`.
pub fn grid_intervals(t_min: f64, t_max: f64, step: f64) -> Option<usize> {
    if !(t_min.is_finite() && t_max.is_finite() && t_max > t_min && step.is_finite() && step > 0.0) {
        return None;
    }
    let n = ((t_max - t_min) / step).ceil();
    (n.is_finite() && n <= MAX_GRID_POINTS as f64).then_some(n as usize)
}

/// Temperature grid on which a fitted curve is evaluated for overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveGridSpec {
    pub t_min: f64,
    pub t_max: f64,
    pub step: f64,
}

impl CurveGridSpec {
    /// Points on the half-open grid `[t_min, t_max)`, or `None` if unusable.
    pub fn point_count(&self) -> Option<usize> {
        grid_intervals(self.t_min, self.t_max, self.step)
    }
}

impl Default for CurveGridSpec {
    fn default() -> Self {
        Self {
            t_min: 0.5,
            t_max: 5.0,
            step: 0.01,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub data_dir: PathBuf,
    /// Restrict the run to these sizes (all discovered files when `None`).
    pub sizes: Option<Vec<SizeKey>>,
    /// Size whose magnetization drives the overlay (largest loaded when `None`).
    pub reference_size: Option<SizeKey>,

    pub model: ModelKind,
    pub initial_guess: Option<Vec<f64>>,
    pub fit_options: crate::fit::FitOptions,
    /// Also fit every loaded size independently.
    pub fit_all: bool,
    pub curve_grid: CurveGridSpec,

    /// Per-chart lower bound on the sizes shown.
    pub chart_min_sizes: BTreeMap<Observable, SizeKey>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub out_dir: Option<PathBuf>,

    pub export_series: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}

/// A saved fit file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated: DateTime<Utc>,
    pub size: Option<SizeKey>,
    pub model: ModelKind,
    pub param_names: Vec<String>,
    pub params: Vec<f64>,
    pub std_errors: Option<Vec<f64>>,
    pub covariance: Option<Vec<Vec<f64>>>,
    pub status: FitStatus,
    pub sse: Option<f64>,
    pub iterations: usize,
    pub n_points: usize,
    /// Empty unless the fit converged.
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurveGrid {
    pub temperature: Vec<f64>,
    pub magnetization: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observable_columns_follow_file_layout() {
        let cols: Vec<usize> = Observable::ALL.iter().map(|o| o.column()).collect();
        assert_eq!(cols, vec![1, 2, 3, 4]);
        assert_eq!(TEMPERATURE_COLUMN, 0);
    }

    #[test]
    fn default_guesses_match_param_counts() {
        for model in [ModelKind::DoubleTanh, ModelKind::TanhStep] {
            assert_eq!(model.default_guess().len(), model.param_count());
        }
        assert_eq!(ModelKind::DoubleTanh.param_count(), 7);
    }

    #[test]
    fn std_errors_come_from_covariance_diagonal() {
        let fit = FitResult {
            model: ModelKind::TanhStep,
            params: vec![1.0, 2.0, 0.5, 0.5],
            covariance: Some(DMatrix::from_diagonal_element(4, 4, 0.04)),
            status: FitStatus::Converged,
            sse: 0.5,
            iterations: 3,
            n_points: 50,
        };
        let errs = fit.std_errors().unwrap();
        assert!(errs.iter().all(|e| (e - 0.2).abs() < 1e-12));
        assert!((fit.rmse() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn grid_point_count_is_capped() {
        let default = CurveGridSpec::default();
        assert!(matches!(default.point_count(), Some(450..=451)));

        let tiny = CurveGridSpec {
            step: 1e-20,
            ..default
        };
        assert_eq!(tiny.point_count(), None);
        assert_eq!(grid_intervals(0.5, 5.0, 1e-300), None);
        assert_eq!(grid_intervals(5.0, 0.5, 0.1), None);
    }
}
