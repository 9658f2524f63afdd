//! Render-only chart descriptions and the renderer seam.
//!
//! All series and labels are computed here, outside any renderer, so a renderer
//! only has to draw what it is handed.

use std::collections::BTreeMap;

use crate::data::Aggregate;
use crate::domain::{CurveGridSpec, FitResult, Observable, SizeKey};
use crate::error::AppError;
use crate::models::curve_grid;

/// Per-size point marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Cross,
    Circle,
    Triangle,
    Dot,
}

impl Marker {
    const CYCLE: [Marker; 4] = [Marker::Cross, Marker::Circle, Marker::Triangle, Marker::Dot];

    /// Marker for the `i`-th size in ascending order.
    pub fn for_index(i: usize) -> Marker {
        Self::CYCLE[i % Self::CYCLE.len()]
    }

    /// Terminal glyph.
    pub fn glyph(self) -> char {
        match self {
            Marker::Cross => 'x',
            Marker::Circle => 'o',
            Marker::Triangle => '^',
            Marker::Dot => '*',
        }
    }
}

/// One size's raw points, in sweep order.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub label: String,
    pub size: SizeKey,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub marker: Marker,
}

/// A fitted curve drawn on top of the raw series.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservableChart {
    pub observable: Observable,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<NamedSeries>,
    pub overlay: Option<Overlay>,
}

impl ObservableChart {
    /// Finite x bounds over all series and the overlay.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        finite_range(
            self.series
                .iter()
                .flat_map(|s| s.x.iter())
                .chain(self.overlay.iter().flat_map(|o| o.x.iter())),
        )
    }

    /// Finite y bounds over all series and the overlay.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        finite_range(
            self.series
                .iter()
                .flat_map(|s| s.y.iter())
                .chain(self.overlay.iter().flat_map(|o| o.y.iter())),
        )
    }
}

fn finite_range<'a>(values: impl Iterator<Item = &'a f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    (min.is_finite() && max.is_finite()).then_some((min, max))
}

/// Give a degenerate (single-valued) range some width.
pub(crate) fn widen((min, max): (f64, f64)) -> (f64, f64) {
    if max > min { (min, max) } else { (min - 0.5, max + 0.5) }
}

/// Anything that can draw an `ObservableChart`.
pub trait ChartRenderer {
    fn render(&mut self, chart: &ObservableChart) -> Result<(), AppError>;
}

/// Build one chart per observable.
///
/// Each size is plotted against its own temperature grid. The overlay, if any,
/// is attached to the magnetization chart only. `min_sizes` hides sizes below a
/// per-observable threshold.
pub fn build_charts(
    aggregate: &Aggregate,
    overlay: Option<&Overlay>,
    min_sizes: &BTreeMap<Observable, SizeKey>,
) -> Vec<ObservableChart> {
    Observable::ALL
        .iter()
        .map(|&observable| {
            let floor = min_sizes.get(&observable).copied();
            let series = aggregate
                .sizes()
                .enumerate()
                .filter(|(_, size)| floor.is_none_or(|min| *size >= min))
                .filter_map(|(i, size)| {
                    let x = aggregate.temperatures(size)?;
                    let y = aggregate.values(observable, size)?;
                    Some(NamedSeries {
                        label: size.label(),
                        size,
                        x: x.to_vec(),
                        y: y.to_vec(),
                        marker: Marker::for_index(i),
                    })
                })
                .collect();

            ObservableChart {
                observable,
                title: format!("{} vs temperature", observable.display_name()),
                x_label: "T".to_string(),
                y_label: observable.axis_label().to_string(),
                series,
                overlay: match observable {
                    Observable::Magnetization => overlay.cloned(),
                    _ => None,
                },
            }
        })
        .collect()
}

/// Sample a converged fit on `grid` for plotting. Failed fits give no overlay.
pub fn overlay_from_fit(fit: &FitResult, size: SizeKey, grid: &CurveGridSpec) -> Option<Overlay> {
    if !fit.is_converged() {
        return None;
    }
    let (x, y) = curve_grid(fit.model, &fit.params, grid);
    if x.is_empty() {
        return None;
    }
    Some(Overlay {
        label: format!("fit {}", size.label()),
        x,
        y,
    })
}

/// Hand every chart to the renderer, stopping at the first failure.
pub fn render_all(charts: &[ObservableChart], renderer: &mut dyn ChartRenderer) -> Result<(), AppError> {
    for chart in charts {
        log::debug!(
            "rendering {} ({} series{})",
            chart.observable.file_stem(),
            chart.series.len(),
            if chart.overlay.is_some() { " + overlay" } else { "" }
        );
        renderer.render(chart)?;
    }
    Ok(())
}
