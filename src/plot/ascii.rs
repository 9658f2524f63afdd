//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - raw points: one glyph per size (`x`, `o`, `^`, `*`)
//! - fitted overlay: `-` line

use std::io::Write;

use crate::error::AppError;
use crate::plot::chart::{ChartRenderer, ObservableChart, widen};

/// Writes each chart as text to `out`.
pub struct AsciiChartRenderer<W: Write> {
    out: W,
    width: usize,
    height: usize,
}

impl<W: Write> AsciiChartRenderer<W> {
    pub fn new(out: W, width: usize, height: usize) -> Self {
        Self { out, width, height }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChartRenderer for AsciiChartRenderer<W> {
    fn render(&mut self, chart: &ObservableChart) -> Result<(), AppError> {
        let text = render_ascii_chart(chart, self.width, self.height);
        writeln!(self.out, "{text}")
            .map_err(|e| AppError::new(4, format!("Failed to write chart: {e}")))
    }
}

/// Render one chart: header, grid, then a legend line per series.
pub fn render_ascii_chart(chart: &ObservableChart, width: usize, height: usize) -> String {
    let (t_min, t_max) = chart.x_range().map(widen).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = chart.y_range().map(widen).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut plot = Grid::new(width, height, t_min, t_max, y_min, y_max);

    // Curve first so points can overlay it.
    if let Some(overlay) = &chart.overlay {
        let curve: Vec<(f64, f64)> = overlay.x.iter().copied().zip(overlay.y.iter().copied()).collect();
        plot.draw_curve(&curve);
    }
    for s in &chart.series {
        for (&t, &y) in s.x.iter().zip(&s.y) {
            plot.point(t, y, s.marker.glyph());
        }
    }

    let mut out = format!(
        "{}: T=[{t_min:.3}, {t_max:.3}] | y=[{y_min:.3}, {y_max:.3}]\n",
        chart.observable.display_name()
    );
    out.push_str(&plot.into_string());
    for s in &chart.series {
        out.push_str(&format!("{} {}\n", s.marker.glyph(), s.label));
    }
    if let Some(overlay) = &chart.overlay {
        out.push_str(&format!("- {}\n", overlay.label));
    }
    out
}

/// Render a bare curve (e.g. a fit grid reloaded from JSON).
pub fn render_ascii_curve(temps: &[f64], values: &[f64], width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = temps
        .iter()
        .copied()
        .zip(values.iter().copied())
        .filter(|(t, y)| t.is_finite() && y.is_finite())
        .collect();

    let (t_min, t_max) = range(curve.iter().map(|p| p.0)).map(widen).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = range(curve.iter().map(|p| p.1)).map(widen).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut plot = Grid::new(width, height, t_min, t_max, y_min, y_max);
    plot.draw_curve(&curve);

    let mut out = format!("Plot: T=[{t_min:.3}, {t_max:.3}] | y=[{y_min:.3}, {y_max:.3}]\n");
    out.push_str(&plot.into_string());
    out
}

struct Grid {
    cells: Vec<Vec<char>>,
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Grid {
    fn new(width: usize, height: usize, t_min: f64, t_max: f64, y_min: f64, y_max: f64) -> Self {
        let width = width.max(10);
        let height = height.max(5);
        Self {
            cells: vec![vec![' '; width]; height],
            t_min,
            t_max,
            y_min,
            y_max,
        }
    }

    fn width(&self) -> usize {
        self.cells[0].len()
    }

    fn height(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, t: f64, y: f64) -> (usize, usize) {
        (
            map_x(t, self.t_min, self.t_max, self.width()),
            map_y(y, self.y_min, self.y_max, self.height()),
        )
    }

    fn point(&mut self, t: f64, y: f64, ch: char) {
        if !(t.is_finite() && y.is_finite()) {
            return;
        }
        let (x, row) = self.cell(t, y);
        self.cells[row][x] = ch;
    }

    fn draw_curve(&mut self, curve: &[(f64, f64)]) {
        if curve.len() < 2 {
            return;
        }
        let mut prev = None;
        for &(t, y) in curve {
            let (x, row) = self.cell(t, y);
            if let Some((x0, y0)) = prev {
                draw_line(&mut self.cells, x0, y0, x, row, '-');
            } else {
                self.cells[row][x] = '-';
            }
            prev = Some((x, row));
        }
    }

    fn into_string(self) -> String {
        let mut out = String::new();
        for row in self.cells {
            out.push_str(&row.into_iter().collect::<String>());
            out.push('\n');
        }
        out
    }
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    (min.is_finite() && max.is_finite()).then_some((min, max))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
