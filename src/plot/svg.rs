//! Plotters-powered SVG chart files.
//!
//! One `<observable>.svg` per chart in the output directory. Styling is kept
//! minimal: palette colors per size, a marker per size, and a line for the
//! fitted overlay.

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::AppError;
use crate::plot::chart::{ChartRenderer, Marker, ObservableChart, widen};

pub struct SvgChartRenderer {
    out_dir: PathBuf,
    width: u32,
    height: u32,
    written: Vec<PathBuf>,
}

impl SvgChartRenderer {
    pub fn new(out_dir: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            out_dir: out_dir.into(),
            width,
            height,
            written: Vec::new(),
        }
    }

    /// Files written so far, in render order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&mut self, chart: &ObservableChart) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.out_dir).map_err(|e| {
            AppError::new(
                4,
                format!("Failed to create output directory '{}': {e}", self.out_dir.display()),
            )
        })?;

        let path = self.out_dir.join(format!("{}.svg", chart.observable.file_stem()));
        draw_svg(chart, &path, (self.width, self.height))
            .map_err(|e| AppError::new(4, format!("Failed to render '{}': {e}", path.display())))?;

        log::info!("wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

fn draw_svg(chart: &ObservableChart, path: &Path, size: (u32, u32)) -> Result<(), Box<dyn Error>> {
    let (x0, x1) = chart.x_range().map(widen).unwrap_or((0.0, 1.0));
    let (y0, y1) = chart.y_range().map(widen).unwrap_or((0.0, 1.0));
    let pad = (y1 - y0) * 0.05;

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 20))
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x0..x1, (y0 - pad)..(y1 + pad))?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(10)
        .y_labels(8)
        .draw()?;

    for (i, s) in chart.series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let points = s
            .x
            .iter()
            .copied()
            .zip(s.y.iter().copied())
            .filter(|(x, y)| x.is_finite() && y.is_finite());

        // Each marker is its own element type, so each gets its own draw call.
        let anno = match s.marker {
            Marker::Cross => ctx.draw_series(points.map(|p| Cross::new(p, 4, color.stroke_width(1))))?,
            Marker::Circle => ctx.draw_series(points.map(|p| Circle::new(p, 3, color.stroke_width(1))))?,
            Marker::Triangle => {
                ctx.draw_series(points.map(|p| TriangleMarker::new(p, 4, color.stroke_width(1))))?
            }
            Marker::Dot => ctx.draw_series(points.map(|p| Circle::new(p, 2, color.filled())))?,
        };
        anno.label(s.label.as_str())
            .legend(move |(x, y)| Circle::new((x, y), 3, color.filled()));
    }

    if let Some(overlay) = &chart.overlay {
        let line = overlay.x.iter().copied().zip(overlay.y.iter().copied());
        ctx.draw_series(LineSeries::new(line, BLACK.stroke_width(2)))?
            .label(overlay.label.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLACK.stroke_width(2)));
    }

    ctx.configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
