//! Plotters-powered SVG chart of a fit.
//!
//! Observed points are drawn as small circles, the fitted curve as a line. The
//! axes are the x–y plane with equal padding on both sides.

use std::path::Path;

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::error::AppError;

/// A render-only chart description. All series and bounds are computed by the caller.
pub struct SvgChart<'a> {
    pub title: &'a str,
    /// Line series for the fitted curve.
    pub curve: &'a [(f64, f64)],
    /// Scatter series for all observations.
    pub points: &'a [(f64, f64)],
    /// Highlighted observations (a subset of `points`).
    pub highlights: &'a [(f64, f64)],
    pub width: u32,
    pub height: u32,
}

impl SvgChart<'_> {
    /// Render the chart to `path`.
    pub fn write(&self, path: &Path) -> Result<(), AppError> {
        let (x0, x1) = bounds(self.points.iter().chain(self.curve).map(|p| p.0));
        let (y0, y1) = bounds(self.points.iter().chain(self.curve).map(|p| p.1));

        let root = SVGBackend::new(path, (self.width.max(200), self.height.max(150))).into_drawing_area();
        self.draw(&root, (x0, x1), (y0, y1))
            .map_err(|e| AppError::input(format!("Failed to render SVG '{}': {e}", path.display())))?;
        root.present()
            .map_err(|e| AppError::input(format!("Failed to write SVG '{}': {e}", path.display())))?;

        tracing::info!(path = %path.display(), points = self.points.len(), "wrote SVG plot");
        Ok(())
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        (x0, x1): (f64, f64),
        (y0, y1): (f64, f64),
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(root)
            .caption(self.title, ("sans-serif", 18))
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .x_desc("x")
            .y_desc("y")
            .x_labels(8)
            .y_labels(8)
            .x_label_formatter(&|v| format!("{v:.1}"))
            .y_label_formatter(&|v| format!("{v:.1}"))
            .draw()?;

        let curve_color = RGBColor(0, 114, 189);
        let points_color = RGBColor(120, 120, 120);
        let highlight_color = RGBColor(217, 83, 25);

        // 1) Observed points (under the curve so the fit stays visible).
        chart.draw_series(
            self.points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 2, points_color.filled())),
        )?;

        // 2) Fitted curve line.
        chart.draw_series(LineSeries::new(
            self.curve.iter().copied().filter(|(x, y)| x.is_finite() && y.is_finite()),
            curve_color.stroke_width(2),
        ))?;

        // 3) Largest residuals.
        chart.draw_series(
            self.highlights
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, highlight_color.stroke_width(2))),
        )?;

        Ok(())
    }
}

pub(crate) fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(0.5);
    (lo - pad, hi + pad)
}
