//! SVG chart of the optimization history: one marker per stage, loss on the y axis.
//!
//! Kept stages are filled markers, rejected ones are hollow.

use std::path::Path;

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::domain::StageRecord;
use crate::error::AppError;
use crate::plot::svg::bounds;

pub struct HistoryChart<'a> {
    pub stages: &'a [StageRecord],
    pub width: u32,
    pub height: u32,
}

impl HistoryChart<'_> {
    /// Render the chart to `path`.
    pub fn write(&self, path: &Path) -> Result<(), AppError> {
        if self.stages.is_empty() {
            return Err(AppError::input("Optimization history is empty; nothing to plot."));
        }
        let x_range = (-0.5, self.stages.len() as f64 - 0.5);
        let (lo, hi) = bounds(self.stages.iter().map(|s| s.loss));
        // Loss is never negative.
        let y_range = (lo.max(0.0), hi);

        let root = SVGBackend::new(path, (self.width.max(200), self.height.max(150))).into_drawing_area();
        self.draw(&root, x_range, y_range)
            .map_err(|e| AppError::input(format!("Failed to render SVG '{}': {e}", path.display())))?;
        root.present()
            .map_err(|e| AppError::input(format!("Failed to write SVG '{}': {e}", path.display())))?;

        tracing::info!(path = %path.display(), stages = self.stages.len(), "wrote optimization history plot");
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
            .caption("Optimization history", ("sans-serif", 18))
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .x_desc("stage")
            .y_desc("L1 loss")
            .x_labels(self.stages.len() + 2)
            .y_labels(8)
            .x_label_formatter(&|v| stage_label(self.stages, *v))
            .y_label_formatter(&|v| format!("{v:.3}"))
            .draw()?;

        let stage_color = RGBColor(0, 114, 189);
        let rejected_color = RGBColor(217, 83, 25);

        let finite: Vec<(f64, f64, bool)> = self
            .stages
            .iter()
            .enumerate()
            .filter(|(_, s)| s.loss.is_finite())
            .map(|(i, s)| (i as f64, s.loss, s.accepted))
            .collect();

        chart.draw_series(LineSeries::new(
            finite.iter().map(|&(i, loss, _)| (i, loss)),
            stage_color.stroke_width(1),
        ))?;

        chart.draw_series(finite.iter().map(|&(i, loss, accepted)| {
            if accepted {
                Circle::new((i, loss), 5, stage_color.filled())
            } else {
                Circle::new((i, loss), 5, rejected_color.stroke_width(2))
            }
        }))?;

        Ok(())
    }
}

/// Axis label for a stage index; blank between stages.
fn stage_label(stages: &[StageRecord], v: f64) -> String {
    let i = v.round();
    if (v - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    stages
        .get(i as usize)
        .map(|s| format!("{}: {}", i as usize + 1, s.method.display_name()))
        .unwrap_or_default()
}
