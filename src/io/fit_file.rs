//! Read/write fit JSON files.
//!
//! Fit JSON is the portable representation of a run:
//! - model constants, loss kind and fitted `(θ, M, X)`
//! - the optimization history and the equation string
//! - the observed points plus a precomputed curve grid for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{CurveGrid, FitFile, FitOutcome, LossKind, Observations};
use crate::error::AppError;
use crate::models::CurveModel;
use crate::report::equation_string;

/// Number of points in the saved curve grid.
pub const FIT_GRID_POINTS: usize = 201;

/// Assemble a `FitFile` from a finished run.
pub fn build_fit_file(
    model: &CurveModel,
    obs: &Observations,
    loss_kind: LossKind,
    outcome: &FitOutcome,
    precision: usize,
) -> FitFile {
    let (t_min, t_max) = obs.t_range();
    let mut grid = CurveGrid {
        t: Vec::with_capacity(FIT_GRID_POINTS),
        x: Vec::with_capacity(FIT_GRID_POINTS),
        y: Vec::with_capacity(FIT_GRID_POINTS),
    };
    for (t, x, y) in model.sample(&outcome.params, t_min, t_max, FIT_GRID_POINTS) {
        grid.t.push(t);
        grid.x.push(x);
        grid.y.push(y);
    }

    FitFile {
        tool: env!("CARGO_PKG_NAME").to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        model: *model,
        loss_kind,
        params: outcome.params,
        loss: outcome.loss,
        equation: equation_string(&outcome.params, precision),
        history: outcome.history.clone(),
        observed: obs.points().collect(),
        grid,
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &FitFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    write_fit(BufWriter::new(file), fit)
}

/// Write fit JSON to any writer and flush it.
pub fn write_fit<W: Write>(mut out: W, fit: &FitFile) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut out, fit)
        .map_err(|e| AppError::input(format!("Failed to write fit JSON: {e}")))?;
    out.flush()
        .map_err(|e| AppError::input(format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid fit JSON: {e}")))?;
    if fit.grid.t.len() != fit.grid.x.len() || fit.grid.t.len() != fit.grid.y.len() {
        return Err(AppError::input("Invalid fit JSON: curve grid columns differ in length."));
    }
    Ok(fit)
}
