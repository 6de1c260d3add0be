//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> two-stage search -> residuals -> rankings
//!
//! The command handlers can then focus on presentation (printing and exports).

use crate::domain::{FitConfig, FitOutcome, PointResidual};
use crate::error::AppError;
use crate::fit::{EvolutionOptions, RefineOptions, SearchOptions, fit_parameters};
use crate::io::ingest::{IngestedData, load_observations};
use crate::models::CurveModel;

/// All computed outputs of a single `curvefit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub model: CurveModel,
    pub ingest: IngestedData,
    pub outcome: FitOutcome,
    pub residuals: Vec<PointResidual>,
    /// The `top_n` points with the largest L1 residual.
    pub largest: Vec<PointResidual>,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    // 1) Load and validate the CSV.
    let ingest = load_observations(&config.csv_path, config.t_min, config.t_max)?;

    run_fit_on_data(config, ingest)
}

/// Execute the fitting pipeline on already-loaded data.
pub fn run_fit_on_data(config: &FitConfig, ingest: IngestedData) -> Result<RunOutput, AppError> {
    let model = CurveModel::default();

    // 2) Global search + optional refinement.
    let opts = search_options_from_config(config);
    let outcome = fit_parameters(&model, &ingest.observations, &opts)?;

    // 3) Residuals and rankings.
    let residuals = crate::report::compute_residuals(&model, &ingest.observations, &outcome.params)?;
    let largest = crate::report::rank_largest_residuals(&residuals, config.top_n);

    Ok(RunOutput {
        model,
        ingest,
        outcome,
        residuals,
        largest,
    })
}

/// Map the run configuration onto search options. Unset knobs keep their defaults.
pub fn search_options_from_config(config: &FitConfig) -> SearchOptions {
    let refine = config.refine.then(|| RefineOptions {
        max_iter: config.refine_max_iter,
        f_scale: config.f_scale,
        ..RefineOptions::default()
    });

    SearchOptions {
        loss: config.loss,
        evolution: EvolutionOptions {
            max_iter: config.de_maxiter,
            popsize: config.de_popsize,
            tol: config.de_tol,
            seed: config.seed,
            ..EvolutionOptions::default()
        },
        refine,
        ..SearchOptions::default()
    }
}
