//! Two-stage parameter search.
//!
//! 1. differential evolution over the parameter box on the scalar loss
//! 2. optional soft-L1 refinement seeded from stage 1
//!
//! The refined point replaces the stage-1 point only if it is inside the box,
//! has a finite loss, and does not increase the scalar loss. Every stage is
//! recorded in the returned history whether or not it was kept.

use crate::domain::{FitOutcome, LossKind, Observations, ParamBounds, Params, StageMethod, StageRecord};
use crate::error::AppError;
use crate::fit::evolution::{EvolutionOptions, differential_evolution};
use crate::fit::objective::Objective;
use crate::fit::refine::{RefineOptions, refine};
use crate::models::CurveModel;

/// Options for `fit_parameters`.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub bounds: ParamBounds,
    pub loss: LossKind,
    pub evolution: EvolutionOptions,
    /// `None` skips the refinement stage.
    pub refine: Option<RefineOptions>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            bounds: ParamBounds::default(),
            loss: LossKind::Positional,
            evolution: EvolutionOptions::default(),
            refine: Some(RefineOptions::default()),
        }
    }
}

/// Fit `(θ, M, X)` to `obs`.
pub fn fit_parameters(
    model: &CurveModel,
    obs: &Observations,
    opts: &SearchOptions,
) -> Result<FitOutcome, AppError> {
    opts.bounds.validate()?;
    let bounds = opts.bounds;
    let objective = Objective::new(*model, obs, opts.loss);

    tracing::info!(
        n_points = obs.len(),
        loss = opts.loss.display_name(),
        theta = ?bounds.theta,
        m = ?bounds.m,
        x = ?bounds.x,
        "starting global optimization with differential evolution"
    );

    let de = differential_evolution(
        |v: &[f64]| match Params::from_slice(v) {
            Some(p) => objective.loss(&p),
            None => f64::INFINITY,
        },
        &bounds.as_array(),
        &opts.evolution,
    )?;

    let de_params = Params::from_slice(&de.best)
        .ok_or_else(|| AppError::fit("Differential evolution returned a malformed parameter vector."))?;
    if !(de.energy.is_finite() && bounds.contains(&de_params)) {
        return Err(AppError::fit(format!(
            "Differential evolution returned an invalid candidate (params={de_params:?}, loss={}).",
            de.energy
        )));
    }

    tracing::info!(
        theta = de_params.theta_deg,
        m = de_params.m,
        x = de_params.x,
        loss = de.energy,
        generations = de.stats.generations,
        nfev = de.stats.nfev,
        converged = de.stats.converged,
        "differential evolution completed"
    );

    let mut history = vec![StageRecord {
        method: StageMethod::DifferentialEvolution,
        params: de_params,
        loss: de.energy,
        accepted: true,
    }];
    let mut best = (de_params, de.energy);

    if let Some(refine_opts) = &opts.refine {
        match refine(&objective, de_params, &bounds, refine_opts) {
            Ok(refined) => {
                let loss = objective.loss(&refined.params);
                let rejection = check_refinement(loss, best.1, bounds.contains(&refined.params));
                let accepted = rejection.is_none();

                if let Some(reason) = rejection {
                    tracing::warn!(
                        refined_loss = loss,
                        global_loss = best.1,
                        reason = reason.as_str(),
                        "{}; keeping the global-stage result",
                        reason.message()
                    );
                } else {
                    tracing::info!(
                        theta = refined.params.theta_deg,
                        m = refined.params.m,
                        x = refined.params.x,
                        loss,
                        iterations = refined.iterations,
                        "refinement accepted"
                    );
                    best = (refined.params, loss);
                }

                history.push(StageRecord {
                    method: StageMethod::SoftL1Refine,
                    params: refined.params,
                    loss,
                    accepted,
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, "refinement failed; keeping the global-stage result");
            }
        }
    }

    Ok(FitOutcome {
        params: best.0,
        loss: best.1,
        history,
        evolution: de.stats,
    })
}

/// Why a refined point was not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    NonFiniteLoss,
    OutOfBounds,
    LossIncreased,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Rejection::NonFiniteLoss => "non_finite_loss",
            Rejection::OutOfBounds => "out_of_bounds",
            Rejection::LossIncreased => "loss_increased",
        }
    }

    fn message(self) -> &'static str {
        match self {
            Rejection::NonFiniteLoss => "refinement produced a non-finite loss",
            Rejection::OutOfBounds => "refinement left the parameter box",
            Rejection::LossIncreased => "refinement increased the loss",
        }
    }
}

/// Acceptance policy for the refined point, checked in order of severity.
fn check_refinement(loss: f64, global_loss: f64, in_bounds: bool) -> Option<Rejection> {
    if !loss.is_finite() {
        Some(Rejection::NonFiniteLoss)
    } else if !in_bounds {
        Some(Rejection::OutOfBounds)
    } else if loss > global_loss {
        Some(Rejection::LossIncreased)
    } else {
        None
    }
}
