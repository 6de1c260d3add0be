//! Bounded, robust local refinement.
//!
//! Starting from the global-stage optimum we run a Levenberg–Marquardt style
//! trust-region iteration on the soft-L1 cost
//!
//! ```text
//! C(p) = ½ · f² · Σ ρ((r_i(p) / f)²)
//! ```
//!
//! Each iteration:
//!
//! 1. weights `w_i = ρ'(z_i)` (IRLS form of the soft-L1 penalty)
//! 2. solve `min ‖√w·(J·δ + r)‖² + λ‖D·δ‖²` with `D` the column norms of `√w·J`
//! 3. project `p + δ` onto the parameter box
//! 4. accept if the robust cost decreased (shrink `λ`), else grow `λ` and retry
//!
//! The damping `λ` plays the role of the trust-region radius; `D` keeps the step
//! well scaled even though θ, M and X differ by orders of magnitude.

use nalgebra::DVector;

use crate::domain::{PARAM_COUNT, ParamBounds, Params};
use crate::error::AppError;
use crate::fit::objective::Objective;
use crate::math::{soft_l1_cost, soft_l1_weight, solve_damped_step};

/// Damping limits. Exceeding `LAMBDA_MAX` means no descent step exists at this scale.
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;
const LAMBDA_UP: f64 = 10.0;
const LAMBDA_DOWN: f64 = 0.3;

/// Floor for the column scaling `D`, so flat directions stay damped.
const SCALE_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct RefineOptions {
    pub max_iter: usize,
    /// Soft-L1 transition scale: residuals well above `f_scale` are treated as outliers.
    pub f_scale: f64,
    /// Stop when the relative cost decrease falls below this.
    pub ftol: f64,
    /// Stop when the step is this small relative to the parameter vector.
    pub xtol: f64,
    /// Initial damping `λ`.
    pub initial_damping: f64,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            f_scale: 1.0,
            ftol: 1e-10,
            xtol: 1e-10,
            initial_damping: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefineResult {
    pub params: Params,
    /// Soft-L1 cost at `params`.
    pub robust_cost: f64,
    pub iterations: usize,
    /// `true` if a tolerance criterion stopped the loop (not `max_iter` or damping blow-up).
    pub converged: bool,
}

/// Refine `start` by minimizing the soft-L1 cost inside `bounds`.
///
/// Fails only when the starting point itself yields non-finite residuals or the
/// options are invalid; a refinement that makes no progress returns `start`.
pub fn refine(
    objective: &Objective<'_>,
    start: Params,
    bounds: &ParamBounds,
    opts: &RefineOptions,
) -> Result<RefineResult, AppError> {
    if !(opts.f_scale.is_finite() && opts.f_scale > 0.0) {
        return Err(AppError::input(format!(
            "Soft-L1 scale must be finite and > 0, got {}.",
            opts.f_scale
        )));
    }

    let mut p = bounds.clamp(&start);
    let mut r = objective.residuals(&p);
    if r.iter().any(|v| !v.is_finite()) {
        return Err(AppError::fit("Refinement start point yields non-finite residuals."));
    }
    let mut cost = soft_l1_cost(&r, opts.f_scale);
    let mut lambda = opts.initial_damping.max(LAMBDA_MIN);
    let f2 = opts.f_scale * opts.f_scale;

    let mut iterations = 0;
    let mut converged = false;

    'outer: while iterations < opts.max_iter {
        iterations += 1;

        // Weighted Jacobian and residuals for this linearization.
        let mut jac = objective.jacobian(&p);
        let mut rw = DVector::<f64>::zeros(r.len());
        for (i, &ri) in r.iter().enumerate() {
            let sw = soft_l1_weight(ri * ri / f2).sqrt();
            rw[i] = sw * ri;
            for k in 0..PARAM_COUNT {
                jac[(i, k)] *= sw;
            }
        }
        if jac.iter().any(|v| !v.is_finite()) {
            tracing::warn!(iteration = iterations, "non-finite Jacobian during refinement");
            break;
        }
        let scale: Vec<f64> = (0..PARAM_COUNT)
            .map(|k| jac.column(k).norm().max(SCALE_FLOOR))
            .collect();

        // Inner loop: grow damping until the step reduces the robust cost.
        loop {
            if lambda > LAMBDA_MAX {
                break 'outer;
            }
            let Some(step) = solve_damped_step(&jac, &rw, lambda, &scale) else {
                lambda *= LAMBDA_UP;
                continue;
            };

            let arr = p.to_array();
            let candidate = bounds.clamp(&Params::new(arr[0] + step[0], arr[1] + step[1], arr[2] + step[2]));
            let r_new = objective.residuals(&candidate);
            let cost_new = if r_new.iter().all(|v| v.is_finite()) {
                soft_l1_cost(&r_new, opts.f_scale)
            } else {
                f64::INFINITY
            };

            if cost_new < cost {
                let moved: f64 = candidate
                    .to_array()
                    .iter()
                    .zip(arr)
                    .zip(&scale)
                    .map(|((a, b), d)| ((a - b) * d).powi(2))
                    .sum::<f64>()
                    .sqrt();
                let size: f64 = arr
                    .iter()
                    .zip(&scale)
                    .map(|(a, d)| (a * d).powi(2))
                    .sum::<f64>()
                    .sqrt();
                let rel_drop = (cost - cost_new) / cost.max(f64::MIN_POSITIVE);

                p = candidate;
                r = r_new;
                cost = cost_new;
                lambda = (lambda * LAMBDA_DOWN).max(LAMBDA_MIN);

                if rel_drop < opts.ftol || moved <= opts.xtol * (opts.xtol + size) {
                    converged = true;
                    break 'outer;
                }
                break;
            }

            lambda *= LAMBDA_UP;
        }

        tracing::debug!(iteration = iterations, cost, lambda, "refinement step accepted");
    }

    Ok(RefineResult {
        params: p,
        robust_cost: cost,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LossKind, Observations};
    use crate::math::linspace;
    use crate::models::CurveModel;

    fn synthetic(p: &Params, n: usize) -> Observations {
        let model = CurveModel::default();
        let t = linspace(6.0, 60.0, n);
        let (x, y) = model.predict(&t, p);
        Observations::new(t, x, y).unwrap()
    }

    #[test]
    fn converges_from_nearby_start() {
        let truth = Params::new(28.0, 0.021, 54.9);
        let obs = synthetic(&truth, 80);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Positional);

        let start = Params::new(27.0, 0.018, 53.5);
        let res = refine(&obj, start, &ParamBounds::default(), &RefineOptions::default()).unwrap();

        assert!((res.params.theta_deg - truth.theta_deg).abs() < 1e-4, "{:?}", res.params);
        assert!((res.params.m - truth.m).abs() < 1e-6, "{:?}", res.params);
        assert!((res.params.x - truth.x).abs() < 1e-4, "{:?}", res.params);
        assert!(obj.loss(&res.params) < obj.loss(&start));
    }

    #[test]
    fn robust_to_a_gross_outlier() {
        let truth = Params::new(20.0, -0.01, 30.0);
        let model = CurveModel::default();
        let t = linspace(6.0, 60.0, 60);
        let (mut x, y) = model.predict(&t, &truth);
        x[17] += 500.0;
        let obs = Observations::new(t, x, y).unwrap();
        let obj = Objective::new(model, &obs, LossKind::Positional);

        let res = refine(&obj, Params::new(21.0, -0.008, 31.0), &ParamBounds::default(), &RefineOptions::default())
            .unwrap();
        assert!((res.params.x - truth.x).abs() < 0.5, "{:?}", res.params);
        assert!((res.params.theta_deg - truth.theta_deg).abs() < 0.5, "{:?}", res.params);
    }

    #[test]
    fn stays_inside_bounds() {
        // Data generated just outside the box pulls X against its upper bound.
        let truth = Params::new(25.0, 0.0, 105.0);
        let obs = synthetic(&truth, 40);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Positional);
        let bounds = ParamBounds::default();
        let res = refine(&obj, Params::new(25.0, 0.0, 90.0), &bounds, &RefineOptions::default()).unwrap();
        assert!(bounds.contains(&res.params));
        assert!(res.params.x > 99.0, "{:?}", res.params);
    }

    #[test]
    fn rejects_invalid_scale() {
        let obs = synthetic(&Params::new(10.0, 0.0, 10.0), 5);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Positional);
        let opts = RefineOptions {
            f_scale: 0.0,
            ..RefineOptions::default()
        };
        let err = refine(&obj, Params::new(10.0, 0.0, 10.0), &ParamBounds::default(), &opts).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
    }
}
