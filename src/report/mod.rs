//! Reporting utilities: residuals, rankings, and formatted output.

pub mod format;

pub use format::*;

use crate::domain::{Observations, Params, PointResidual};
use crate::error::AppError;
use crate::models::CurveModel;

/// Compute fitted values and residuals for each observation.
pub fn compute_residuals(
    model: &CurveModel,
    obs: &Observations,
    params: &Params,
) -> Result<Vec<PointResidual>, AppError> {
    let (x_fit, y_fit) = model.predict(obs.t(), params);
    let mut out = Vec::with_capacity(obs.len());
    for (i, &t) in obs.t().iter().enumerate() {
        if !(x_fit[i].is_finite() && y_fit[i].is_finite()) {
            return Err(AppError::fit("Non-finite model prediction during residual computation."));
        }
        out.push(PointResidual {
            index: i,
            t,
            x_obs: obs.x_obs()[i],
            y_obs: obs.y_obs()[i],
            x_fit: x_fit[i],
            y_fit: y_fit[i],
        });
    }
    Ok(out)
}

/// The `top_n` points with the largest L1 residual, largest first.
///
/// Ties keep input order.
pub fn rank_largest_residuals(residuals: &[PointResidual], top_n: usize) -> Vec<PointResidual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| b.l1().partial_cmp(&a.l1()).unwrap_or(std::cmp::Ordering::Equal));
    sorted.truncate(top_n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_residuals_basic() {
        let model = CurveModel::default();
        let p = Params::new(0.0, 0.0, 0.0);
        // At θ=0, M=0, X=0 the curve is (t, 42 + sin(0.3t)).
        let t6 = 42.0 + 1.8_f64.sin();
        let obs = Observations::new(vec![6.0, 60.0], vec![6.0, 61.0], vec![t6, 40.0]).unwrap();

        let residuals = compute_residuals(&model, &obs, &p).unwrap();
        assert_eq!(residuals.len(), 2);
        assert!(residuals[0].l1() < 1e-12);
        assert!((residuals[1].dx() - (-1.0)).abs() < 1e-12);
        assert!((residuals[1].dy() - (2.0 + 18.0_f64.sin())).abs() < 1e-12);
    }

    #[test]
    fn rank_largest_residuals_basic() {
        let row = |index: usize, dx: f64| PointResidual {
            index,
            t: 6.0 + index as f64,
            x_obs: 0.0,
            y_obs: 0.0,
            x_fit: dx,
            y_fit: 0.0,
        };
        let residuals = vec![row(0, 0.5), row(1, -3.0), row(2, 2.0), row(3, 0.0)];

        let top = rank_largest_residuals(&residuals, 2);
        let ids: Vec<usize> = top.iter().map(|r| r.index).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(rank_largest_residuals(&residuals, 10).len(), 4);
    }
}
