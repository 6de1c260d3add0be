//! Loss evaluation for a fixed set of observations.
//!
//! The search stages see the problem through two views:
//!
//! - a scalar L1 loss (differential evolution, acceptance checks)
//! - a signed residual vector plus its Jacobian (soft-L1 refinement)
//!
//! Residuals are laid out as `[x_pred − x_obs …, y_pred − y_obs …]` (length `2n`).

use nalgebra::DMatrix;

use crate::domain::{LossKind, Observations, PARAM_COUNT, Params};
use crate::math::linspace;
use crate::models::CurveModel;

/// Lower/upper limits on the dense curve sample used by `LossKind::Nearest`.
const NEAREST_MIN_SAMPLES: usize = 500;
const NEAREST_MAX_SAMPLES: usize = 5000;

/// Finite-difference steps for `(θ°, M, X)` when no analytic Jacobian applies.
const FD_STEPS: [f64; PARAM_COUNT] = [1e-4, 1e-6, 1e-4];

/// Summed L1 distance between predicted and observed coordinates.
///
/// Returns `+∞` if any prediction is non-finite or the slices differ in length,
/// so that callers can rank the candidate last without special-casing NaN.
pub fn l1_loss(x_pred: &[f64], y_pred: &[f64], x_obs: &[f64], y_obs: &[f64]) -> f64 {
    let n = x_obs.len();
    if x_pred.len() != n || y_pred.len() != n || y_obs.len() != n {
        return f64::INFINITY;
    }
    let total: f64 = x_pred
        .iter()
        .zip(y_pred)
        .zip(x_obs.iter().zip(y_obs))
        .map(|((xp, yp), (xo, yo))| (xp - xo).abs() + (yp - yo).abs())
        .sum();
    if total.is_finite() { total } else { f64::INFINITY }
}

/// The fitting objective: model + observations + matching mode.
#[derive(Debug, Clone)]
pub struct Objective<'a> {
    model: CurveModel,
    obs: &'a Observations,
    kind: LossKind,
    /// Dense `t` sample for nearest-point matching (empty for positional).
    dense_t: Vec<f64>,
}

impl<'a> Objective<'a> {
    pub fn new(model: CurveModel, obs: &'a Observations, kind: LossKind) -> Self {
        let dense_t = match kind {
            LossKind::Positional => Vec::new(),
            LossKind::Nearest => {
                let (t0, t1) = obs.t_range();
                let n = (obs.len() * 4).clamp(NEAREST_MIN_SAMPLES, NEAREST_MAX_SAMPLES);
                if t1 > t0 { linspace(t0, t1, n) } else { vec![t0] }
            }
        };
        Self {
            model,
            obs,
            kind,
            dense_t,
        }
    }

    pub fn model(&self) -> &CurveModel {
        &self.model
    }

    pub fn observations(&self) -> &Observations {
        self.obs
    }

    pub fn kind(&self) -> LossKind {
        self.kind
    }

    /// Scalar loss at `p` (`+∞` if the curve is non-finite anywhere it is sampled).
    pub fn loss(&self, p: &Params) -> f64 {
        match self.kind {
            LossKind::Positional => {
                let (xp, yp) = self.model.predict(self.obs.t(), p);
                l1_loss(&xp, &yp, self.obs.x_obs(), self.obs.y_obs())
            }
            LossKind::Nearest => {
                let Some(curve) = self.dense_curve(p) else {
                    return f64::INFINITY;
                };
                let total: f64 = self
                    .obs
                    .points()
                    .map(|(xo, yo)| nearest(&curve, xo, yo).2)
                    .sum();
                total / self.obs.len() as f64
            }
        }
    }

    /// Signed residuals at `p`, length `2n`.
    pub fn residuals(&self, p: &Params) -> Vec<f64> {
        let n = self.obs.len();
        let mut out = vec![0.0; 2 * n];
        match self.kind {
            LossKind::Positional => {
                let (xp, yp) = self.model.predict(self.obs.t(), p);
                for i in 0..n {
                    out[i] = xp[i] - self.obs.x_obs()[i];
                    out[n + i] = yp[i] - self.obs.y_obs()[i];
                }
            }
            LossKind::Nearest => match self.dense_curve(p) {
                Some(curve) => {
                    for (i, (xo, yo)) in self.obs.points().enumerate() {
                        let (dx, dy, _) = nearest(&curve, xo, yo);
                        out[i] = dx;
                        out[n + i] = dy;
                    }
                }
                None => out.fill(f64::NAN),
            },
        }
        out
    }

    /// Jacobian of `residuals` with respect to `(θ°, M, X)`, shape `2n × 3`.
    ///
    /// Positional matching uses the analytic model derivatives. Nearest-point
    /// matching is piecewise (the matched sample can jump), so it falls back to
    /// central differences.
    pub fn jacobian(&self, p: &Params) -> DMatrix<f64> {
        let n = self.obs.len();
        let mut jac = DMatrix::<f64>::zeros(2 * n, PARAM_COUNT);
        match self.kind {
            LossKind::Positional => {
                for (i, &t) in self.obs.t().iter().enumerate() {
                    let d = self.model.jacobian_point(t, p);
                    for k in 0..PARAM_COUNT {
                        jac[(i, k)] = d[0][k];
                        jac[(n + i, k)] = d[1][k];
                    }
                }
            }
            LossKind::Nearest => {
                for k in 0..PARAM_COUNT {
                    let mut hi = p.to_array();
                    let mut lo = p.to_array();
                    hi[k] += FD_STEPS[k];
                    lo[k] -= FD_STEPS[k];
                    let r_hi = self.residuals(&Params::from(hi));
                    let r_lo = self.residuals(&Params::from(lo));
                    for row in 0..2 * n {
                        jac[(row, k)] = (r_hi[row] - r_lo[row]) / (2.0 * FD_STEPS[k]);
                    }
                }
            }
        }
        jac
    }

    fn dense_curve(&self, p: &Params) -> Option<Vec<(f64, f64)>> {
        let (xs, ys) = self.model.predict(&self.dense_t, p);
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return None;
        }
        Some(xs.into_iter().zip(ys).collect())
    }
}

/// Signed offset `(dx, dy)` from `(xo, yo)` to the closest curve sample, plus its L1 length.
fn nearest(curve: &[(f64, f64)], xo: f64, yo: f64) -> (f64, f64, f64) {
    let mut best = (f64::NAN, f64::NAN, f64::INFINITY);
    for &(xc, yc) in curve {
        let dx = xc - xo;
        let dy = yc - yo;
        let d = dx.abs() + dy.abs();
        if d < best.2 {
            best = (dx, dy, d);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(p: &Params, n: usize) -> Observations {
        let model = CurveModel::default();
        let t = linspace(6.0, 60.0, n);
        let (x, y) = model.predict(&t, p);
        Observations::new(t, x, y).unwrap()
    }

    #[test]
    fn loss_is_zero_at_generating_params() {
        let p = Params::new(28.0, 0.02, 55.0);
        let obs = synthetic(&p, 50);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Positional);
        assert_eq!(obj.loss(&p), 0.0);
        assert!(obj.residuals(&p).iter().all(|r| *r == 0.0));
    }

    #[test]
    fn l1_loss_of_mismatched_lengths_is_infinite() {
        let obs = [1.0, 2.0, 3.0];
        assert_eq!(l1_loss(&[1.0, 2.0], &[1.0, 2.0, 3.0], &obs, &obs), f64::INFINITY);
        assert_eq!(l1_loss(&obs, &obs, &obs, &[1.0]), f64::INFINITY);
        assert_eq!(l1_loss(&[1.5, 2.0, 3.0], &obs, &obs, &obs), 0.5);
    }

    #[test]
    fn loss_is_positive_away_from_truth() {
        let p = Params::new(28.0, 0.02, 55.0);
        let obs = synthetic(&p, 50);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Positional);
        let off = Params::new(28.0, 0.02, 56.0);
        // Shifting X by 1 moves every x prediction by exactly 1.
        assert!((obj.loss(&off) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn loss_equals_l1_norm_of_residuals() {
        let p = Params::new(28.0, 0.02, 55.0);
        let obs = synthetic(&p, 30);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Positional);
        let q = Params::new(20.0, -0.01, 40.0);
        let l1: f64 = obj.residuals(&q).iter().map(|r| r.abs()).sum();
        assert!((obj.loss(&q) - l1).abs() < 1e-9);
    }

    #[test]
    fn non_finite_prediction_is_infinite_loss() {
        let p = Params::new(28.0, 0.02, 55.0);
        let obs = synthetic(&p, 10);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Positional);
        assert_eq!(obj.loss(&Params::new(28.0, 1e6, 55.0)), f64::INFINITY);
        assert_eq!(obj.loss(&Params::new(f64::NAN, 0.0, 55.0)), f64::INFINITY);
    }

    #[test]
    fn residual_layout_is_x_then_y() {
        let p = Params::new(0.0, 0.0, 0.0);
        let obs = synthetic(&p, 3);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Positional);
        let r = obj.residuals(&Params::new(0.0, 0.0, 2.0));
        assert_eq!(r.len(), 6);
        assert!(r[..3].iter().all(|v| (v - 2.0).abs() < 1e-12));
        assert!(r[3..].iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn nearest_loss_is_small_at_truth() {
        let p = Params::new(28.0, 0.02, 55.0);
        let obs = synthetic(&p, 40);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Nearest);
        // Observations sit on the curve; only sampling resolution separates them.
        assert!(obj.loss(&p) < 0.25);
        assert!(obj.loss(&Params::new(10.0, -0.03, 20.0)) > 1.0);
    }

    #[test]
    fn analytic_jacobian_matches_residual_differences() {
        let p = Params::new(28.0, 0.02, 55.0);
        let obs = synthetic(&p, 12);
        let obj = Objective::new(CurveModel::default(), &obs, LossKind::Positional);
        let q = Params::new(31.0, 0.01, 50.0);
        let jac = obj.jacobian(&q);
        for k in 0..PARAM_COUNT {
            let mut hi = q.to_array();
            let mut lo = q.to_array();
            hi[k] += FD_STEPS[k];
            lo[k] -= FD_STEPS[k];
            let r_hi = obj.residuals(&Params::from(hi));
            let r_lo = obj.residuals(&Params::from(lo));
            for row in 0..24 {
                let fd = (r_hi[row] - r_lo[row]) / (2.0 * FD_STEPS[k]);
                assert!((jac[(row, k)] - fd).abs() < 1e-4);
            }
        }
    }
}
