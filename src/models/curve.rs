//! Closed-form evaluation of the parametric curve.
//!
//! ```text
//! x(t) = t·cos(θ) − e^{M·|t|}·sin(ω·t)·sin(θ) + X
//! y(t) = c + t·sin(θ) + e^{M·|t|}·sin(ω·t)·cos(θ)
//! ```
//!
//! with `c = 42` and `ω = 0.3`. θ is supplied in degrees.
//!
//! Numerical notes:
//! - within the parameter box `|M·t| ≤ 0.05 · 60 = 3`, so the exponential term
//!   stays below `e³ ≈ 20` and evaluation is always finite
//! - outside the box nothing is clamped; non-finite output is left for callers
//!   to reject

use serde::{Deserialize, Serialize};

use crate::domain::{PARAM_COUNT, Params};

pub const DEFAULT_Y_OFFSET: f64 = 42.0;
pub const DEFAULT_FREQUENCY: f64 = 0.3;

/// Fixed model constants. The free parameters live in `Params`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveModel {
    pub y_offset: f64,
    pub frequency: f64,
}

impl Default for CurveModel {
    fn default() -> Self {
        Self {
            y_offset: DEFAULT_Y_OFFSET,
            frequency: DEFAULT_FREQUENCY,
        }
    }
}

/// Per-parameter-vector trig terms, computed once per evaluation batch.
#[derive(Debug, Clone, Copy)]
struct Angle {
    cos: f64,
    sin: f64,
}

impl Angle {
    fn of(p: &Params) -> Self {
        let (sin, cos) = p.theta_deg.to_radians().sin_cos();
        Self { cos, sin }
    }
}

impl CurveModel {
    /// Evaluate `(x(t), y(t))` at a single `t`.
    pub fn point(&self, t: f64, p: &Params) -> (f64, f64) {
        self.point_with(t, p, Angle::of(p))
    }

    /// Evaluate the curve over a `t` slice.
    pub fn predict(&self, t: &[f64], p: &Params) -> (Vec<f64>, Vec<f64>) {
        let angle = Angle::of(p);
        t.iter().map(|&ti| self.point_with(ti, p, angle)).unzip()
    }

    /// Partial derivatives of `(x, y)` at `t` with respect to `(θ, M, X)`.
    ///
    /// Row 0 is `∂x`, row 1 is `∂y`. The θ column is per degree.
    pub fn jacobian_point(&self, t: f64, p: &Params) -> [[f64; PARAM_COUNT]; 2] {
        let Angle { cos, sin } = Angle::of(p);
        let abs_t = t.abs();
        let wave = (p.m * abs_t).exp() * (self.frequency * t).sin();
        let deg = std::f64::consts::PI / 180.0;

        [
            [deg * (-t * sin - wave * cos), -abs_t * wave * sin, 1.0],
            [deg * (t * cos - wave * sin), abs_t * wave * cos, 0.0],
        ]
    }

    /// Sample `n` points of the curve uniformly over `[t_min, t_max]`.
    pub fn sample(&self, p: &Params, t_min: f64, t_max: f64, n: usize) -> Vec<(f64, f64, f64)> {
        let t = crate::math::linspace(t_min, t_max, n.max(2));
        let angle = Angle::of(p);
        t.into_iter()
            .map(|ti| {
                let (x, y) = self.point_with(ti, p, angle);
                (ti, x, y)
            })
            .collect()
    }

    fn point_with(&self, t: f64, p: &Params, angle: Angle) -> (f64, f64) {
        let wave = (p.m * t.abs()).exp() * (self.frequency * t).sin();
        let x = t * angle.cos - wave * angle.sin + p.x;
        let y = self.y_offset + t * angle.sin + wave * angle.cos;
        (x, y)
    }
}
