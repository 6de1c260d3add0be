//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::linspace;

/// Number of free parameters in the curve model: `(θ, M, X)`.
pub const PARAM_COUNT: usize = 3;

/// Free parameters of the curve model.
///
/// `theta_deg` is stored in degrees; the model converts to radians internally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub theta_deg: f64,
    pub m: f64,
    pub x: f64,
}

impl Params {
    pub fn new(theta_deg: f64, m: f64, x: f64) -> Self {
        Self { theta_deg, m, x }
    }

    pub fn to_array(self) -> [f64; PARAM_COUNT] {
        [self.theta_deg, self.m, self.x]
    }

    /// Build from a slice of exactly `PARAM_COUNT` values.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [theta_deg, m, x] => Some(Self::new(*theta_deg, *m, *x)),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.theta_deg.is_finite() && self.m.is_finite() && self.x.is_finite()
    }
}

impl From<[f64; PARAM_COUNT]> for Params {
    fn from(v: [f64; PARAM_COUNT]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Closed box constraint on `(θ, M, X)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamBounds {
    /// θ range in degrees.
    pub theta: (f64, f64),
    pub m: (f64, f64),
    pub x: (f64, f64),
}

impl Default for ParamBounds {
    fn default() -> Self {
        Self {
            theta: (0.0, 50.0),
            m: (-0.05, 0.05),
            x: (0.0, 100.0),
        }
    }
}

impl ParamBounds {
    pub fn as_array(&self) -> [(f64, f64); PARAM_COUNT] {
        [self.theta, self.m, self.x]
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for (name, (lo, hi)) in ["theta", "m", "x"].iter().zip(self.as_array()) {
            if !(lo.is_finite() && hi.is_finite() && hi > lo) {
                return Err(AppError::input(format!(
                    "Invalid {name} bounds: [{lo}, {hi}] (must be finite with max > min)."
                )));
            }
        }
        Ok(())
    }

    /// Inclusive membership test. Non-finite parameters are never contained.
    pub fn contains(&self, p: &Params) -> bool {
        p.to_array()
            .iter()
            .zip(self.as_array())
            .all(|(&v, (lo, hi))| v.is_finite() && v >= lo && v <= hi)
    }

    /// Project `p` onto the box.
    pub fn clamp(&self, p: &Params) -> Params {
        Params::new(
            p.theta_deg.clamp(self.theta.0, self.theta.1),
            p.m.clamp(self.m.0, self.m.1),
            p.x.clamp(self.x.0, self.x.1),
        )
    }
}

/// How predicted points are matched to observations in the loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LossKind {
    /// Observation `i` is compared with the curve at `t[i]`; loss is the summed L1 residual.
    Positional,
    /// Each observation is compared with its closest point on a dense curve sample;
    /// loss is the mean of those L1 distances.
    Nearest,
}

impl LossKind {
    pub fn display_name(self) -> &'static str {
        match self {
            LossKind::Positional => "positional L1",
            LossKind::Nearest => "nearest-point L1 (mean)",
        }
    }
}

/// Observed points paired positionally with an assumed `t` grid.
///
/// Invariant: `t`, `x_obs`, and `y_obs` have the same non-zero length and hold
/// finite values only. The fields are private so the invariant cannot be broken
/// after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    t: Vec<f64>,
    x_obs: Vec<f64>,
    y_obs: Vec<f64>,
}

impl Observations {
    pub fn new(t: Vec<f64>, x_obs: Vec<f64>, y_obs: Vec<f64>) -> Result<Self, AppError> {
        if x_obs.len() != y_obs.len() {
            return Err(AppError::no_data(format!(
                "Number of x and y values must be equal (x={}, y={}).",
                x_obs.len(),
                y_obs.len()
            )));
        }
        if t.len() != x_obs.len() {
            return Err(AppError::no_data(format!(
                "Length of t grid ({}) does not match the number of observations ({}).",
                t.len(),
                x_obs.len()
            )));
        }
        if x_obs.is_empty() {
            return Err(AppError::no_data("Dataset is empty."));
        }
        let all_finite = t
            .iter()
            .chain(x_obs.iter())
            .chain(y_obs.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(AppError::input("Observations must contain finite values only."));
        }

        Ok(Self { t, x_obs, y_obs })
    }

    /// Pair `(x, y)` observations with `linspace(t_min, t_max, n)`.
    pub fn from_xy(x_obs: Vec<f64>, y_obs: Vec<f64>, t_min: f64, t_max: f64) -> Result<Self, AppError> {
        if !(t_min.is_finite() && t_max.is_finite() && t_max > t_min) {
            return Err(AppError::input(format!(
                "Invalid t range: min={t_min}, max={t_max} (must be finite and max>min)."
            )));
        }
        let t = linspace(t_min, t_max, x_obs.len());
        Self::new(t, x_obs, y_obs)
    }

    pub fn len(&self) -> usize {
        self.x_obs.len()
    }

    /// Always `false` for a constructed value.
    pub fn is_empty(&self) -> bool {
        self.x_obs.is_empty()
    }

    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn x_obs(&self) -> &[f64] {
        &self.x_obs
    }

    pub fn y_obs(&self) -> &[f64] {
        &self.y_obs
    }

    /// `(first, last)` of the t grid.
    pub fn t_range(&self) -> (f64, f64) {
        (self.t[0], self.t[self.t.len() - 1])
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x_obs.iter().copied().zip(self.y_obs.iter().copied())
    }
}

/// Summary stats about the observations used for fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub n_points: usize,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub x_mean: f64,
    pub y_mean: f64,
    pub t_range: (f64, f64),
}

impl DatasetStats {
    pub fn from_observations(obs: &Observations) -> Self {
        let n = obs.len();
        Self {
            n_points: n,
            x_range: min_max(obs.x_obs()),
            y_range: min_max(obs.y_obs()),
            x_mean: obs.x_obs().iter().sum::<f64>() / n as f64,
            y_mean: obs.y_obs().iter().sum::<f64>() / n as f64,
            t_range: obs.t_range(),
        }
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Which optimization stage produced a `StageRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageMethod {
    DifferentialEvolution,
    SoftL1Refine,
}

impl StageMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            StageMethod::DifferentialEvolution => "differential_evolution",
            StageMethod::SoftL1Refine => "least_squares (soft_l1)",
        }
    }
}

/// One step of the optimization history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub method: StageMethod,
    pub params: Params,
    /// Scalar loss (of the configured `LossKind`) at `params`.
    pub loss: f64,
    /// Whether this stage's result was kept as the current best.
    pub accepted: bool,
}

/// Diagnostics of the global stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStats {
    pub generations: usize,
    pub nfev: usize,
    pub converged: bool,
}

/// Output of the two-stage search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutcome {
    pub params: Params,
    pub loss: f64,
    pub history: Vec<StageRecord>,
    pub evolution: EvolutionStats,
}

/// A per-point fitted result (used for tables, plots, and exports).
#[derive(Debug, Clone, PartialEq)]
pub struct PointResidual {
    pub index: usize,
    pub t: f64,
    pub x_obs: f64,
    pub y_obs: f64,
    pub x_fit: f64,
    pub y_fit: f64,
}

impl PointResidual {
    pub fn dx(&self) -> f64 {
        self.x_fit - self.x_obs
    }

    pub fn dy(&self) -> f64 {
        self.y_fit - self.y_obs
    }

    pub fn l1(&self) -> f64 {
        self.dx().abs() + self.dy().abs()
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub t_min: f64,
    pub t_max: f64,
    pub loss: LossKind,

    pub seed: u64,
    pub de_maxiter: usize,
    pub de_popsize: usize,
    pub de_tol: f64,

    /// Run the soft-L1 refinement after differential evolution.
    pub refine: bool,
    pub refine_max_iter: usize,
    /// Soft-L1 transition scale (residuals above this are treated as outliers).
    pub f_scale: f64,

    pub precision: usize,
    pub top_n: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub report_path: Option<PathBuf>,
    pub export_results: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
    pub plot_svg: Option<PathBuf>,
    pub plot_history: Option<PathBuf>,
}

/// A saved fit (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: String,
    pub model: crate::models::CurveModel,
    pub loss_kind: LossKind,
    pub params: Params,
    pub loss: f64,
    pub equation: String,
    pub history: Vec<StageRecord>,
    pub observed: Vec<(f64, f64)>,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}
