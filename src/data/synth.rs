//! Synthetic `(x, y)` datasets drawn from the curve model.
//!
//! Points are evaluated on the same `linspace(t_min, t_max, n)` grid that the
//! fitter assumes, then perturbed with Gaussian noise and occasional gross
//! outliers (a jump of `±outlier_magnitude` on one coordinate).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Observations, ParamBounds, Params};
use crate::error::AppError;
use crate::math::linspace;
use crate::models::CurveModel;

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub params: Params,
    pub n_points: usize,
    pub t_min: f64,
    pub t_max: f64,
    /// Standard deviation of the Gaussian noise added to both coordinates.
    pub noise_sigma: f64,
    pub outlier_prob: f64,
    pub outlier_magnitude: f64,
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            params: Params::new(28.0, 0.02, 55.0),
            n_points: 1500,
            t_min: 6.0,
            t_max: 60.0,
            noise_sigma: 0.0,
            outlier_prob: 0.0,
            outlier_magnitude: 10.0,
            seed: 42,
        }
    }
}

impl SynthConfig {
    fn validate(&self) -> Result<(), AppError> {
        if self.n_points == 0 {
            return Err(AppError::input("Sample count must be > 0."));
        }
        if !(self.t_min.is_finite() && self.t_max.is_finite() && self.t_max > self.t_min) {
            return Err(AppError::input("Invalid t range for sample generation."));
        }
        if !(self.noise_sigma.is_finite() && self.noise_sigma >= 0.0) {
            return Err(AppError::input("Noise sigma must be finite and >= 0."));
        }
        if !(0.0..1.0).contains(&self.outlier_prob) {
            return Err(AppError::input("Outlier probability must be in [0, 1)."));
        }
        if !(self.outlier_magnitude.is_finite() && self.outlier_magnitude >= 0.0) {
            return Err(AppError::input("Outlier magnitude must be finite and >= 0."));
        }
        if !self.params.is_finite() {
            return Err(AppError::input("Synthetic parameters must be finite."));
        }
        if !ParamBounds::default().contains(&self.params) {
            tracing::warn!(params = ?self.params, "synthetic parameters lie outside the default search box");
        }
        Ok(())
    }
}

/// Generate a synthetic dataset. Same config and seed, same points.
pub fn generate(model: &CurveModel, config: &SynthConfig) -> Result<Observations, AppError> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sigma)
        .map_err(|e| AppError::input(format!("Noise distribution error: {e}")))?;

    let t = linspace(config.t_min, config.t_max, config.n_points);
    let (mut x, mut y) = model.predict(&t, &config.params);

    let mut outliers = 0usize;
    for i in 0..t.len() {
        x[i] += noise.sample(&mut rng);
        y[i] += noise.sample(&mut rng);

        if rng.r#gen::<f64>() < config.outlier_prob {
            outliers += 1;
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let jump = sign * config.outlier_magnitude;
            if rng.gen_bool(0.5) {
                x[i] += jump;
            } else {
                y[i] += jump;
            }
        }
    }

    tracing::info!(
        n_points = t.len(),
        outliers,
        noise_sigma = config.noise_sigma,
        seed = config.seed,
        "generated synthetic dataset"
    );

    Observations::new(t, x, y)
}

/// Write observations as an `x,y` CSV (the format `fit` reads).
pub fn write_xy_csv(path: &Path, obs: &Observations) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    let write_err = |e: std::io::Error| AppError::input(format!("Failed to write CSV '{}': {e}", path.display()));

    writeln!(out, "x,y").map_err(write_err)?;
    for (x, y) in obs.points() {
        writeln!(out, "{x},{y}").map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noiseless_sample_lies_on_the_curve() {
        let model = CurveModel::default();
        let cfg = SynthConfig {
            n_points: 25,
            ..SynthConfig::default()
        };
        let obs = generate(&model, &cfg).unwrap();
        let (x, y) = model.predict(obs.t(), &cfg.params);
        assert_eq!(obs.x_obs(), x.as_slice());
        assert_eq!(obs.y_obs(), y.as_slice());
    }

    #[test]
    fn same_seed_same_points() {
        let model = CurveModel::default();
        let cfg = SynthConfig {
            n_points: 50,
            noise_sigma: 0.5,
            outlier_prob: 0.1,
            ..SynthConfig::default()
        };
        let a = generate(&model, &cfg).unwrap();
        let b = generate(&model, &cfg).unwrap();
        assert_eq!(a.x_obs(), b.x_obs());
        assert_eq!(a.y_obs(), b.y_obs());

        let c = generate(&model, &SynthConfig { seed: 7, ..cfg }).unwrap();
        assert_ne!(a.x_obs(), c.x_obs());
    }

    #[test]
    fn rejects_invalid_settings() {
        let model = CurveModel::default();
        for cfg in [
            SynthConfig { n_points: 0, ..SynthConfig::default() },
            SynthConfig { t_min: 10.0, t_max: 5.0, ..SynthConfig::default() },
            SynthConfig { noise_sigma: -1.0, ..SynthConfig::default() },
            SynthConfig { outlier_prob: 1.0, ..SynthConfig::default() },
        ] {
            let err = generate(&model, &cfg).unwrap_err();
            assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
        }
    }

    #[test]
    fn csv_output_reads_back() {
        let model = CurveModel::default();
        let obs = generate(&model, &SynthConfig { n_points: 10, ..SynthConfig::default() }).unwrap();
        let path = std::env::temp_dir().join(format!("curvefit-synth-{}.csv", std::process::id()));
        write_xy_csv(&path, &obs).unwrap();

        let data = crate::io::load_observations(&path, 6.0, 60.0).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(data.observations.x_obs(), obs.x_obs());
        assert_eq!(data.observations.y_obs(), obs.y_obs());
    }
}
