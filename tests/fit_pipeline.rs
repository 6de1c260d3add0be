//! End-to-end tests of the fit pipeline.
//!
//! Each test writes a synthetic CSV to the temp directory, runs the same code
//! path as `curvefit fit`, and checks the recovered parameters and outputs.

use std::path::PathBuf;

use approx::assert_abs_diff_eq;

use curve_fit::app::pipeline::run_fit;
use curve_fit::data::{SynthConfig, generate, write_xy_csv};
use curve_fit::domain::{FitConfig, LossKind, ParamBounds, Params, StageMethod};
use curve_fit::error::{EXIT_INPUT, EXIT_NO_DATA};
use curve_fit::io::{build_fit_file, read_fit_json, write_fit_json};
use curve_fit::models::CurveModel;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("curvefit-it-{}-{name}", std::process::id()))
}

fn write_synthetic(name: &str, cfg: &SynthConfig) -> PathBuf {
    let path = temp_path(name);
    let obs = generate(&CurveModel::default(), cfg).unwrap();
    write_xy_csv(&path, &obs).unwrap();
    path
}

fn config(csv_path: PathBuf) -> FitConfig {
    FitConfig {
        csv_path,
        t_min: 6.0,
        t_max: 60.0,
        loss: LossKind::Positional,
        seed: 42,
        de_maxiter: 500,
        de_popsize: 10,
        de_tol: 1e-4,
        refine: true,
        refine_max_iter: 100,
        f_scale: 1.0,
        precision: 6,
        top_n: 5,
        plot: false,
        plot_width: 80,
        plot_height: 20,
        report_path: None,
        export_results: None,
        export_fit: None,
        plot_svg: None,
        plot_history: None,
    }
}

#[test]
fn recovers_parameters_from_clean_csv() {
    let truth = Params::new(28.0, 0.021, 54.9);
    let csv = write_synthetic(
        "clean.csv",
        &SynthConfig {
            params: truth,
            n_points: 300,
            ..SynthConfig::default()
        },
    );

    let run = run_fit(&config(csv.clone())).unwrap();
    let _ = std::fs::remove_file(&csv);

    assert_eq!(run.ingest.stats.n_points, 300);
    assert_abs_diff_eq!(run.outcome.params.theta_deg, truth.theta_deg, epsilon = 1e-3);
    assert_abs_diff_eq!(run.outcome.params.m, truth.m, epsilon = 1e-4);
    assert_abs_diff_eq!(run.outcome.params.x, truth.x, epsilon = 1e-2);
    assert!(run.outcome.loss < 1e-1);
    assert_eq!(run.outcome.history[0].method, StageMethod::DifferentialEvolution);
}

#[test]
fn tolerates_noise_and_outliers() {
    let truth = Params::new(35.0, -0.01, 20.0);
    let csv = write_synthetic(
        "noisy.csv",
        &SynthConfig {
            params: truth,
            n_points: 200,
            noise_sigma: 0.05,
            outlier_prob: 0.05,
            outlier_magnitude: 10.0,
            seed: 3,
            ..SynthConfig::default()
        },
    );

    let run = run_fit(&config(csv.clone())).unwrap();
    let _ = std::fs::remove_file(&csv);

    assert!(ParamBounds::default().contains(&run.outcome.params));
    assert_abs_diff_eq!(run.outcome.params.theta_deg, truth.theta_deg, epsilon = 0.5);
    assert_abs_diff_eq!(run.outcome.params.x, truth.x, epsilon = 1.0);
    // The outliers dominate the largest residuals.
    assert!(run.largest[0].l1() > 5.0);
}

#[test]
fn fixed_seed_is_deterministic() {
    let csv = write_synthetic(
        "determinism.csv",
        &SynthConfig {
            params: Params::new(12.0, 0.04, 80.0),
            n_points: 80,
            noise_sigma: 0.2,
            seed: 11,
            ..SynthConfig::default()
        },
    );

    let a = run_fit(&config(csv.clone())).unwrap();
    let b = run_fit(&config(csv.clone())).unwrap();
    let _ = std::fs::remove_file(&csv);

    assert_eq!(a.outcome, b.outcome);
}

#[test]
fn fit_json_round_trips_through_disk() {
    let csv = write_synthetic(
        "json.csv",
        &SynthConfig {
            params: Params::new(45.0, 0.0, 5.0),
            n_points: 60,
            ..SynthConfig::default()
        },
    );
    let run = run_fit(&config(csv.clone())).unwrap();
    let _ = std::fs::remove_file(&csv);

    let fit = build_fit_file(&run.model, &run.ingest.observations, LossKind::Positional, &run.outcome, 6);
    let path = temp_path("fit.json");
    write_fit_json(&path, &fit).unwrap();
    let back = read_fit_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(back.params, run.outcome.params);
    assert_eq!(back.history, run.outcome.history);
    assert_eq!(back.observed.len(), 60);
}

#[test]
fn nearest_loss_stays_in_bounds() {
    let csv = write_synthetic(
        "nearest.csv",
        &SynthConfig {
            params: Params::new(20.0, 0.01, 30.0),
            n_points: 40,
            ..SynthConfig::default()
        },
    );
    let mut cfg = config(csv.clone());
    cfg.loss = LossKind::Nearest;
    cfg.de_maxiter = 40;

    let run = run_fit(&cfg).unwrap();
    let _ = std::fs::remove_file(&csv);

    assert!(run.outcome.loss.is_finite());
    assert!(ParamBounds::default().contains(&run.outcome.params));
    for stage in &run.outcome.history {
        assert!(stage.loss >= run.outcome.loss || !stage.accepted);
    }
}

#[test]
fn malformed_csv_is_rejected_before_fitting() {
    let path = temp_path("malformed.csv");
    std::fs::write(&path, "x,y\n1.0,2.0\nnot-a-number,3.0\n").unwrap();
    let err = run_fit(&config(path.clone())).unwrap_err();
    let _ = std::fs::remove_file(&path);

    assert_eq!(err.exit_code(), EXIT_INPUT);
    assert!(err.message().contains("line 3"));
}

#[test]
fn empty_csv_is_no_data() {
    let path = temp_path("empty.csv");
    std::fs::write(&path, "x,y\n").unwrap();
    let err = run_fit(&config(path.clone())).unwrap_err();
    let _ = std::fs::remove_file(&path);

    assert_eq!(err.exit_code(), EXIT_NO_DATA);
}
