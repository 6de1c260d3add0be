//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs the log subscriber
//! - loads data and runs the two-stage fit
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, EvalArgs, FitArgs, PlotArgs, SynthArgs};
use crate::domain::{FitConfig, ParamBounds, Params, PointResidual};
use crate::error::AppError;
use crate::fit::Objective;
use crate::models::CurveModel;
use crate::plot::{HistoryChart, SvgChart};

pub mod pipeline;

/// Curve samples used for plots of an in-memory fit.
const PLOT_CURVE_POINTS: usize = 1000;

/// Entry point for the `curvefit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Eval(args) => handle_eval(args),
        Command::Synth(args) => handle_synth(args),
        Command::Plot(args) => handle_plot(args),
    }
}

/// Log to stderr; stdout is reserved for results.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed (e.g. when embedded); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;
    let params = &run.outcome.params;

    println!("{}", crate::report::format_report(params, run.outcome.loss, config.precision));
    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest.stats, &run.outcome, config.precision)
    );
    if config.top_n > 0 {
        println!(
            "{}",
            crate::report::format_residual_table("Largest residuals (L1):", &run.largest)
        );
    }

    let (t_min, t_max) = run.ingest.observations.t_range();
    let curve: Vec<(f64, f64)> = run
        .model
        .sample(params, t_min, t_max, PLOT_CURVE_POINTS)
        .into_iter()
        .map(|(_, x, y)| (x, y))
        .collect();
    let observed: Vec<(f64, f64)> = run.ingest.observations.points().collect();
    let highlights = observed_points(&run.largest);

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &observed,
            &curve,
            &highlights,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional outputs.
    if let Some(path) = &config.report_path {
        crate::report::write_report(path, params, run.outcome.loss, config.precision)?;
        tracing::info!(path = %path.display(), "wrote report");
    }
    if let Some(path) = &config.export_results {
        crate::io::write_results_csv(path, &run.residuals)?;
        tracing::info!(path = %path.display(), "wrote per-point results");
    }
    if let Some(path) = &config.export_fit {
        let fit = crate::io::build_fit_file(
            &run.model,
            &run.ingest.observations,
            config.loss,
            &run.outcome,
            config.precision,
        );
        crate::io::write_fit_json(path, &fit)?;
        tracing::info!(path = %path.display(), "wrote fit JSON");
    }
    if let Some(path) = &config.plot_svg {
        let title = crate::report::equation_string(params, 3);
        SvgChart {
            title: &title,
            curve: &curve,
            points: &observed,
            highlights: &highlights,
            width: 1000,
            height: 800,
        }
        .write(path)?;
    }
    if let Some(path) = &config.plot_history {
        HistoryChart {
            stages: &run.outcome.history,
            width: 800,
            height: 500,
        }
        .write(path)?;
    }

    Ok(())
}

fn handle_eval(args: EvalArgs) -> Result<(), AppError> {
    let params = Params::new(args.theta, args.m, args.x);
    if !params.is_finite() {
        return Err(AppError::input("Parameters must be finite."));
    }
    if !ParamBounds::default().contains(&params) {
        tracing::warn!(?params, "parameters lie outside the search box");
    }

    let ingest = crate::io::load_observations(&args.data.csv, args.data.t_min, args.data.t_max)?;
    let model = CurveModel::default();
    let objective = Objective::new(model, &ingest.observations, args.data.loss);
    let loss = objective.loss(&params);
    if !loss.is_finite() {
        return Err(AppError::fit("Loss is not finite for these parameters."));
    }

    let p = args.precision;
    println!("Points: {}", ingest.stats.n_points);
    println!("Loss ({}): {loss:.p$}", args.data.loss.display_name());
    println!("{}", crate::report::equation_string(&params, p));

    if let Some(path) = &args.export {
        let residuals = crate::report::compute_residuals(&model, &ingest.observations, &params)?;
        crate::io::write_results_csv(path, &residuals)?;
        tracing::info!(path = %path.display(), "wrote per-point results");
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = crate::data::SynthConfig {
        params: Params::new(args.theta, args.m, args.x),
        n_points: args.count,
        t_min: args.t_min,
        t_max: args.t_max,
        noise_sigma: args.noise,
        outlier_prob: args.outlier_prob,
        outlier_magnitude: args.outlier_size,
        seed: args.seed,
    };
    let obs = crate::data::generate(&CurveModel::default(), &config)?;
    crate::data::write_xy_csv(&args.out, &obs)?;
    println!("Wrote {} points to {}", obs.len(), args.out.display());
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fit = crate::io::read_fit_json(&args.fit)?;

    println!("{}", fit.equation);
    println!("Loss ({}): {}", fit.loss_kind.display_name(), fit.loss);
    println!(
        "{}",
        crate::plot::render_ascii_plot_from_fit_file(&fit, args.width, args.height)
    );

    if let Some(path) = &args.svg {
        let curve: Vec<(f64, f64)> = fit.grid.x.iter().copied().zip(fit.grid.y.iter().copied()).collect();
        SvgChart {
            title: &fit.equation,
            curve: &curve,
            points: &fit.observed,
            highlights: &[],
            width: 1000,
            height: 800,
        }
        .write(path)?;
    }
    Ok(())
}

/// Map parsed CLI flags onto the pipeline's plain config.
pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        csv_path: args.data.csv.clone(),
        t_min: args.data.t_min,
        t_max: args.data.t_max,
        loss: args.data.loss,
        seed: args.seed,
        de_maxiter: args.de_maxiter,
        de_popsize: args.de_popsize,
        de_tol: args.de_tol,
        refine: !args.no_refine,
        refine_max_iter: args.refine_max_iter,
        f_scale: args.f_scale,
        precision: args.precision,
        top_n: args.top,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        report_path: args.report.clone(),
        export_results: args.export.clone(),
        export_fit: args.export_fit.clone(),
        plot_svg: args.plot_svg.clone(),
        plot_history: args.plot_history.clone(),
    }
}

fn observed_points(rows: &[PointResidual]) -> Vec<(f64, f64)> {
    rows.iter().map(|r| (r.x_obs, r.y_obs)).collect()
}
