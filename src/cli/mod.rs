//! Command-line parsing for the parametric curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/math code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::LossKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "curvefit", version, about = "Fit (θ, M, X) of a parametric curve to (x, y) data")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the curve to a CSV of (x, y) points, print the summary, and optionally plot/export.
    Fit(FitArgs),
    /// Evaluate the L1 loss of given parameters on a CSV.
    Eval(EvalArgs),
    /// Write a synthetic (x, y) dataset drawn from the curve.
    Synth(SynthArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
}

/// Input data options shared by `fit` and `eval`.
#[derive(Debug, Parser, Clone)]
pub struct DataArgs {
    /// CSV file with `x` and `y` columns.
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// First value of the assumed t grid.
    #[arg(long, default_value_t = 6.0)]
    pub t_min: f64,

    /// Last value of the assumed t grid.
    #[arg(long, default_value_t = 60.0)]
    pub t_max: f64,

    /// How predictions are matched to observations.
    #[arg(long, value_enum, default_value_t = LossKind::Positional)]
    pub loss: LossKind,
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Random seed for the global search.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Maximum differential evolution generations.
    #[arg(long, default_value_t = 500)]
    pub de_maxiter: usize,

    /// Population multiplier (population = popsize × 3).
    #[arg(long, default_value_t = 10)]
    pub de_popsize: usize,

    /// Convergence tolerance on the population's loss spread.
    #[arg(long, default_value_t = 1e-4)]
    pub de_tol: f64,

    /// Skip the soft-L1 refinement stage.
    #[arg(long)]
    pub no_refine: bool,

    /// Maximum refinement iterations.
    #[arg(long, default_value_t = 100)]
    pub refine_max_iter: usize,

    /// Soft-L1 scale: residuals well above this are treated as outliers.
    #[arg(long, default_value_t = 1.0)]
    pub f_scale: f64,

    /// Decimal places in the printed results.
    #[arg(long, default_value_t = 6)]
    pub precision: usize,

    /// Show the N points with the largest residuals.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 30)]
    pub height: usize,

    /// Write the text report (parameters, loss, equation).
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Export per-point results to CSV.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Export the fit (params + history + curve grid) to JSON.
    #[arg(long = "export-fit", value_name = "PATH")]
    pub export_fit: Option<PathBuf>,

    /// Write an SVG chart of the data and fitted curve.
    #[arg(long = "plot-svg", value_name = "PATH")]
    pub plot_svg: Option<PathBuf>,

    /// Write an SVG chart of the loss at each optimization stage.
    #[arg(long = "plot-history", value_name = "PATH")]
    pub plot_history: Option<PathBuf>,
}

/// Options for evaluating fixed parameters.
#[derive(Debug, Parser, Clone)]
pub struct EvalArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// θ in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub theta: f64,

    /// Exponential rate M.
    #[arg(long, allow_hyphen_values = true)]
    pub m: f64,

    /// Horizontal offset X.
    #[arg(long, allow_hyphen_values = true)]
    pub x: f64,

    /// Decimal places in the printed results.
    #[arg(long, default_value_t = 6)]
    pub precision: usize,

    /// Export per-point results to CSV.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// θ in degrees.
    #[arg(long, default_value_t = 28.0, allow_hyphen_values = true)]
    pub theta: f64,

    /// Exponential rate M.
    #[arg(long, default_value_t = 0.02, allow_hyphen_values = true)]
    pub m: f64,

    /// Horizontal offset X.
    #[arg(long, default_value_t = 55.0, allow_hyphen_values = true)]
    pub x: f64,

    /// Number of points.
    #[arg(short = 'n', long, default_value_t = 1500)]
    pub count: usize,

    /// First value of the t grid.
    #[arg(long, default_value_t = 6.0)]
    pub t_min: f64,

    /// Last value of the t grid.
    #[arg(long, default_value_t = 60.0)]
    pub t_max: f64,

    /// Standard deviation of Gaussian noise on both coordinates.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Probability that a point receives a gross outlier jump.
    #[arg(long, default_value_t = 0.0)]
    pub outlier_prob: f64,

    /// Size of an outlier jump.
    #[arg(long, default_value_t = 10.0)]
    pub outlier_size: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `curvefit fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 30)]
    pub height: usize,

    /// Also write an SVG chart.
    #[arg(long = "svg", value_name = "PATH")]
    pub svg: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::parse_from(["curvefit", "fit", "--csv", "data.csv"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.data.csv, PathBuf::from("data.csv"));
        assert_eq!(args.data.t_min, 6.0);
        assert_eq!(args.data.t_max, 60.0);
        assert_eq!(args.data.loss, LossKind::Positional);
        assert_eq!(args.seed, 42);
        assert_eq!(args.de_maxiter, 500);
        assert_eq!(args.de_popsize, 10);
        assert!(!args.no_refine);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn eval_accepts_negative_values_and_global_verbosity() {
        let cli = Cli::parse_from([
            "curvefit", "eval", "--csv", "d.csv", "--theta", "30", "--m", "-0.02", "--x", "50", "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Eval(args) = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(args.m, -0.02);
    }

    #[test]
    fn loss_kind_parses() {
        let cli = Cli::parse_from(["curvefit", "fit", "--csv", "d.csv", "--loss", "nearest", "--no-plot"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.data.loss, LossKind::Nearest);
        assert!(args.no_plot);
    }

    #[test]
    fn chart_outputs_are_independent() {
        let cli = Cli::parse_from(["curvefit", "fit", "--csv", "d.csv", "--plot-history", "history.svg"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.plot_history, Some(PathBuf::from("history.svg")));
        assert_eq!(args.plot_svg, None);
    }
}
