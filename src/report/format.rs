//! Formatted terminal and file output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (the equation template is pinned by tests)

use std::path::Path;

use crate::domain::{DatasetStats, FitOutcome, Params, PointResidual};
use crate::error::AppError;

const RULE_WIDTH: usize = 60;

/// The fitted curve with parameters substituted, θ in degrees.
pub fn equation_string(p: &Params, precision: usize) -> String {
    let th = format!("{:.precision$}", p.theta_deg);
    let m = format!("{:.precision$}", p.m);
    let x = format!("{:.precision$}", p.x);
    format!(
        "(t*cos({th}) - e^{{{m}*|t|}}*sin(0.3t)*sin({th}) + {x}, \
         42 + t*sin({th}) + e^{{{m}*|t|}}*sin(0.3t)*cos({th}))"
    )
}

/// The flat-text result report.
pub fn format_report(p: &Params, loss: f64, precision: usize) -> String {
    let mut out = String::new();
    out.push_str("=== Optimization Complete ===\n\n");
    out.push_str(&format!("θ = {:.precision$} degrees\n\n", p.theta_deg));
    out.push_str(&format!("M = {:.precision$}\n\n", p.m));
    out.push_str(&format!("X = {:.precision$}\n\n", p.x));
    out.push_str(&format!("Final L1 Loss = {loss:.precision$}\n\n"));
    out.push_str("Equation:\n\n");
    out.push_str(&equation_string(p, precision));
    out.push('\n');
    out
}

/// Write the result report to `path`.
pub fn write_report(path: &Path, p: &Params, loss: f64, precision: usize) -> Result<(), AppError> {
    std::fs::write(path, format_report(p, loss, precision))
        .map_err(|e| AppError::input(format!("Failed to write report '{}': {e}", path.display())))
}

/// Format the full run summary (dataset stats + optimization steps + final result).
pub fn format_run_summary(stats: &DatasetStats, outcome: &FitOutcome, precision: usize) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&format!("{rule}\nOPTIMIZATION SUMMARY\n{rule}\n\n"));

    out.push_str("Data Summary:\n");
    out.push_str(&format!("  Number of points: {}\n", stats.n_points));
    out.push_str(&format!("  X range: [{:.2}, {:.2}]\n", stats.x_range.0, stats.x_range.1));
    out.push_str(&format!("  Y range: [{:.2}, {:.2}]\n", stats.y_range.0, stats.y_range.1));
    out.push_str(&format!("  t range: [{}, {}]\n", stats.t_range.0, stats.t_range.1));

    out.push_str("\nOptimization Steps:\n");
    for (i, step) in outcome.history.iter().enumerate() {
        let mark = if step.accepted { "" } else { " (rejected)" };
        out.push_str(&format!(
            "  Step {} ({}): θ={:.precision$}°, M={:.precision$}, X={:.precision$}, Loss={:.precision$}{mark}\n",
            i + 1,
            step.method.display_name(),
            step.params.theta_deg,
            step.params.m,
            step.params.x,
            step.loss,
        ));
    }
    out.push_str(&format!(
        "  (differential evolution: {} generations, {} evaluations, converged={})\n",
        outcome.evolution.generations, outcome.evolution.nfev, outcome.evolution.converged
    ));

    out.push_str("\nFinal Results:\n");
    out.push_str(&format!("  θ = {:.precision$} degrees\n", outcome.params.theta_deg));
    out.push_str(&format!("  M = {:.precision$}\n", outcome.params.m));
    out.push_str(&format!("  X = {:.precision$}\n", outcome.params.x));
    out.push_str(&format!("  Final L1 Loss = {:.precision$}\n", outcome.loss));
    out.push_str(&format!("\n{rule}\n"));

    out
}

/// Format a per-point residual table.
pub fn format_residual_table(title: &str, rows: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');

    out.push_str(
        format!(
            "{:>6} {:>8} {:>12} {:>12} {:>12} {:>12} {:>10}",
            "index", "t", "x_obs", "y_obs", "x_fit", "y_fit", "l1"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<6} {:-<8} {:-<12} {:-<12} {:-<12} {:-<12} {:-<10}",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:>6} {:>8.3} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>10.4}",
                r.index,
                r.t,
                r.x_obs,
                r.y_obs,
                r.x_fit,
                r.y_fit,
                r.l1()
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}
