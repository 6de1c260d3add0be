//! Soft-L1 robust penalty.
//!
//! For a squared, scaled residual `z = (r / f_scale)²`:
//!
//! - `ρ(z)  = 2(√(1 + z) − 1)`
//! - `ρ'(z) = 1 / √(1 + z)`
//!
//! `ρ` behaves like `z` (L2) near zero and like `2√z` (L1) for large residuals,
//! so a handful of outliers cannot dominate the refinement.

/// Soft-L1 penalty `ρ(z)`.
pub fn soft_l1(z: f64) -> f64 {
    // 2(√(1+z) − 1) rewritten as 2z / (√(1+z) + 1) to avoid cancellation for small z.
    2.0 * z / ((1.0 + z).sqrt() + 1.0)
}

/// First derivative `ρ'(z)`; used as the IRLS weight of a residual.
pub fn soft_l1_weight(z: f64) -> f64 {
    1.0 / (1.0 + z).sqrt()
}

/// Robust cost `½ · f² · Σ ρ((r/f)²)` over a residual vector.
pub fn soft_l1_cost(residuals: &[f64], f_scale: f64) -> f64 {
    let f2 = f_scale * f_scale;
    0.5 * f2 * residuals.iter().map(|r| soft_l1(r * r / f2)).sum::<f64>()
}
