//! Linear least squares solves used by the refinement step.
//!
//! Each refinement iteration solves a small damped problem
//!
//! ```text
//! minimize ‖J·δ + r‖² + λ‖D·δ‖²
//! ```
//!
//! which we write as one stacked least squares system and solve via SVD:
//! the stacked matrix is tall (2n + 3 rows, 3 columns), and SVD stays robust
//! when `J` is close to rank deficient (e.g. θ near 0 decouples M).

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Solve the damped step `min ‖J·δ + r‖² + λ‖diag(d)·δ‖²` for `δ`.
pub fn solve_damped_step(
    jac: &DMatrix<f64>,
    residuals: &DVector<f64>,
    lambda: f64,
    scale: &[f64],
) -> Option<DVector<f64>> {
    let (m, n) = jac.shape();
    if residuals.len() != m || scale.len() != n || !(lambda.is_finite() && lambda >= 0.0) {
        return None;
    }

    let mut a = DMatrix::<f64>::zeros(m + n, n);
    a.view_mut((0, 0), (m, n)).copy_from(jac);
    let sqrt_lambda = lambda.sqrt();
    for j in 0..n {
        a[(m + j, j)] = sqrt_lambda * scale[j];
    }

    let mut b = DVector::<f64>::zeros(m + n);
    for i in 0..m {
        b[i] = -residuals[i];
    }

    solve_least_squares(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let x = solve_least_squares(&a, &b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn undamped_step_is_gauss_newton() {
        // r(p) = J p - y with p = 0 gives δ = argmin ‖Jδ - y‖.
        let jac = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let r = DVector::from_row_slice(&[-2.0, -5.0, -8.0]);
        let step = solve_damped_step(&jac, &r, 0.0, &[1.0, 1.0]).unwrap();
        assert!((step[0] - 2.0).abs() < 1e-10);
        assert!((step[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn damping_shrinks_the_step() {
        let jac = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let r = DVector::from_row_slice(&[-2.0, -5.0, -8.0]);
        let free = solve_damped_step(&jac, &r, 0.0, &[1.0, 1.0]).unwrap();
        let damped = solve_damped_step(&jac, &r, 100.0, &[1.0, 1.0]).unwrap();
        assert!(damped.norm() < free.norm());
    }
}
