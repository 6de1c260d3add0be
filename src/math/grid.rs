//! Uniform grids.

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
///
/// Mirrors the usual `linspace` conventions:
/// - `steps == 0` yields an empty grid
/// - `steps == 1` yields `[min]`
/// - the last point is exactly `max`
pub fn linspace(min: f64, max: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (steps as f64 - 1.0);
            let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
            out[steps - 1] = max;
            out
        }
    }
}
