//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! The plot shows the x–y plane (the curve parameter t is not an axis).
//!
//! Plot elements:
//! - fitted curve: `-` line
//! - observed points: `o`
//! - optional highlights (largest residuals): `*`

use crate::domain::FitFile;

/// Render observed points over a sampled curve.
pub fn render_ascii_plot(
    observed: &[(f64, f64)],
    curve: &[(f64, f64)],
    highlights: &[(f64, f64)],
    width: usize,
    height: usize,
) -> String {
    render_plot(observed, curve, highlights, width, height)
}

/// Render a plot from a saved fit JSON file.
pub fn render_ascii_plot_from_fit_file(fit: &FitFile, width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = fit
        .grid
        .x
        .iter()
        .zip(fit.grid.y.iter())
        .map(|(&x, &y)| (x, y))
        .collect();
    render_plot(&fit.observed, &curve, &[], width, height)
}

fn render_plot(
    observed: &[(f64, f64)],
    curve: &[(f64, f64)],
    highlights: &[(f64, f64)],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all = || observed.iter().chain(curve.iter()).chain(highlights.iter());
    let (x_min, x_max) = pad_range(axis_range(all().map(|p| p.0)), 0.05);
    let (y_min, y_max) = pad_range(axis_range(all().map(|p| p.1)), 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, curve, (x_min, x_max), (y_min, y_max));

    for (points, ch) in [(observed, 'o'), (highlights, '*')] {
        for &(x, y) in points {
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            let col = map_x(x, x_min, x_max, width);
            let row = map_y(y, y_min, y_max, height);
            grid[row][col] = ch;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.2}, {x_max:.2}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

/// Finite min/max of `values`; a degenerate or empty range widens to a unit span.
fn axis_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        (0.0, 1.0)
    } else if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

fn pad_range((min, max): (f64, f64), frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], xr: (f64, f64), yr: (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let col = map_x(x, xr.0, xr.1, width);
        let row = map_y(y, yr.0, yr.1, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_golden_snapshot_small() {
        let observed = [(0.0, 0.0), (10.0, 10.0)];
        let curve = [(0.0, 5.0), (10.0, 5.0)];

        let txt = render_ascii_plot(&observed, &curve, &[], 10, 5);
        let expected = concat!(
            "Plot: x=[-0.50, 10.50] | y=[-0.50, 10.50]\n",
            "         o\n",
            "          \n",
            "----------\n",
            "          \n",
            "o         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn highlights_overlay_points() {
        let observed = [(0.0, 0.0), (10.0, 10.0)];
        let txt = render_ascii_plot(&observed, &[], &[(10.0, 10.0)], 10, 5);
        let first_row = txt.lines().nth(1).unwrap();
        assert_eq!(first_row, "         *");
    }

    #[test]
    fn degenerate_input_does_not_panic() {
        let txt = render_ascii_plot(&[(1.0, 1.0)], &[(f64::NAN, 2.0)], &[], 3, 2);
        // Minimum grid is 10x5 plus the header line.
        assert_eq!(txt.lines().count(), 6);
        assert!(txt.contains('o'));
    }
}
