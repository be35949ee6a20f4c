//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed samples: `o`
//! - fitted contour: `-` line
//! - segment boundaries: `|`

use crate::domain::{FitReportFile, Sample};

/// Render observed and fitted contours with boundary markers.
pub fn render_ascii_plot(
    observed: &[Sample],
    fitted: &[Sample],
    boundaries: &[f64],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (t_min, t_max) = time_range(observed, fitted, boundaries).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = value_range(observed, fitted).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first, then boundaries in the gaps, then points on top.
    let curve: Vec<(f64, f64)> = fitted.iter().map(|s| (s.time, s.value)).collect();
    draw_curve(&mut grid, &curve, t_min, t_max, y_min, y_max);

    for &b in boundaries {
        let x = map_x(b, t_min, t_max, width);
        for row in grid.iter_mut() {
            if row[x] == ' ' {
                row[x] = '|';
            }
        }
    }

    for s in observed {
        let x = map_x(s.time, t_min, t_max, width);
        let y = map_y(s.value, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: time=[{t_min:.3}, {t_max:.3}] s | f0=[{y_min:.2}, {y_max:.2}] st\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

/// Render a plot from a saved report.
pub fn render_ascii_plot_from_report(report: &FitReportFile, width: usize, height: usize) -> String {
    render_ascii_plot(&report.observed, &report.fitted, &report.boundaries, width, height)
}

fn time_range(observed: &[Sample], fitted: &[Sample], boundaries: &[f64]) -> Option<(f64, f64)> {
    let times = observed
        .iter()
        .chain(fitted)
        .map(|s| s.time)
        .chain(boundaries.iter().copied());
    finite_range(times)
}

fn value_range(observed: &[Sample], fitted: &[Sample]) -> Option<(f64, f64)> {
    finite_range(observed.iter().chain(fitted).map(|s| s.value))
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top (largest value).
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve.iter().filter(|(_, y)| y.is_finite()) {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
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
        let observed = [Sample::new(0.0, 0.0), Sample::new(1.0, 1.0)];
        let fitted = [Sample::new(0.0, 0.0), Sample::new(1.0, 1.0)];
        let plot = render_ascii_plot(&observed, &fitted, &[0.0, 0.5, 1.0], 10, 5);

        let expected = "\
Plot: time=[0.000, 1.000] s | f0=[-0.05, 1.05] st
|    |  -o
|    |-- |
|   --   |
| -- |   |
o-   |   |
";
        assert_eq!(plot, expected);
    }

    #[test]
    fn degenerate_input_still_renders() {
        let plot = render_ascii_plot(&[], &[], &[], 3, 2);
        // Clamped to the minimum 10 x 5 grid plus the header.
        assert_eq!(plot.lines().count(), 6);
        assert!(plot.lines().skip(1).all(|l| l.chars().count() == 10));
    }
}
