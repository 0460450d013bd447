//! ASCII plotting of a statistic's history for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observations: `o`
//! - connecting line: `-`
//!
//! Chronological series are spaced by calendar days; provider-ordered series
//! (dates that failed to parse) are spaced evenly by index.

use crate::domain::{SeriesOrder, TimeSeries};
use crate::report::format_value;

/// Render a history plot.
pub fn render_history_plot(
    series: &TimeSeries,
    stat: &str,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let points = plot_points(series);
    let (Some((x_min, x_max)), Some((y_lo, y_hi))) = (
        value_range(points.iter().map(|p| p.0)),
        value_range(points.iter().map(|p| p.1)),
    ) else {
        return "Plot: (no data)\n".to_string();
    };
    let (x_min, x_max) = widen_degenerate(x_min, x_max);
    let (y_min, y_max) = pad_range(widen_degenerate(y_lo, y_hi), 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw line first (so points can overlay).
    draw_polyline(&mut grid, &points, (x_min, x_max), (y_min, y_max));
    for &(x, y) in &points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let span = match series.order {
        SeriesOrder::Chronological => format!(
            "{} .. {}",
            series.points.first().map(|p| p.label.as_str()).unwrap_or(""),
            series.points.last().map(|p| p.label.as_str()).unwrap_or(""),
        ),
        SeriesOrder::Insertion => format!("{} points (provider order)", series.len()),
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {span} | y=[{}, {}]\n",
        format_value(Some(y_lo), stat),
        format_value(Some(y_hi), stat)
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    out
}

fn plot_points(series: &TimeSeries) -> Vec<(f64, f64)> {
    let origin = series.points.first().and_then(|p| p.date);
    series
        .points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let value = p.value.filter(|v| v.is_finite())?;
            let x = match (series.order, origin, p.date) {
                (SeriesOrder::Chronological, Some(origin), Some(date)) => {
                    (date - origin).num_days() as f64
                }
                _ => i as f64,
            };
            Some((x, value))
        })
        .collect()
}

fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}

// A single point (or a flat series) still needs a non-empty axis.
fn widen_degenerate(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        (min, max)
    } else {
        let half = (min.abs() * 0.05).max(1.0);
        (min - half, max + half)
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

fn draw_polyline(
    grid: &mut [Vec<char>],
    points: &[(f64, f64)],
    x_range: (f64, f64),
    y_range: (f64, f64),
) {
    if points.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in points {
        let col = map_x(x, x_range.0, x_range.1, width);
        let row = map_y(y, y_range.0, y_range.1, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
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
