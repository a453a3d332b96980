//! Standalone SVG charts for a unit's portfolio history.

use crate::domain::portfolio::EquityPoint;
use chrono::NaiveDate;

const WIDTH: f64 = 500.0;
const HEIGHT: f64 = 200.0;
const PADDING: f64 = 40.0;

pub const HISTOGRAM_BINS: usize = 10;

fn plot_width() -> f64 {
    WIDTH - 2.0 * PADDING
}

fn plot_height() -> f64 {
    HEIGHT - 2.0 * PADDING
}

/// Wrap chart body in an SVG document with axes and a title.
fn frame(title: &str, body: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">
  <rect width="{w:.0}" height="{h:.0}" fill="white"/>
  <text x="{cx:.0}" y="20" text-anchor="middle" font-family="sans-serif" font-size="12">{title}</text>
  <line x1="{p:.0}" y1="{p:.0}" x2="{p:.0}" y2="{b:.0}" stroke="black"/>
  <line x1="{p:.0}" y1="{b:.0}" x2="{r:.0}" y2="{b:.0}" stroke="black"/>
{body}</svg>
"#,
        w = WIDTH,
        h = HEIGHT,
        cx = WIDTH / 2.0,
        p = PADDING,
        b = HEIGHT - PADDING,
        r = WIDTH - PADDING,
    )
}

fn no_data(title: &str) -> String {
    frame(
        title,
        &format!(
            "  <text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"middle\" font-family=\"sans-serif\" font-size=\"11\">No data available.</text>\n",
            WIDTH / 2.0,
            HEIGHT / 2.0
        ),
    )
}

fn bounds(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

fn scale(count: usize, min: f64, max: f64) -> (f64, f64) {
    let range = max - min;
    let scale_y = if range > 0.0 { plot_height() / range } else { 1.0 };
    let scale_x = if count > 1 {
        plot_width() / (count - 1) as f64
    } else {
        0.0
    };
    (scale_x, scale_y)
}

/// Portfolio value over time as a polyline.
pub fn value_chart(points: &[EquityPoint]) -> String {
    let title = "Daily Performance";
    if points.is_empty() {
        return no_data(title);
    }

    let (min, max) = bounds(points.iter().map(|p| p.value));
    let (scale_x, scale_y) = scale(points.len(), min, max);

    let coords: Vec<String> = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let x = PADDING + i as f64 * scale_x;
            let y = HEIGHT - PADDING - (point.value - min) * scale_y;
            format!("{:.1},{:.1}", x, y)
        })
        .collect();

    frame(
        title,
        &format!(
            "  <polyline fill=\"none\" stroke=\"blue\" stroke-width=\"1\" points=\"{}\"/>\n",
            coords.join(" ")
        ),
    )
}

/// Daily simple returns as a scatter plot.
pub fn returns_scatter(returns: &[(NaiveDate, f64)]) -> String {
    let title = "Daily Returns";
    if returns.is_empty() {
        return no_data(title);
    }

    let (min, max) = bounds(returns.iter().map(|(_, r)| *r));
    let (scale_x, scale_y) = scale(returns.len(), min, max);

    let body: String = returns
        .iter()
        .enumerate()
        .map(|(i, (_, r))| {
            let x = PADDING + i as f64 * scale_x;
            let y = HEIGHT - PADDING - (r - min) * scale_y;
            format!("  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"1.5\" fill=\"steelblue\"/>\n", x, y)
        })
        .collect();

    frame(title, &body)
}

/// Count of values per equal-width bin between the minimum and maximum.
/// The maximum lands in the last bin.
pub fn histogram_counts(values: &[f64], bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if values.is_empty() || bins == 0 {
        return counts;
    }

    let (min, max) = bounds(values.iter().copied());
    let width = (max - min) / bins as f64;
    for v in values {
        let idx = if width > 0.0 {
            (((v - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }
    counts
}

/// Distribution of daily returns in `HISTOGRAM_BINS` bars.
pub fn returns_histogram(returns: &[f64]) -> String {
    let title = "Daily Returns Histogram";
    if returns.is_empty() {
        return no_data(title);
    }

    let counts = histogram_counts(returns, HISTOGRAM_BINS);
    let tallest = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let bar_width = plot_width() / HISTOGRAM_BINS as f64;

    let body: String = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let bar_height = count as f64 / tallest * plot_height();
            format!(
                "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"steelblue\" stroke=\"white\"/>\n",
                PADDING + i as f64 * bar_width,
                HEIGHT - PADDING - bar_height,
                bar_width,
                bar_height
            )
        })
        .collect();

    frame(title, &body)
}
