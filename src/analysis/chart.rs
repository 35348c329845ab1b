use std::fmt::{self, Write as _};

use crate::config::HighlightConfig;

use super::checkout::HourlySales;
use super::failures::FailureRatePoint;

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 90.0;
const Y_TICKS: usize = 5;

#[derive(Debug, Clone, Copy)]
enum Marker {
    Circle,
    Square,
    Triangle,
}

/// One plotted series, a value per hour label.
struct Line<'a> {
    label: &'a str,
    color: &'a str,
    dash: Option<&'a str>,
    marker: Marker,
    values: Vec<f64>,
}

/// Horizontal dashed line at a fixed value, e.g. an alert threshold.
struct ReferenceLine {
    label: String,
    color: &'static str,
    value: f64,
}

/// A category-axis line chart: hour labels on x, values on y.
struct Plot<'a> {
    title: &'a str,
    y_label: &'a str,
    y_precision: usize,
    x_labels: Vec<&'a str>,
    lines: Vec<Line<'a>>,
    reference: Option<ReferenceLine>,
    highlights: &'a [HighlightConfig],
}

/// Maps hour indices and values onto the plot area.
struct Scale {
    count: usize,
    y_max: f64,
}

impl Scale {
    fn new(plot: &Plot) -> Self {
        let peak = plot
            .lines
            .iter()
            .flat_map(|line| line.values.iter().copied())
            .chain(plot.reference.iter().map(|r| r.value))
            .fold(0.0_f64, f64::max);
        let y_max = if peak > 0.0 { peak * 1.1 } else { 1.0 };
        Self {
            count: plot.x_labels.len(),
            y_max,
        }
    }

    fn x(&self, index: usize) -> f64 {
        let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        if self.count <= 1 {
            return MARGIN_LEFT + plot_width / 2.0;
        }
        MARGIN_LEFT + plot_width * index as f64 / (self.count - 1) as f64
    }

    fn y(&self, value: f64) -> f64 {
        let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        MARGIN_TOP + plot_height * (1.0 - value.max(0.0) / self.y_max)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn dash_attr(dash: Option<&str>) -> String {
    dash.map(|d| format!(r#" stroke-dasharray="{d}""#))
        .unwrap_or_default()
}

fn render(plot: &Plot) -> eyre::Result<String> {
    let mut svg = String::new();
    draw(plot, &mut svg)
        .map_err(|e| eyre::eyre!("Failed to render chart '{}': {}", plot.title, e))?;
    Ok(svg)
}

fn draw(plot: &Plot, svg: &mut String) -> fmt::Result {
    let scale = Scale::new(plot);
    let bottom = HEIGHT - MARGIN_BOTTOM;
    let right = WIDTH - MARGIN_RIGHT;

    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<text x="{}" y="30" font-size="18" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        escape(plot.title)
    )?;

    let position = |label: &str| plot.x_labels.iter().position(|x| *x == label);
    let mut window_legend: Vec<String> = Vec::new();

    for highlight in plot.highlights {
        let (Some(start), Some(end)) = (
            position(highlight.start.as_str()),
            position(highlight.end.as_str()),
        ) else {
            tracing::warn!(
                label = %highlight.label,
                start = %highlight.start,
                end = %highlight.end,
                "Highlight window not present in data, skipping"
            );
            continue;
        };
        let x0 = scale.x(start.min(end));
        let x1 = scale.x(start.max(end));
        writeln!(
            svg,
            r#"<rect class="highlight" x="{x0:.1}" y="{MARGIN_TOP}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="{}"/>"#,
            x1 - x0,
            bottom - MARGIN_TOP,
            escape(&highlight.color),
            highlight.opacity
        )?;
        window_legend.push(format!(
            r#"<rect width="24" height="12" fill="{}" fill-opacity="{}"/><text x="32" y="11" font-size="12">{}</text>"#,
            escape(&highlight.color),
            highlight.opacity,
            escape(&highlight.label)
        ));
    }

    // Grid and y-axis ticks
    for tick in 0..=Y_TICKS {
        let value = scale.y_max * tick as f64 / Y_TICKS as f64;
        let y = scale.y(value);
        writeln!(
            svg,
            r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{right}" y2="{y:.1}" stroke="#ccc" stroke-width="0.5" stroke-dasharray="4 4"/>"##
        )?;
        writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" font-size="11" text-anchor="end">{:.*}</text>"#,
            MARGIN_LEFT - 8.0,
            y + 4.0,
            plot.y_precision,
            value
        )?;
    }

    // X-axis hour labels
    for (index, label) in plot.x_labels.iter().enumerate() {
        let x = scale.x(index);
        writeln!(
            svg,
            r#"<text x="{x:.1}" y="{:.1}" font-size="11" text-anchor="end" transform="rotate(-45 {x:.1} {:.1})">{}</text>"#,
            bottom + 16.0,
            bottom + 16.0,
            escape(label)
        )?;
    }

    writeln!(
        svg,
        r#"<line x1="{MARGIN_LEFT}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="black"/>"#
    )?;
    writeln!(
        svg,
        r#"<line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{bottom}" stroke="black"/>"#
    )?;
    writeln!(
        svg,
        r#"<text x="{}" y="{}" font-size="13" text-anchor="middle">Time of Day (Hour)</text>"#,
        (MARGIN_LEFT + right) / 2.0,
        HEIGHT - 15.0
    )?;
    writeln!(
        svg,
        r#"<text x="20" y="{0}" font-size="13" text-anchor="middle" transform="rotate(-90 20 {0})">{1}</text>"#,
        (MARGIN_TOP + bottom) / 2.0,
        escape(plot.y_label)
    )?;

    let mut legend: Vec<String> = Vec::new();
    for line in &plot.lines {
        let dash = dash_attr(line.dash);
        let points: Vec<String> = line
            .values
            .iter()
            .enumerate()
            .map(|(i, value)| format!("{:.1},{:.1}", scale.x(i), scale.y(*value)))
            .collect();
        writeln!(
            svg,
            r#"<polyline class="series" points="{}" fill="none" stroke="{}" stroke-width="2"{dash}/>"#,
            points.join(" "),
            line.color
        )?;
        for (i, value) in line.values.iter().enumerate() {
            writeln!(
                svg,
                "{}",
                marker(line.marker, scale.x(i), scale.y(*value), line.color)
            )?;
        }
        legend.push(format!(
            r#"<line x1="0" y1="6" x2="24" y2="6" stroke="{}" stroke-width="2"{dash}/><text x="32" y="11" font-size="12">{}</text>"#,
            line.color,
            escape(line.label)
        ));
    }

    if let Some(reference) = &plot.reference {
        let y = scale.y(reference.value);
        let dash = dash_attr(Some("10 6"));
        writeln!(
            svg,
            r#"<line class="threshold" x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{right}" y2="{y:.1}" stroke="{}" stroke-width="2"{dash}/>"#,
            reference.color
        )?;
        legend.push(format!(
            r#"<line x1="0" y1="6" x2="24" y2="6" stroke="{}" stroke-width="2"{dash}/><text x="32" y="11" font-size="12">{}</text>"#,
            reference.color,
            escape(&reference.label)
        ));
    }
    legend.extend(window_legend);

    // Legend, upper left inside the plot area
    for (i, entry) in legend.iter().enumerate() {
        writeln!(
            svg,
            r#"<g transform="translate({}, {})">{entry}</g>"#,
            MARGIN_LEFT + 12.0,
            MARGIN_TOP + 12.0 + 18.0 * i as f64
        )?;
    }

    svg.push_str("</svg>\n");
    Ok(())
}

fn marker(kind: Marker, x: f64, y: f64, color: &str) -> String {
    match kind {
        Marker::Circle => format!(r#"<circle cx="{x:.1}" cy="{y:.1}" r="4" fill="{color}"/>"#),
        Marker::Square => format!(
            r#"<rect x="{:.1}" y="{:.1}" width="8" height="8" fill="{color}"/>"#,
            x - 4.0,
            y - 4.0
        ),
        Marker::Triangle => format!(
            r#"<polygon points="{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}" fill="{color}"/>"#,
            x,
            y - 5.0,
            x - 5.0,
            y + 4.0,
            x + 5.0,
            y + 4.0
        ),
    }
}

/// Today / yesterday / weekly-average sales per hour, shading each highlight
/// window whose bounds appear among the row labels.
pub fn render_sales_chart(
    rows: &[HourlySales],
    highlights: &[HighlightConfig],
    title: &str,
) -> eyre::Result<String> {
    let plot = Plot {
        title,
        y_label: "Number of POS Sales",
        y_precision: 0,
        x_labels: rows.iter().map(|row| row.time.as_str()).collect(),
        lines: vec![
            Line {
                label: "Today (Sales)",
                color: "red",
                dash: None,
                marker: Marker::Circle,
                values: rows.iter().map(|row| row.today).collect(),
            },
            Line {
                label: "Yesterday (Sales)",
                color: "blue",
                dash: Some("8 5"),
                marker: Marker::Square,
                values: rows.iter().map(|row| row.yesterday).collect(),
            },
            Line {
                label: "Avg Last Week (Baseline)",
                color: "green",
                dash: Some("2 4"),
                marker: Marker::Triangle,
                values: rows.iter().map(|row| row.avg_last_week).collect(),
            },
        ],
        reference: None,
        highlights,
    };
    render(&plot)
}

/// Hourly failure rate in percent against the failed-rate alert threshold.
pub fn render_failure_rate_chart(
    points: &[FailureRatePoint],
    threshold: f64,
    highlights: &[HighlightConfig],
    title: &str,
) -> eyre::Result<String> {
    let plot = Plot {
        title,
        y_label: "Rate (%)",
        y_precision: 1,
        x_labels: points.iter().map(|p| p.time.as_str()).collect(),
        lines: vec![Line {
            label: "Failure Rate (%)",
            color: "red",
            dash: None,
            marker: Marker::Circle,
            values: points.iter().map(|p| p.failure_rate * 100.0).collect(),
        }],
        reference: Some(ReferenceLine {
            label: format!("Alert Threshold ({:.1}%)", threshold * 100.0),
            color: "blue",
            value: threshold * 100.0,
        }),
        highlights,
    };
    render(&plot)
}

pub fn write_chart(path: &str, svg: &str) -> eyre::Result<()> {
    std::fs::write(path, svg)
        .map_err(|e| eyre::eyre!("Failed to write chart '{}': {}", path, e))?;
    tracing::info!(path, "Chart generated");
    Ok(())
}
