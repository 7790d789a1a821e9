//! Comparative SVG line chart of gross value series.

use crate::domain::error::EodError;
use crate::domain::evaluation::EquityPoint;
use crate::ports::report_port::{NamedSeries, ReportPort};
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 60.0;
const COLORS: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

pub struct SvgChartAdapter;

impl SvgChartAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SvgChartAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for SvgChartAdapter {
    fn write(&self, series: &[NamedSeries], output_path: &Path) -> Result<(), EodError> {
        let svg = generate_comparison_svg(series);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, svg)?;
        tracing::info!(path = %output_path.display(), series = series.len(), "chart written");
        Ok(())
    }
}

/// `Comparative Analysis of A and B`, or just the name for one series.
pub fn chart_title(series: &[NamedSeries]) -> String {
    let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
    match names.as_slice() {
        [] => "Comparative Analysis".to_string(),
        [only] => only.to_string(),
        [init @ .., last] => format!("Comparative Analysis of {} and {}", init.join(", "), last),
    }
}

pub fn generate_comparison_svg(series: &[NamedSeries]) -> String {
    let title = escape(&chart_title(series));
    let all: Vec<&EquityPoint> = series.iter().flat_map(|s| s.points.iter()).collect();

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="24" text-anchor="middle" font-size="16" font-family="sans-serif">{title}</text>"#,
        WIDTH / 2.0
    );

    let (Some(first_date), Some(last_date)) = (
        all.iter().map(|p| p.date).min(),
        all.iter().map(|p| p.date).max(),
    ) else {
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-family="sans-serif">No data</text>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        );
        svg.push_str("</svg>\n");
        return svg;
    };

    let min_value = all.iter().map(|p| p.equity).fold(f64::INFINITY, f64::min);
    let max_value = all.iter().map(|p| p.equity).fold(f64::NEG_INFINITY, f64::max);
    let scale = Scale::new(first_date, last_date, min_value, max_value);

    let plot_bottom = HEIGHT - PADDING;
    let plot_right = WIDTH - PADDING;
    let _ = writeln!(
        svg,
        r#"<line x1="{PADDING:.1}" y1="{PADDING:.1}" x2="{PADDING:.1}" y2="{plot_bottom:.1}" stroke="black"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{PADDING:.1}" y1="{plot_bottom:.1}" x2="{plot_right:.1}" y2="{plot_bottom:.1}" stroke="black"/>"#
    );

    let font = r#"font-size="11" font-family="sans-serif""#;
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="end" {font}>{max_value:.0}</text>"#,
        PADDING - 4.0,
        PADDING + 4.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="end" {font}>{min_value:.0}</text>"#,
        PADDING - 4.0,
        plot_bottom
    );
    let _ = writeln!(
        svg,
        r#"<text x="{PADDING:.1}" y="{:.1}" {font}>{first_date}</text>"#,
        plot_bottom + 16.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="{plot_right:.1}" y="{:.1}" text-anchor="end" {font}>{last_date}</text>"#,
        plot_bottom + 16.0
    );

    for (i, s) in series.iter().enumerate() {
        let color = COLORS[i % COLORS.len()];
        let points: Vec<String> = s
            .points
            .iter()
            .map(|p| format!("{:.1},{:.1}", scale.x(p.date), scale.y(p.equity)))
            .collect();
        if !points.is_empty() {
            let _ = writeln!(
                svg,
                r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{}"/>"#,
                points.join(" ")
            );
        }

        let legend_y = PADDING + 14.0 * i as f64;
        let _ = writeln!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="10" height="10" fill="{color}"/>"#,
            PADDING + 10.0,
            legend_y - 9.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{legend_y:.1}" {font}>{}</text>"#,
            PADDING + 24.0,
            escape(&s.name)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

struct Scale {
    first_date: NaiveDate,
    day_span: f64,
    min_value: f64,
    value_span: f64,
}

impl Scale {
    fn new(first_date: NaiveDate, last_date: NaiveDate, min_value: f64, max_value: f64) -> Self {
        Self {
            first_date,
            day_span: (last_date - first_date).num_days() as f64,
            min_value,
            value_span: max_value - min_value,
        }
    }

    fn x(&self, date: NaiveDate) -> f64 {
        let plot_width = WIDTH - 2.0 * PADDING;
        if self.day_span <= 0.0 {
            return PADDING + plot_width / 2.0;
        }
        PADDING + (date - self.first_date).num_days() as f64 / self.day_span * plot_width
    }

    fn y(&self, value: f64) -> f64 {
        let plot_height = HEIGHT - 2.0 * PADDING;
        if self.value_span <= 0.0 {
            return HEIGHT / 2.0;
        }
        HEIGHT - PADDING - (value - self.min_value) / self.value_span * plot_height
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
