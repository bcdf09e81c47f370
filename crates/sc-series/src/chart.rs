//! Chart data for the mass-versus-time plot.
//!
//! [`ChartView`] turns a snapshot into a [`ChartFrame`]: everything a plot
//! widget needs to draw the run. The frame can also render itself as an SVG
//! image for export.

use std::fmt::Write as _;

use crate::sample::Sample;

pub const DEFAULT_PLOT_TITLE: &str = "Charting Flow Rate";
pub const X_LABEL: &str = "time (seconds)";
pub const Y_LABEL: &str = "mass (g)";

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    title: String,
}

impl Default for ChartView {
    fn default() -> Self {
        Self::new(DEFAULT_PLOT_TITLE)
    }
}

impl ChartView {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn render(&self, snapshot: &[Sample]) -> ChartFrame {
        ChartFrame {
            title: self.title.clone(),
            x_label: X_LABEL,
            y_label: Y_LABEL,
            points: snapshot
                .iter()
                .map(|s| [s.elapsed_seconds, s.mass_grams])
                .collect(),
        }
    }
}

/// One drawable frame of the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFrame {
    pub title: String,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub points: Vec<[f64; 2]>,
}

/// Axis ranges covering all points, padded when degenerate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ChartFrame {
    pub fn bounds(&self) -> Bounds {
        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for [x, y] in &self.points {
            x_min = x_min.min(*x);
            x_max = x_max.max(*x);
            y_min = y_min.min(*y);
            y_max = y_max.max(*y);
        }
        if self.points.is_empty() {
            (x_min, x_max, y_min, y_max) = (0.0, 1.0, 0.0, 1.0);
        }
        if x_max - x_min <= f64::EPSILON {
            x_max = x_min + 1.0;
        }
        if y_max - y_min <= f64::EPSILON {
            y_min -= 0.5;
            y_max += 0.5;
        }
        Bounds {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Red line with circle markers on a grid, titled and labelled.
    pub fn to_svg(&self) -> String {
        let b = self.bounds();
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let px = |x: f64| MARGIN_LEFT + (x - b.x_min) / (b.x_max - b.x_min) * plot_w;
        let py = |y: f64| MARGIN_TOP + (b.y_max - y) / (b.y_max - b.y_min) * plot_h;

        let mut svg = String::new();
        // Writing to a String cannot fail; results are ignored below.
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

        for i in 0..=TICKS {
            let frac = i as f64 / TICKS as f64;
            let xv = b.x_min + frac * (b.x_max - b.x_min);
            let yv = b.y_min + frac * (b.y_max - b.y_min);
            let (gx, gy) = (px(xv), py(yv));
            let _ = writeln!(
                svg,
                r##"<line x1="{gx:.1}" y1="{MARGIN_TOP}" x2="{gx:.1}" y2="{:.1}" stroke="#dddddd"/>"##,
                MARGIN_TOP + plot_h
            );
            let _ = writeln!(
                svg,
                r##"<line x1="{MARGIN_LEFT}" y1="{gy:.1}" x2="{:.1}" y2="{gy:.1}" stroke="#dddddd"/>"##,
                MARGIN_LEFT + plot_w
            );
            let _ = writeln!(
                svg,
                r#"<text x="{gx:.1}" y="{:.1}" font-size="12" text-anchor="middle">{}</text>"#,
                MARGIN_TOP + plot_h + 18.0,
                tick_label(xv)
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="end">{}</text>"#,
                MARGIN_LEFT - 6.0,
                gy + 4.0,
                tick_label(yv)
            );
        }

        let _ = writeln!(
            svg,
            r#"<rect x="{MARGIN_LEFT}" y="{MARGIN_TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#
        );

        if !self.points.is_empty() {
            let path: Vec<String> = self
                .points
                .iter()
                .map(|[x, y]| format!("{:.2},{:.2}", px(*x), py(*y)))
                .collect();
            let _ = writeln!(
                svg,
                r#"<polyline points="{}" fill="none" stroke="red" stroke-width="1.5"/>"#,
                path.join(" ")
            );
            for [x, y] in &self.points {
                let _ = writeln!(
                    svg,
                    r#"<circle cx="{:.2}" cy="{:.2}" r="3" fill="red"/>"#,
                    px(*x),
                    py(*y)
                );
            }
        }

        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="24" font-size="16" text-anchor="middle">{}</text>"#,
            WIDTH / 2.0,
            escape_xml(&self.title)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="13" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            HEIGHT - 14.0,
            self.x_label
        );
        let _ = writeln!(
            svg,
            r#"<text x="20" y="{:.1}" font-size="13" text-anchor="middle" transform="rotate(-90 20 {:.1})">{}</text>"#,
            MARGIN_TOP + plot_h / 2.0,
            MARGIN_TOP + plot_h / 2.0,
            self.y_label
        );
        svg.push_str("</svg>\n");
        svg
    }
}

fn tick_label(v: f64) -> String {
    let text = format!("{v:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
