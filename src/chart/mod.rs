//! Trend chart — multi-line SVG rendering of a [`TrendSeries`].
//!
//! The chart is assembled server-side as a self-contained SVG string: a
//! point scale places years on the x axis, a linear scale maps counts to
//! the y axis (headroom at 110% of the observed maximum), and each topic
//! gets a monotone-interpolated path plus one marker per data point, drawn
//! from a fixed 10-color categorical palette. Axes, gridlines, a title and
//! a clickable legend round out the document.
//!
//! Interactivity is split: markers and legend entries carry `data-`
//! attributes (`data-topic`, `data-year`) that the embedded dashboard wires
//! to hover, click-through and legend toggling. The toggling *state* lives
//! here in [`Visibility`] — a pure rendering property that dims a topic to
//! 10% opacity without touching the underlying data.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::engine::TrendSeries;

/// Categorical palette, one color per topic, cycling past ten.
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Opacity of a topic whose legend entry has been toggled off.
pub const DIMMED_OPACITY: f64 = 0.1;

/// Color for a topic by its position in the request order.
pub fn topic_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

// ---------------------------------------------------------------------------
// Legend visibility state
// ---------------------------------------------------------------------------

/// Per-topic legend visibility. Toggling is idempotent under double-toggle
/// and never affects aggregation or the interpreter's trend text — it only
/// changes the opacity the chart renders with.
#[derive(Debug, Clone, Default)]
pub struct Visibility {
    hidden: BTreeMap<String, bool>,
}

impl Visibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a topic's visibility; returns the new visible state.
    pub fn toggle(&mut self, topic: &str) -> bool {
        let entry = self.hidden.entry(topic.to_string()).or_insert(false);
        *entry = !*entry;
        !*entry
    }

    pub fn is_visible(&self, topic: &str) -> bool {
        !self.hidden.get(topic).copied().unwrap_or(false)
    }

    /// Rendered opacity for a topic's line and markers.
    pub fn opacity(&self, topic: &str) -> f64 {
        if self.is_visible(topic) { 1.0 } else { DIMMED_OPACITY }
    }

    /// Forget all toggles (used when a new series replaces the old one).
    pub fn reset(&mut self) {
        self.hidden.clear();
    }
}

// ---------------------------------------------------------------------------
// Scales
// ---------------------------------------------------------------------------

/// Evenly spaced positions for an ordinal domain — one slot per year.
#[derive(Debug)]
pub struct PointScale {
    len: usize,
    range: (f64, f64),
}

impl PointScale {
    pub fn new(len: usize, range: (f64, f64)) -> Self {
        Self { len, range }
    }

    /// X position of the i-th domain value. A single-value domain sits at
    /// the center of the range.
    pub fn position(&self, index: usize) -> f64 {
        let (start, end) = self.range;
        if self.len <= 1 {
            return (start + end) / 2.0;
        }
        start + (end - start) * index as f64 / (self.len - 1) as f64
    }
}

/// Linear mapping from counts to pixels, y-inverted for SVG.
#[derive(Debug)]
pub struct LinearScale {
    domain_max: f64,
    range: (f64, f64),
}

impl LinearScale {
    /// Domain runs from zero to 110% of `max_count`, with a floor of 1 so an
    /// all-zero series still produces a finite scale.
    pub fn for_counts(max_count: usize, range: (f64, f64)) -> Self {
        Self {
            domain_max: (max_count as f64 * 1.1).max(1.0),
            range,
        }
    }

    pub fn position(&self, value: f64) -> f64 {
        let (start, end) = self.range;
        start + (end - start) * (value / self.domain_max)
    }

    /// Tick values: five even steps from zero to the domain maximum.
    pub fn ticks(&self) -> Vec<f64> {
        (0..=5).map(|i| self.domain_max * i as f64 / 5.0).collect()
    }
}

// ---------------------------------------------------------------------------
// Monotone interpolation
// ---------------------------------------------------------------------------

/// Build an SVG path through `points` using monotone cubic interpolation
/// (Fritsch–Carlson tangents), so the smoothed line never overshoots the
/// data the way a plain cubic spline can.
pub fn monotone_path(points: &[(f64, f64)]) -> String {
    match points.len() {
        0 => return String::new(),
        1 => return format!("M{:.2},{:.2}", points[0].0, points[0].1),
        _ => {}
    }

    let n = points.len();
    let mut slopes = Vec::with_capacity(n - 1);
    for i in 0..n - 1 {
        let dx = points[i + 1].0 - points[i].0;
        let dy = points[i + 1].1 - points[i].1;
        slopes.push(if dx == 0.0 { 0.0 } else { dy / dx });
    }

    // Tangent at each point: average of adjacent secant slopes, zeroed at
    // local extrema and clamped to keep the curve monotone between knots.
    let mut tangents = vec![0.0f64; n];
    tangents[0] = slopes[0];
    tangents[n - 1] = slopes[n - 2];
    for i in 1..n - 1 {
        if slopes[i - 1] * slopes[i] <= 0.0 {
            tangents[i] = 0.0;
        } else {
            tangents[i] = (slopes[i - 1] + slopes[i]) / 2.0;
        }
    }
    for i in 0..n - 1 {
        if slopes[i] == 0.0 {
            tangents[i] = 0.0;
            tangents[i + 1] = 0.0;
            continue;
        }
        let a = tangents[i] / slopes[i];
        let b = tangents[i + 1] / slopes[i];
        let s = a * a + b * b;
        if s > 9.0 {
            let t = 3.0 / s.sqrt();
            tangents[i] = t * a * slopes[i];
            tangents[i + 1] = t * b * slopes[i];
        }
    }

    let mut path = format!("M{:.2},{:.2}", points[0].0, points[0].1);
    for i in 0..n - 1 {
        let dx = points[i + 1].0 - points[i].0;
        let (x0, y0) = points[i];
        let (x1, y1) = points[i + 1];
        let _ = write!(
            path,
            "C{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
            x0 + dx / 3.0,
            y0 + tangents[i] * dx / 3.0,
            x1 - dx / 3.0,
            y1 - tangents[i + 1] * dx / 3.0,
            x1,
            y1
        );
    }
    path
}

// ---------------------------------------------------------------------------
// SVG assembly
// ---------------------------------------------------------------------------

const WIDTH: f64 = 920.0;
const HEIGHT: f64 = 440.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_RIGHT: f64 = 230.0;
const MARGIN_BOTTOM: f64 = 60.0;
const MARGIN_LEFT: f64 = 60.0;

/// Render the full chart document.
///
/// Clears nothing and stores nothing: every call produces a fresh SVG from
/// the series and the current legend state. An empty topic list yields a
/// valid plot area with axes and no lines.
pub fn render_svg(series: &TrendSeries, visibility: &Visibility) -> String {
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let x = PointScale::new(series.years.len(), (0.0, plot_w));
    let y = LinearScale::for_counts(series.max_count(), (plot_h, 0.0));

    let mut svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" "#,
            r#"width="100%" class="trend-chart">"#
        ),
        w = WIDTH,
        h = HEIGHT
    );
    let _ = write!(
        svg,
        r#"<g transform="translate({MARGIN_LEFT},{MARGIN_TOP})">"#
    );

    // Title
    let _ = write!(
        svg,
        concat!(
            r#"<text x="{:.1}" y="-20" text-anchor="middle" font-size="16" "#,
            r#"font-weight="bold" fill="currentColor">Topic Trends Over Time</text>"#
        ),
        plot_w / 2.0
    );

    // Gridlines + y axis
    for tick in y.ticks() {
        let ty = y.position(tick);
        let _ = write!(
            svg,
            r##"<line x1="0" y1="{ty:.1}" x2="{plot_w:.1}" y2="{ty:.1}" stroke="#e0e0e0" stroke-opacity="0.7"/>"##
        );
        let _ = write!(
            svg,
            r#"<text x="-8" y="{:.1}" text-anchor="end" font-size="11" fill="currentColor">{}</text>"#,
            ty + 4.0,
            tick.round() as usize
        );
    }
    let _ = write!(
        svg,
        r#"<line x1="0" y1="0" x2="0" y2="{plot_h:.1}" stroke="currentColor"/>"#
    );

    // X axis with one tick per year
    let _ = write!(
        svg,
        r#"<line x1="0" y1="{plot_h:.1}" x2="{plot_w:.1}" y2="{plot_h:.1}" stroke="currentColor"/>"#
    );
    for (i, year) in series.years.iter().enumerate() {
        let tx = x.position(i);
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11" fill="currentColor">{}</text>"#,
            tx,
            plot_h + 20.0,
            escape(year)
        );
    }

    // Axis labels
    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12" fill="currentColor">Year</text>"#,
        plot_w / 2.0,
        plot_h + 45.0
    );
    let _ = write!(
        svg,
        concat!(
            r#"<text transform="rotate(-90)" x="{:.1}" y="-42" text-anchor="middle" "#,
            r#"font-size="12" fill="currentColor">Number of Documents</text>"#
        ),
        -plot_h / 2.0
    );

    // One line group per topic: path plus markers
    for (ti, topic) in series.topics.iter().enumerate() {
        let color = topic_color(ti);
        let opacity = visibility.opacity(&topic.topic);
        let points: Vec<(f64, f64)> = topic
            .points
            .iter()
            .enumerate()
            .map(|(yi, p)| (x.position(yi), y.position(p.count as f64)))
            .collect();

        let _ = write!(
            svg,
            r#"<g class="line-group" data-topic="{}" style="opacity:{opacity}">"#,
            ti
        );
        let _ = write!(
            svg,
            r#"<path d="{}" fill="none" stroke="{color}" stroke-width="2.5"/>"#,
            monotone_path(&points)
        );
        for (yi, (px, py)) in points.iter().enumerate() {
            let _ = write!(
                svg,
                concat!(
                    r#"<circle class="marker" cx="{:.2}" cy="{:.2}" r="5" fill="{}" "#,
                    r#"stroke="white" stroke-width="1.5" data-topic="{}" data-year="{}"/>"#
                ),
                px, py, color, ti, yi
            );
        }
        svg.push_str("</g>");
    }

    // Legend, to the right of the plot area
    let _ = write!(
        svg,
        r#"<g class="legend" transform="translate({:.1},0)">"#,
        plot_w + 20.0
    );
    for (ti, topic) in series.topics.iter().enumerate() {
        let legend_opacity = if visibility.is_visible(&topic.topic) { 1.0 } else { 0.5 };
        let _ = write!(
            svg,
            concat!(
                r#"<g class="legend-item" data-topic="{}" transform="translate(0,{})" "#,
                r#"style="cursor:pointer;opacity:{}">"#,
                r#"<rect width="18" height="18" fill="{}"/>"#,
                r#"<text x="24" y="13" font-size="12" fill="currentColor">{}</text></g>"#
            ),
            ti,
            ti * 25,
            legend_opacity,
            topic_color(ti),
            escape(&topic.topic)
        );
    }
    svg.push_str("</g></g></svg>");
    svg
}

/// Escape text content and attribute values for SVG/XML.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
