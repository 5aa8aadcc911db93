//! Charts rendered to inline SVG strings with `plotters`.
//!
//! Every chart is drawn on an in-memory [`SVGBackend`]; the returned string is
//! embedded directly in the HTML page. Missing data produces a chart with a
//! placeholder message instead of an error.

use std::ops::Range;

use chrono::DateTime;
use latency_core::error::{ReportError, Result};
use latency_core::formatting::format_number;
use latency_core::percentile::{percentile, sorted};
use plotters::coord::{CoordTranslate, Shift};
use plotters::drawing::DrawingAreaErrorKind;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::FontStyle;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::themes::{ChartSize, Palette};

const FONT: &str = "sans-serif";
const TITLE_PX: f64 = 17.0;
const LABEL_PX: f64 = 11.0;
/// Smallest value drawn on a log axis; zero latencies are clamped to it.
const LOG_FLOOR: f64 = 0.1;
/// Axis bounds never exceed this magnitude so the span stays finite.
const AXIS_LIMIT: f64 = f64::MAX / 4.0;
const POINT_RADIUS: i32 = 3;

type DrawResult<T = ()> = std::result::Result<T, DrawingAreaErrorKind<std::io::Error>>;

// ── Escaping ──────────────────────────────────────────────────────────────────

pub fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ── Drawing helpers ───────────────────────────────────────────────────────────

/// Run `draw` against a fresh SVG canvas and return the document text.
fn render<F>(size: ChartSize, draw: F) -> Result<String>
where
    F: for<'a, 'b> FnOnce(&'a DrawingArea<SVGBackend<'b>, Shift>) -> DrawResult,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (size.width, size.height)).into_drawing_area();
        root.fill(&WHITE)
            .and_then(|()| draw(&root))
            .and_then(|()| root.present())
            .map_err(|e| ReportError::Render(format!("chart drawing failed: {}", e)))?;
    }
    Ok(svg)
}

/// Parse a `#RRGGBB` palette entry.
fn rgb(hex: &str) -> RGBColor {
    let hex = hex.trim_start_matches('#');
    let channel = |at: usize| {
        hex.get(at..at + 2)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .unwrap_or(0)
    };
    RGBColor(channel(0), channel(2), channel(4))
}

fn title_style(palette: &Palette) -> TextStyle<'static> {
    (FONT, TITLE_PX, FontStyle::Bold)
        .into_font()
        .color(&rgb(palette.title))
}

fn label_style(palette: &Palette) -> TextStyle<'static> {
    (FONT, LABEL_PX).into_font().color(&rgb(palette.text))
}

/// Tick label for a value axis: grouped integers, scientific when huge.
fn format_value(value: f64) -> String {
    if value.abs() >= 1e9 {
        format!("{:.1e}", value)
    } else if value.abs() >= 10.0 || value == 0.0 {
        format_number(value, 0)
    } else {
        format_number(value, 2)
    }
}

/// Smallest and largest finite value.
fn finite_bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Linear axis range covering `lo..=hi` with headroom above.
///
/// The range is always finite and non-empty, whatever the data.
fn value_range(lo: f64, hi: f64) -> Range<f64> {
    let lo = lo.clamp(-AXIS_LIMIT, AXIS_LIMIT);
    let hi = hi.clamp(lo, AXIS_LIMIT);
    if hi - lo <= f64::EPSILON * hi.abs().max(1.0) {
        let pad = (lo.abs() * 0.05).max(1.0);
        return if lo == 0.0 {
            0.0..pad
        } else {
            (lo - pad)..(hi + pad)
        };
    }
    lo..hi + (hi - lo) * 0.05
}

/// Logarithmic axis range; values at or below zero sit on [`LOG_FLOOR`].
fn log_range(lo: f64, hi: f64) -> Range<f64> {
    let lo = lo.clamp(LOG_FLOOR, AXIS_LIMIT);
    let hi = hi.clamp(lo, AXIS_LIMIT);
    (lo / 2.0)..(hi * 2.0)
}

/// Pin `value` inside `range`; NaN goes to the lower bound.
fn clip(value: f64, range: &Range<f64>) -> f64 {
    if value.is_nan() {
        range.start
    } else {
        value.clamp(range.start, range.end)
    }
}

// ── Axes ──────────────────────────────────────────────────────────────────────

/// How numeric axis values are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisFormat {
    Number,
    /// Values are Unix seconds, labelled as `MM-DD HH:MM` (UTC).
    Clock,
}

impl AxisFormat {
    fn label(&self, value: f64) -> String {
        match self {
            Self::Number => format_value(value),
            Self::Clock => DateTime::from_timestamp(value.round() as i64, 0)
                .map(|dt| dt.format("%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Vertical axis kind of an [`XyChart`].
#[derive(Debug, Clone, PartialEq)]
pub enum YAxis {
    Linear,
    Log,
    /// Points carry a category index as their y value.
    Categories(Vec<String>),
}

/// Categorical axis laid over a numeric coordinate: each category owns one
/// whole number, labelled with its name.
struct Categories<'a> {
    names: &'a [String],
    /// First category at the top of a vertical axis.
    top_down: bool,
}

impl<'a> Categories<'a> {
    fn horizontal(names: &'a [String]) -> Self {
        Self {
            names,
            top_down: false,
        }
    }

    fn vertical(names: &'a [String]) -> Self {
        Self {
            names,
            top_down: true,
        }
    }

    fn len(&self) -> usize {
        self.names.len()
    }

    fn range(&self) -> Range<f64> {
        -0.5..self.len().max(1) as f64 - 0.5
    }

    fn position(&self, index: usize) -> f64 {
        if self.top_down {
            self.len().saturating_sub(index + 1) as f64
        } else {
            index as f64
        }
    }

    fn label(&self, value: f64) -> String {
        let slot = value.round();
        if (value - slot).abs() > 1e-6 || slot < 0.0 || slot as usize >= self.len() {
            return String::new();
        }
        let slot = slot as usize;
        let index = if self.top_down {
            self.len() - 1 - slot
        } else {
            slot
        };
        self.names[index].clone()
    }
}

/// Series key, one row per entry so no name is ever dropped.
fn draw_legend<'a, CT>(ctx: &mut ChartContext<'a, SVGBackend<'a>, CT>, palette: &Palette) -> DrawResult
where
    CT: CoordTranslate,
{
    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.85))
        .border_style(&rgb(palette.table_border))
        .label_font(label_style(palette))
        .draw()
}

/// A chart with only a title and a centred message.
pub fn empty_chart(title: &str, message: &str, palette: &Palette, size: ChartSize) -> Result<String> {
    render(size, |root| {
        let area = root.titled(title, title_style(palette))?;
        let (width, height) = area.dim_in_pixel();
        area.draw(&Text::new(
            message.to_string(),
            (width as i32 / 2, height as i32 / 2),
            (FONT, 14.0)
                .into_font()
                .color(&rgb(palette.muted))
                .pos(Pos::new(HPos::Center, VPos::Center)),
        ))
    })
}

// ── Bar charts ────────────────────────────────────────────────────────────────

/// One coloured series of a [`BarChart`], one value per category.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
    /// Fixed upper bound of the value axis.
    pub y_max: Option<f64>,
    /// Draw each value above its bar, followed by this suffix.
    pub value_suffix: Option<String>,
}

/// Vertical bars, grouped per category when there are several series.
pub fn bar_chart(chart: &BarChart, palette: &Palette, size: ChartSize) -> Result<String> {
    if chart.categories.is_empty() || chart.series.is_empty() {
        return empty_chart(&chart.title, "No data", palette, size);
    }

    let axis = Categories::horizontal(&chart.categories);
    let data_max = finite_bounds(chart.series.iter().flat_map(|s| s.values.iter().copied()))
        .map_or(0.0, |(_, hi)| hi.max(0.0));
    let y_range = value_range(0.0, chart.y_max.map_or(data_max, |m| m.max(data_max)));
    let band = 0.8 / chart.series.len() as f64;
    let grid = rgb(palette.grid);
    let value_style = (FONT, LABEL_PX, FontStyle::Bold)
        .into_font()
        .color(&rgb(palette.text))
        .pos(Pos::new(HPos::Center, VPos::Bottom));

    render(size, |root| {
        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, title_style(palette))
            .margin(12)
            .x_label_area_size(44)
            .y_label_area_size(70)
            .build_cartesian_2d(axis.range(), y_range.clone())?;

        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(axis.len())
            .x_label_formatter(&|v: &f64| axis.label(*v))
            .y_label_formatter(&|v: &f64| format_value(*v))
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .label_style(label_style(palette))
            .axis_desc_style(label_style(palette))
            .bold_line_style(&grid)
            .light_line_style(&WHITE)
            .draw()?;

        for (s, series) in chart.series.iter().enumerate() {
            let color = rgb(palette.series_color(s));
            let bars: Vec<(f64, f64)> = series
                .values
                .iter()
                .take(axis.len())
                .enumerate()
                .map(|(c, value)| (axis.position(c) - 0.4 + band * s as f64, clip(*value, &y_range)))
                .collect();

            ctx.draw_series(bars.iter().map(|&(x, top)| {
                Rectangle::new([(x, y_range.start), (x + band * 0.95, top)], color.filled())
            }))?
            .label(series.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));

            if let Some(suffix) = &chart.value_suffix {
                ctx.draw_series(series.values.iter().zip(&bars).map(|(value, &(x, top))| {
                    Text::new(
                        format!("{}{}", format_number(*value, 1), suffix),
                        (x + band * 0.475, top),
                        value_style.clone(),
                    )
                }))?;
            }
        }

        if chart.series.len() > 1 {
            draw_legend(&mut ctx, palette)?;
        }
        Ok(())
    })
}

/// Horizontal bars, one per `(label, value)` item, top to bottom.
pub fn horizontal_bar_chart(
    title: &str,
    x_label: &str,
    items: &[(String, f64)],
    color: &str,
    palette: &Palette,
    size: ChartSize,
) -> Result<String> {
    if items.is_empty() {
        return empty_chart(title, "No data", palette, size);
    }

    let names: Vec<String> = items.iter().map(|(label, _)| label.clone()).collect();
    let axis = Categories::vertical(&names);
    let max = finite_bounds(items.iter().map(|(_, v)| *v)).map_or(0.0, |(_, hi)| hi.max(0.0));
    let x_range = value_range(0.0, max);
    let fill = rgb(color);
    let grid = rgb(palette.grid);
    let widest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
    let label_area = (widest as f64 * LABEL_PX * 0.6 + 16.0).clamp(70.0, size.width as f64 * 0.4);

    render(size, |root| {
        let mut ctx = ChartBuilder::on(root)
            .caption(title, title_style(palette))
            .margin(12)
            .x_label_area_size(44)
            .y_label_area_size(label_area as u32)
            .build_cartesian_2d(x_range.clone(), axis.range())?;

        ctx.configure_mesh()
            .disable_y_mesh()
            .y_labels(axis.len())
            .y_label_formatter(&|v: &f64| axis.label(*v))
            .x_label_formatter(&|v: &f64| format_value(*v))
            .x_desc(x_label)
            .label_style(label_style(palette))
            .axis_desc_style(label_style(palette))
            .bold_line_style(&grid)
            .light_line_style(&WHITE)
            .draw()?;

        ctx.draw_series(items.iter().enumerate().map(|(i, (_, value))| {
            let y = axis.position(i);
            Rectangle::new(
                [(x_range.start, y - 0.35), (clip(*value, &x_range), y + 0.35)],
                fill.filled(),
            )
        }))?;
        Ok(())
    })
}

// ── Box plots ─────────────────────────────────────────────────────────────────

/// Five-number summary with Tukey whiskers (1.5 × IQR).
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let data = sorted(values.iter().copied());
        if data.is_empty() {
            return None;
        }
        let q1 = percentile(&data, 25.0);
        let median = percentile(&data, 50.0);
        let q3 = percentile(&data, 75.0);
        let reach = 1.5 * (q3 - q1);
        let (low_fence, high_fence) = (q1 - reach, q3 + reach);

        let inside: Vec<f64> = data
            .iter()
            .copied()
            .filter(|v| *v >= low_fence && *v <= high_fence)
            .collect();
        Some(Self {
            q1,
            median,
            q3,
            whisker_low: inside.first().copied().unwrap_or(q1),
            whisker_high: inside.last().copied().unwrap_or(q3),
            outliers: data
                .iter()
                .copied()
                .filter(|v| *v < low_fence || *v > high_fence)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub groups: Vec<(String, Vec<f64>)>,
    pub log_scale: bool,
}

/// Boxes, whiskers, medians and outliers for each group, on any y scale.
fn draw_boxes<CT>(
    ctx: &mut ChartContext<'_, SVGBackend<'_>, CT>,
    axis: &Categories<'_>,
    stats: &[BoxStats],
    y_range: &Range<f64>,
    palette: &Palette,
) -> DrawResult
where
    CT: CoordTranslate<From = (f64, f64)>,
{
    let edge = rgb(palette.axis);
    let median = rgb(palette.title);
    for (i, s) in stats.iter().enumerate() {
        let cx = axis.position(i);
        let y = |v: f64| clip(v, y_range);
        let fill = rgb(palette.series_color(i)).mix(0.75);
        let half = 0.3;

        ctx.draw_series([
            PathElement::new(vec![(cx, y(s.whisker_low)), (cx, y(s.whisker_high))], edge),
            PathElement::new(
                vec![(cx - half / 2.0, y(s.whisker_low)), (cx + half / 2.0, y(s.whisker_low))],
                edge,
            ),
            PathElement::new(
                vec![(cx - half / 2.0, y(s.whisker_high)), (cx + half / 2.0, y(s.whisker_high))],
                edge,
            ),
        ])?;
        ctx.draw_series([
            Rectangle::new([(cx - half, y(s.q1)), (cx + half, y(s.q3))], fill.filled()),
            Rectangle::new([(cx - half, y(s.q1)), (cx + half, y(s.q3))], edge.stroke_width(1)),
        ])?;
        ctx.draw_series(std::iter::once(PathElement::new(
            vec![(cx - half, y(s.median)), (cx + half, y(s.median))],
            median.stroke_width(2),
        )))?;
        ctx.draw_series(
            s.outliers
                .iter()
                .map(|v| Circle::new((cx, y(*v)), POINT_RADIUS, edge.stroke_width(1))),
        )?;
    }
    Ok(())
}

pub fn box_plot(chart: &BoxPlot, palette: &Palette, size: ChartSize) -> Result<String> {
    let (names, stats): (Vec<String>, Vec<BoxStats>) = chart
        .groups
        .iter()
        .filter_map(|(name, values)| BoxStats::from_values(values).map(|s| (name.clone(), s)))
        .unzip();
    let Some((lo, hi)) = finite_bounds(stats.iter().flat_map(|s| {
        [s.whisker_low, s.whisker_high]
            .into_iter()
            .chain(s.outliers.iter().copied())
    })) else {
        return empty_chart(&chart.title, "No data", palette, size);
    };

    let axis = Categories::horizontal(&names);
    let grid = rgb(palette.grid);

    render(size, |root| {
        let mut builder = ChartBuilder::on(root);
        builder
            .caption(&chart.title, title_style(palette))
            .margin(12)
            .x_label_area_size(44)
            .y_label_area_size(70);

        if chart.log_scale {
            let y_range = log_range(lo, hi);
            let mut ctx = builder.build_cartesian_2d(axis.range(), y_range.clone().log_scale())?;
            ctx.configure_mesh()
                .disable_x_mesh()
                .x_labels(axis.len())
                .x_label_formatter(&|v: &f64| axis.label(*v))
                .y_label_formatter(&|v: &f64| format_value(*v))
                .x_desc(chart.x_label.as_str())
                .y_desc(chart.y_label.as_str())
                .label_style(label_style(palette))
                .axis_desc_style(label_style(palette))
                .bold_line_style(&grid)
                .light_line_style(&WHITE)
                .draw()?;
            draw_boxes(&mut ctx, &axis, &stats, &y_range, palette)
        } else {
            let y_range = value_range(lo.min(0.0), hi);
            let mut ctx = builder.build_cartesian_2d(axis.range(), y_range.clone())?;
            ctx.configure_mesh()
                .disable_x_mesh()
                .x_labels(axis.len())
                .x_label_formatter(&|v: &f64| axis.label(*v))
                .y_label_formatter(&|v: &f64| format_value(*v))
                .x_desc(chart.x_label.as_str())
                .y_desc(chart.y_label.as_str())
                .label_style(label_style(palette))
                .axis_desc_style(label_style(palette))
                .bold_line_style(&grid)
                .light_line_style(&WHITE)
                .draw()?;
            draw_boxes(&mut ctx, &axis, &stats, &y_range, palette)
        }
    })
}

// ── Scatter and line charts ───────────────────────────────────────────────────

/// Named set of `(x, y)` points drawn in one colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XyChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_format: AxisFormat,
    pub y_axis: YAxis,
    pub series: Vec<Series>,
    /// Connect each series' points in x order.
    pub lines: bool,
    /// Overlay a least-squares line through all points.
    pub trend: bool,
}

/// Points, lines, trend and legend of an [`XyChart`] on a built context.
///
/// `place` maps a data point into chart coordinates.
fn draw_xy<'a, CT>(
    ctx: &mut ChartContext<'a, SVGBackend<'a>, CT>,
    chart: &XyChart,
    place: &dyn Fn((f64, f64)) -> (f64, f64),
    palette: &Palette,
) -> DrawResult
where
    CT: CoordTranslate<From = (f64, f64)>,
{
    for (i, series) in chart.series.iter().enumerate() {
        let color = rgb(palette.series_color(i));
        if chart.lines && series.points.len() > 1 {
            let mut points: Vec<(f64, f64)> = series.points.iter().map(|p| place(*p)).collect();
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            ctx.draw_series(LineSeries::new(points, color.mix(0.8).stroke_width(2)))?;
        }
        ctx.draw_series(
            series
                .points
                .iter()
                .map(|p| Circle::new(place(*p), POINT_RADIUS, color.mix(0.7).filled())),
        )?
        .label(series.name.as_str())
        .legend(move |(x, y)| Circle::new((x + 6, y), 4, color.filled()));
    }

    if chart.trend && chart.y_axis == YAxis::Linear {
        let all: Vec<(f64, f64)> = chart
            .series
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .collect();
        let fit = least_squares(&all).filter(|(slope, intercept)| slope.is_finite() && intercept.is_finite());
        if let (Some((slope, intercept)), Some((x_lo, x_hi))) =
            (fit, finite_bounds(all.iter().map(|(x, _)| *x)))
        {
            let trend = rgb(palette.trend);
            ctx.draw_series(LineSeries::new(
                [x_lo, x_hi].map(|x| place((x, slope * x + intercept))),
                trend.mix(0.6).stroke_width(2),
            ))?
            .label("Trend")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 12, y)], trend.stroke_width(2)));
        }
    }

    if chart.series.len() > 1 || chart.x_format == AxisFormat::Clock || chart.trend {
        draw_legend(ctx, palette)?;
    }
    Ok(())
}

pub fn xy_chart(chart: &XyChart, palette: &Palette, size: ChartSize) -> Result<String> {
    let all_points = || chart.series.iter().flat_map(|s| s.points.iter().copied());
    let (Some((x_lo, x_hi)), Some((y_lo, y_hi))) = (
        finite_bounds(all_points().map(|(x, _)| x)),
        finite_bounds(all_points().map(|(_, y)| y)),
    ) else {
        return empty_chart(&chart.title, "No data", palette, size);
    };

    let x_range = value_range(x_lo, x_hi);
    let x_format = chart.x_format;
    let grid = rgb(palette.grid);

    render(size, |root| {
        let mut builder = ChartBuilder::on(root);
        builder
            .caption(&chart.title, title_style(palette))
            .margin(12)
            .x_label_area_size(44);

        match &chart.y_axis {
            YAxis::Categories(names) => {
                let axis = Categories::vertical(names);
                let widest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
                let label_area =
                    (widest as f64 * LABEL_PX * 0.6 + 16.0).clamp(70.0, size.width as f64 * 0.4);
                let mut ctx = builder
                    .y_label_area_size(label_area as u32)
                    .build_cartesian_2d(x_range.clone(), axis.range())?;
                ctx.configure_mesh()
                    .y_labels(axis.len())
                    .y_label_formatter(&|v: &f64| axis.label(*v))
                    .x_label_formatter(&|v: &f64| x_format.label(*v))
                    .x_desc(chart.x_label.as_str())
                    .y_desc(chart.y_label.as_str())
                    .label_style(label_style(palette))
                    .axis_desc_style(label_style(palette))
                    .bold_line_style(&grid)
                    .light_line_style(&WHITE)
                    .draw()?;
                let place = |(x, y): (f64, f64)| {
                    (clip(x, &x_range), axis.position(y.max(0.0).round() as usize))
                };
                draw_xy(&mut ctx, chart, &place, palette)
            }
            YAxis::Log => {
                let y_range = log_range(y_lo, y_hi);
                let mut ctx = builder
                    .y_label_area_size(70)
                    .build_cartesian_2d(x_range.clone(), y_range.clone().log_scale())?;
                ctx.configure_mesh()
                    .x_label_formatter(&|v: &f64| x_format.label(*v))
                    .y_label_formatter(&|v: &f64| format_value(*v))
                    .x_desc(chart.x_label.as_str())
                    .y_desc(chart.y_label.as_str())
                    .label_style(label_style(palette))
                    .axis_desc_style(label_style(palette))
                    .bold_line_style(&grid)
                    .light_line_style(&WHITE)
                    .draw()?;
                let place = |(x, y): (f64, f64)| (clip(x, &x_range), clip(y, &y_range));
                draw_xy(&mut ctx, chart, &place, palette)
            }
            YAxis::Linear => {
                let y_range = value_range(y_lo.min(0.0), y_hi);
                let mut ctx = builder
                    .y_label_area_size(70)
                    .build_cartesian_2d(x_range.clone(), y_range.clone())?;
                ctx.configure_mesh()
                    .x_label_formatter(&|v: &f64| x_format.label(*v))
                    .y_label_formatter(&|v: &f64| format_value(*v))
                    .x_desc(chart.x_label.as_str())
                    .y_desc(chart.y_label.as_str())
                    .label_style(label_style(palette))
                    .axis_desc_style(label_style(palette))
                    .bold_line_style(&grid)
                    .light_line_style(&WHITE)
                    .draw()?;
                let place = |(x, y): (f64, f64)| (clip(x, &x_range), clip(y, &y_range));
                draw_xy(&mut ctx, chart, &place, palette)
            }
        }
    })
}

/// `(slope, intercept)` of the least-squares fit, `None` without x spread.
pub fn least_squares(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

// ── Pie chart ─────────────────────────────────────────────────────────────────

/// Pie of `(label, value)` slices with percentage labels.
///
/// Slice colours come from [`Palette::pastel_color`] in item order.
pub fn pie_chart(title: &str, slices: &[(String, f64)], palette: &Palette, size: ChartSize) -> Result<String> {
    let sizes: Vec<f64> = slices
        .iter()
        .map(|(_, v)| if v.is_finite() { v.max(0.0) } else { 0.0 })
        .collect();
    if sizes.iter().sum::<f64>() <= 0.0 {
        return empty_chart(title, "No data", palette, size);
    }
    let colors: Vec<RGBColor> = (0..slices.len())
        .map(|i| rgb(palette.pastel_color(i)))
        .collect();
    let labels: Vec<&str> = slices.iter().map(|(label, _)| label.as_str()).collect();

    render(size, |root| {
        let area = root.titled(title, title_style(palette))?;
        let (width, height) = area.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = (f64::from(width.min(height)) / 2.0 - 28.0).max(10.0);

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.0);
        pie.label_style(label_style(palette));
        pie.percentages((FONT, 10.0).into_font().color(&rgb(palette.text)));
        area.draw(&pie)
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
