//! Report pages, each rendered as one `<section class="page">`.
//!
//! Page builders return `Ok(None)` when the data needed for the page is
//! absent; the page is then left out of the document. Chart failures abort the
//! whole document.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use latency_core::error::Result;
use latency_core::formatting::{format_number, format_rate};
use latency_core::models::Record;
use latency_data::aggregator::{IncidentKind, LatencyAggregator};
use latency_data::analysis::AnalysisResult;

use crate::svg::{
    bar_chart, box_plot, horizontal_bar_chart, pie_chart, xml_escape, xy_chart, AxisFormat,
    BarChart, BarSeries, BoxPlot, Series, XyChart, YAxis,
};
use crate::text_dump::wrap_text;
use crate::themes::{ChartSize, ReportConfig};

/// Inputs shared by every page builder.
pub struct PageContext<'a> {
    pub result: &'a AnalysisResult,
    pub config: &'a ReportConfig,
    pub run_name: &'a str,
}

type PageBuilder = fn(&PageContext<'_>) -> Result<Option<String>>;

/// Page builders in document order.
const PAGES: &[(&str, PageBuilder)] = &[
    ("summary", summary_page),
    ("failures", failure_page),
    ("percentiles", percentile_page),
    ("connectivity", connectivity_page),
    ("signal", signal_page),
    ("distribution", distribution_page),
    ("time_series", time_series_page),
    ("averages", average_page),
    ("status_codes", status_code_page),
    ("slowest", slowest_calls_page),
];

/// Render every applicable page in order.
pub fn build_pages(ctx: &PageContext<'_>) -> Result<Vec<String>> {
    let mut pages = Vec::with_capacity(PAGES.len());
    for (name, build) in PAGES {
        match build(ctx)? {
            Some(page) => pages.push(page),
            None => tracing::debug!("skipping page {}: no data", name),
        }
    }
    Ok(pages)
}

// ── Shared helpers ────────────────────────────────────────────────────────────

fn section(class: &str, title: &str, color: &str, body: &str) -> String {
    format!(
        "<section class=\"page {class}\">\n<h1 style=\"color:{color}\">{}</h1>\n{body}\n</section>",
        xml_escape(title)
    )
}

fn figure(svg: String) -> String {
    format!("<figure>{svg}</figure>")
}

fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_millis()) / 1000.0
}

/// Latencies grouped by a string key, keys sorted; `None` keys skipped.
fn latencies_by<'a>(
    records: impl Iterator<Item = &'a Record>,
    key: impl Fn(&'a Record) -> Option<&'a str>,
) -> Vec<(String, Vec<f64>)> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(k) = key(record) {
            groups.entry(k).or_default().push(record.latency_ms);
        }
    }
    groups
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Latency-over-time series, one per API.
fn time_series<'a>(records: impl Iterator<Item = &'a Record>) -> Vec<Series> {
    let mut by_api: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for record in records {
        by_api
            .entry(record.api_name.as_str())
            .or_default()
            .push((epoch_seconds(record.timestamp), record.latency_ms));
    }
    by_api
        .into_iter()
        .map(|(name, points)| Series {
            name: name.to_string(),
            points,
        })
        .collect()
}

fn html_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table>\n<thead><tr>");
    for header in headers {
        html.push_str(&format!("<th>{}</th>", xml_escape(header)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

// ── 1. Summary ────────────────────────────────────────────────────────────────

fn summary_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let result = ctx.result;
    let palette = &ctx.config.palette;
    let metrics = &result.metrics;
    let mut body = String::new();

    body.push_str(&format!(
        "<p class=\"subtitle\" style=\"color:{}\">API Latency Analysis Report</p>\n",
        palette.muted
    ));
    body.push_str(&format!(
        "<h2 style=\"color:{}\">Executive Summary</h2>\n",
        palette.section
    ));
    body.push_str(&format!(
        "<p>Analysis of {} APIs ({} total calls):</p>\n<div class=\"insights\">\n",
        result.metadata.api_count, metrics.total_calls
    ));
    for insight in &result.insights {
        let lines: Vec<String> = wrap_text(&insight.message, ctx.config.wrap_width)
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let prefix = if i == 0 { "&#8226; " } else { "&#160;&#160;" };
                format!("{}{}", prefix, xml_escape(line))
            })
            .collect();
        body.push_str(&format!(
            "<p class=\"insight\" style=\"color:{};font-weight:{}\">{}</p>\n",
            insight.severity.color(),
            if insight.emphasized { "bold" } else { "normal" },
            lines.join("<br>")
        ));
    }
    body.push_str("</div>\n");

    body.push_str(&format!(
        "<h2 style=\"color:{}\">Statistical Overview</h2>\n",
        palette.section
    ));
    let rows: Vec<Vec<String>> = metrics
        .apis
        .iter()
        .map(|api| {
            vec![
                xml_escape(&api.api_name),
                api.count.to_string(),
                format!("{:.0}", api.mean_ms.unwrap_or(0.0)),
                format!("{:.0}", api.max_ms.unwrap_or(0.0)),
                format!("{}%", format_rate(api.error_rate)),
            ]
        })
        .collect();
    body.push_str(&html_table(
        &["API Name", "Count", "Mean (ms)", "Max (ms)", "Error %"],
        &rows,
    ));

    let mut notes = vec![format!(
        "Throughput: {} calls/minute",
        format_number(metrics.throughput_per_minute, 2)
    )];
    if let (Some(first), Some(last)) = (metrics.first_timestamp, metrics.last_timestamp) {
        notes.push(format!(
            "Time range: {} to {} (UTC)",
            first.format("%Y-%m-%d %H:%M:%S"),
            last.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    notes.push(format!(
        "Files: {} loaded, {} skipped",
        result.load.files_loaded, result.load.files_skipped
    ));
    let cleaning = &result.cleaning;
    notes.push(format!(
        "Records: {} read, {} dropped as unparsable, {} before {}, {} with unknown status",
        cleaning.rows_in,
        cleaning.dropped_missing,
        cleaning.dropped_before_cutoff,
        result.metadata.cutoff.get(..10).unwrap_or(result.metadata.cutoff.as_str()),
        cleaning.status_defaulted
    ));
    body.push_str(&format!(
        "\n<ul class=\"diagnostics\" style=\"color:{}\">\n{}\n</ul>",
        palette.muted,
        notes
            .iter()
            .map(|n| format!("<li>{}</li>", xml_escape(n)))
            .collect::<Vec<_>>()
            .join("\n")
    ));

    Ok(Some(section("summary", ctx.run_name, palette.title, &body)))
}

// ── 2. Failures ───────────────────────────────────────────────────────────────

fn failure_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let incidents = &ctx.result.metrics.incidents;
    if incidents.is_empty() {
        return Ok(None);
    }
    let palette = &ctx.config.palette;
    let size = ctx.config.half_chart();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for incident in incidents {
        *counts.entry(incident.api_name.as_str()).or_default() += 1;
    }
    let mut per_api: Vec<(String, f64)> = counts
        .iter()
        .map(|(api, n)| (api.to_string(), *n as f64))
        .collect();
    per_api.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let api_names: Vec<String> = per_api.iter().map(|(api, _)| api.clone()).collect();
    let mut by_kind: BTreeMap<IncidentKind, Vec<(f64, f64)>> = BTreeMap::new();
    for incident in incidents {
        let row = api_names
            .iter()
            .position(|name| *name == incident.api_name)
            .unwrap_or(0);
        by_kind
            .entry(incident.kind)
            .or_default()
            .push((epoch_seconds(incident.timestamp), row as f64));
    }

    let timeline = XyChart {
        title: "Incident Timeline".to_string(),
        x_label: "Time".to_string(),
        y_label: "API Name".to_string(),
        x_format: AxisFormat::Clock,
        y_axis: YAxis::Categories(api_names),
        series: by_kind
            .into_iter()
            .map(|(kind, points)| Series {
                name: kind.label(),
                points,
            })
            .collect(),
        lines: false,
        trend: false,
    };

    let body = [
        figure(horizontal_bar_chart(
            "Incident Count per API",
            "Count of Incidents",
            &per_api,
            palette.critical,
            palette,
            size,
        )?),
        figure(xy_chart(&timeline, palette, size)?),
    ]
    .join("\n");
    Ok(Some(section(
        "failures",
        "Failure & High Latency Analysis",
        palette.critical,
        &body,
    )))
}

// ── 3. Percentiles ────────────────────────────────────────────────────────────

fn percentile_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let by_api = LatencyAggregator::percentiles_by_api(&ctx.result.table);
    if by_api.is_empty() {
        return Ok(None);
    }

    let series = ["P50", "P90", "P95", "P99"]
        .iter()
        .enumerate()
        .map(|(i, label)| BarSeries {
            name: label.to_string(),
            values: by_api.values().map(|p| p.labelled()[i].1).collect(),
        })
        .collect();
    let chart = BarChart {
        title: "Latency Percentiles (P50, P90, P95, P99) - Success Only".to_string(),
        x_label: "API Name".to_string(),
        y_label: "Latency (ms)".to_string(),
        categories: by_api.keys().cloned().collect(),
        series,
        y_max: None,
        value_suffix: None,
    };

    let palette = &ctx.config.palette;
    Ok(Some(section(
        "percentiles",
        "Latency Percentiles",
        palette.title,
        &figure(bar_chart(&chart, palette, ctx.config.chart)?),
    )))
}

// ── 4. Connectivity ───────────────────────────────────────────────────────────

fn connectivity_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let metrics = &ctx.result.metrics;
    let (Some(summary), Some(failure_rates)) =
        (&metrics.connectivity, &metrics.failure_rate_by_state)
    else {
        return Ok(None);
    };
    let palette = &ctx.config.palette;
    let half = ctx.config.half_chart();

    let slices: Vec<(String, f64)> = summary
        .states
        .iter()
        .map(|s| (s.state.clone(), s.count as f64))
        .collect();
    let pie_size = ChartSize {
        width: half.width / 2,
        height: half.height,
    };
    let total: usize = summary.states.iter().map(|s| s.count).sum();
    let rows: Vec<Vec<String>> = summary
        .states
        .iter()
        .enumerate()
        .map(|(i, s)| {
            vec![
                format!(
                    "<span class=\"swatch\" style=\"background:{}\"></span>{}",
                    palette.pastel_color(i),
                    xml_escape(&s.state)
                ),
                s.count.to_string(),
                format!("{}%", format_rate(s.count as f64 / total.max(1) as f64)),
            ]
        })
        .collect();

    let chart = BarChart {
        title: "Failure Rate by Connection State".to_string(),
        x_label: "Connection State".to_string(),
        y_label: "Failure Rate (%)".to_string(),
        categories: failure_rates.keys().cloned().collect(),
        series: vec![BarSeries {
            name: "Failure Rate (%)".to_string(),
            values: failure_rates.values().map(|r| r * 100.0).collect(),
        }],
        y_max: Some(100.0),
        value_suffix: Some("%".to_string()),
    };

    let body = format!(
        "<div class=\"row\">\n{}\n<div class=\"state-table\">\n<h3>State Statistics</h3>\n{}\n</div>\n</div>\n{}",
        figure(pie_chart("Connection State Distribution", &slices, palette, pie_size)?),
        html_table(&["State", "Count", "%"], &rows),
        figure(bar_chart(&chart, palette, half)?)
    );
    Ok(Some(section(
        "connectivity",
        "Cellular Connectivity Overview",
        palette.section,
        &body,
    )))
}

// ── 5. Signal ─────────────────────────────────────────────────────────────────

fn signal_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let table = &ctx.result.table;
    if !table.has_connection_state() {
        return Ok(None);
    }
    let palette = &ctx.config.palette;
    let half = ctx.config.half_chart();

    let by_state = BoxPlot {
        title: "Latency Distribution by Connection State".to_string(),
        x_label: "Connection State".to_string(),
        y_label: "Latency (ms) - Log Scale".to_string(),
        groups: latencies_by(table.iter(), |r| r.connection_state.as_deref()),
        log_scale: true,
    };
    let mut body = figure(box_plot(&by_state, palette, half)?);

    if table.has_signal_strength() {
        let mut by_state: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
        for record in table {
            if let (Some(signal), Some(state)) =
                (record.signal_strength, record.connection_state.as_deref())
            {
                if signal > 0.0 {
                    by_state
                        .entry(state)
                        .or_default()
                        .push((signal, record.latency_ms));
                }
            }
        }
        let scatter = XyChart {
            title: "Signal Strength vs Latency".to_string(),
            x_label: "Signal Strength (%)".to_string(),
            y_label: "Latency (ms)".to_string(),
            x_format: AxisFormat::Number,
            y_axis: YAxis::Linear,
            series: by_state
                .into_iter()
                .map(|(state, points)| Series {
                    name: state.to_string(),
                    points,
                })
                .collect(),
            lines: false,
            trend: true,
        };
        body.push('\n');
        body.push_str(&figure(xy_chart(&scatter, palette, half)?));
    }

    Ok(Some(section(
        "signal",
        "Cellular Signal & Latency Analysis",
        palette.section,
        &body,
    )))
}

// ── 6. Distribution ───────────────────────────────────────────────────────────

fn distribution_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let table = &ctx.result.table;
    let palette = &ctx.config.palette;
    let half = ctx.config.half_chart();

    let chart = |title: &str, groups: Vec<(String, Vec<f64>)>| {
        box_plot(
            &BoxPlot {
                title: title.to_string(),
                x_label: "API Name".to_string(),
                y_label: "Latency (ms)".to_string(),
                groups,
                log_scale: false,
            },
            palette,
            half,
        )
        .map(figure)
    };

    let body = [
        chart(
            "API Latency Distribution by API (All Data)",
            latencies_by(table.iter(), |r| Some(r.api_name.as_str())),
        )?,
        chart(
            "API Latency Distribution by API (Success Only)",
            latencies_by(table.successes(), |r| Some(r.api_name.as_str())),
        )?,
    ]
    .join("\n");
    Ok(Some(section("distribution", "Latency Distribution", palette.title, &body)))
}

// ── 7. Latency over time ──────────────────────────────────────────────────────

fn time_series_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let table = &ctx.result.table;
    let palette = &ctx.config.palette;
    let half = ctx.config.half_chart();

    let chart = |title: &str, series: Vec<Series>| {
        xy_chart(
            &XyChart {
                title: title.to_string(),
                x_label: "Time".to_string(),
                y_label: "Latency (ms)".to_string(),
                x_format: AxisFormat::Clock,
                y_axis: YAxis::Linear,
                series,
                lines: true,
                trend: false,
            },
            palette,
            half,
        )
        .map(figure)
    };

    let mut body = chart("API Latency Over Time (All Data)", time_series(table.iter()))?;
    if ctx.result.metrics.status.success > 0 {
        body.push('\n');
        body.push_str(&chart(
            "API Latency Over Time (Success Only)",
            time_series(table.successes()),
        )?);
    }
    Ok(Some(section("time-series", "Latency Over Time", palette.title, &body)))
}

// ── 8. Averages ───────────────────────────────────────────────────────────────

fn average_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let table = &ctx.result.table;
    let palette = &ctx.config.palette;
    let half = ctx.config.half_chart();

    let chart = |title: &str, means: BTreeMap<String, f64>| {
        bar_chart(
            &BarChart {
                title: title.to_string(),
                x_label: "API Name".to_string(),
                y_label: "Average Latency (ms)".to_string(),
                categories: means.keys().cloned().collect(),
                series: vec![BarSeries {
                    name: "Average Latency (ms)".to_string(),
                    values: means.values().copied().collect(),
                }],
                y_max: None,
                value_suffix: None,
            },
            palette,
            half,
        )
        .map(figure)
    };

    let all_means = ctx
        .result
        .metrics
        .descriptions
        .iter()
        .map(|d| (d.api_name.clone(), d.mean))
        .collect();
    let mut body = chart("Average API Latency (All Data)", all_means)?;
    let success_means = LatencyAggregator::mean_latency_by_api(table, true);
    if !success_means.is_empty() {
        body.push('\n');
        body.push_str(&chart("Average API Latency (Success Only)", success_means)?);
    }
    Ok(Some(section("averages", "Average Latency", palette.title, &body)))
}

// ── 9. Status codes ───────────────────────────────────────────────────────────

fn status_code_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let counts = &ctx.result.metrics.status_counts;
    let codes: BTreeSet<i32> = counts.values().flat_map(|m| m.keys().copied()).collect();
    let chart = BarChart {
        title: "API Call Status Code Distribution".to_string(),
        x_label: "API Name".to_string(),
        y_label: "Count".to_string(),
        categories: counts.keys().cloned().collect(),
        series: codes
            .iter()
            .map(|code| BarSeries {
                name: code.to_string(),
                values: counts
                    .values()
                    .map(|m| m.get(code).copied().unwrap_or(0) as f64)
                    .collect(),
            })
            .collect(),
        y_max: None,
        value_suffix: None,
    };
    let palette = &ctx.config.palette;
    Ok(Some(section(
        "status-codes",
        "Status Codes",
        palette.title,
        &figure(bar_chart(&chart, palette, ctx.config.chart)?),
    )))
}

// ── 10. Slowest calls ─────────────────────────────────────────────────────────

fn slowest_calls_page(ctx: &PageContext<'_>) -> Result<Option<String>> {
    let slowest = &ctx.result.metrics.slowest;
    if slowest.is_empty() {
        return Ok(None);
    }
    let rows: Vec<Vec<String>> = slowest
        .iter()
        .enumerate()
        .map(|(i, call)| {
            vec![
                (i + 1).to_string(),
                call.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                xml_escape(&call.api_name),
                format_number(call.latency_ms, 0),
                call.status_code.to_string(),
            ]
        })
        .collect();
    let palette = &ctx.config.palette;
    Ok(Some(section(
        "slowest",
        &format!("Top {} Slowest Calls", slowest.len()),
        palette.title,
        &html_table(&["#", "Timestamp (UTC)", "API Name", "Latency (ms)", "Status"], &rows),
    )))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
