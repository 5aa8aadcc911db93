//! Assembles the HTML document and writes every report file.

use std::path::{Path, PathBuf};

use latency_core::error::{ReportError, Result};
use latency_data::aggregator::MetricsSnapshot;
use latency_data::analysis::{AnalysisMetadata, AnalysisResult};
use latency_data::cleaner::CleaningReport;
use latency_data::insights::Insight;
use latency_data::reader::LoadSummary;
use serde::Serialize;
use tracing::{debug, info};

use crate::pages::{build_pages, PageContext};
use crate::svg::xml_escape;
use crate::text_dump::render_text_report;
use crate::themes::ReportConfig;

pub const HTML_REPORT_FILE: &str = "analysis_report.html";
pub const TEXT_REPORT_FILE: &str = "analysis_output.txt";
pub const METRICS_FILE: &str = "analysis_metrics.json";

/// Locations of the files written by [`write_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub html: PathBuf,
    pub text: PathBuf,
    pub metrics: PathBuf,
}

#[derive(Serialize)]
struct MetricsDocument<'a> {
    run_name: &'a str,
    metadata: &'a AnalysisMetadata,
    load: &'a LoadSummary,
    cleaning: &'a CleaningReport,
    metrics: &'a MetricsSnapshot,
    insights: &'a [Insight],
}

/// Render the complete paginated HTML document.
pub fn render_html(result: &AnalysisResult, config: &ReportConfig, run_name: &str) -> Result<String> {
    let pages = build_pages(&PageContext {
        result,
        config,
        run_name,
    })?;
    debug!("rendered {} report pages", pages.len());

    Ok(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title} - API Latency Analysis Report</title>\n<style>\n{css}\n</style>\n</head>\n<body>\n{pages}\n</body>\n</html>\n",
        title = xml_escape(run_name),
        css = stylesheet(config),
        pages = pages.join("\n")
    ))
}

fn stylesheet(config: &ReportConfig) -> String {
    let page = config.page;
    let palette = &config.palette;
    format!(
        r#"@page {{ size: {w}mm {h}mm; margin: 0; }}
body {{ margin: 0; background: #ECF0F1; font-family: {font}; color: {text}; }}
.page {{ width: {w}mm; min-height: {h}mm; margin: 0 auto 8mm; padding: 15mm; box-sizing: border-box; background: #FFFFFF; break-after: page; page-break-after: always; }}
.page:last-child {{ break-after: auto; page-break-after: auto; }}
h1 {{ margin: 0 0 4mm; font-size: 22pt; text-align: center; }}
h2 {{ margin: 8mm 0 3mm; font-size: 16pt; }}
h3 {{ margin: 0 0 2mm; font-size: 12pt; text-align: center; }}
.subtitle {{ margin: 0; text-align: center; font-size: 14pt; }}
.insight {{ margin: 1.5mm 0 1.5mm 4mm; font-size: 11pt; white-space: nowrap; }}
figure {{ margin: 4mm 0; text-align: center; }}
figure svg {{ max-width: 100%; height: auto; }}
table {{ width: 100%; border-collapse: collapse; font-size: 10pt; }}
th {{ background: {header}; color: {title}; border: 1px solid #FFFFFF; padding: 2mm; text-align: left; }}
td {{ border: 1px solid {border}; padding: 1.5mm 2mm; }}
tbody tr:nth-child(even) {{ background: {alt}; }}
.row {{ display: flex; gap: 6mm; align-items: center; }}
.row > * {{ flex: 1; }}
.swatch {{ display: inline-block; width: 3mm; height: 3mm; margin-right: 2mm; }}
.diagnostics {{ margin-top: 6mm; font-size: 9pt; }}
@media print {{ body {{ background: none; }} .page {{ margin: 0; }} }}"#,
        w = page.width_mm,
        h = page.height_mm,
        font = config.font_family,
        text = palette.text,
        title = palette.title,
        header = palette.table_header,
        border = palette.table_border,
        alt = palette.table_row_alt,
    )
}

/// The metrics sidecar as pretty-printed JSON.
pub fn metrics_json(result: &AnalysisResult, run_name: &str) -> Result<String> {
    let document = MetricsDocument {
        run_name,
        metadata: &result.metadata,
        load: &result.load,
        cleaning: &result.cleaning,
        metrics: &result.metrics,
        insights: &result.insights,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Write the HTML report, the text dump and the metrics JSON into
/// `output_dir`, creating it if needed.
pub fn write_report(
    result: &AnalysisResult,
    config: &ReportConfig,
    output_dir: &Path,
    run_name: &str,
) -> Result<ReportPaths> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        ReportError::Render(format!(
            "cannot create output directory {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    let paths = ReportPaths {
        html: output_dir.join(HTML_REPORT_FILE),
        text: output_dir.join(TEXT_REPORT_FILE),
        metrics: output_dir.join(METRICS_FILE),
    };

    write_file(&paths.html, &render_html(result, config, run_name)?)?;
    write_file(
        &paths.text,
        &render_text_report(run_name, &result.metrics.descriptions),
    )?;
    write_file(&paths.metrics, &metrics_json(result, run_name)?)?;

    info!("Report files written to {}", output_dir.display());
    Ok(paths)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .map_err(|e| ReportError::Render(format!("cannot write {}: {}", path.display(), e)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
