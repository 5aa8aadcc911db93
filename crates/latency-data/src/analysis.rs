//! Main analysis pipeline.
//!
//! Orchestrates loading, cleaning, metric computation and insight
//! derivation, returning an [`AnalysisResult`] ready for rendering.

use std::path::Path;

use chrono::Utc;
use latency_core::models::RecordTable;
use latency_core::settings::PipelineConfig;
use serde::Serialize;
use tracing::debug;

use crate::aggregator::MetricsSnapshot;
use crate::cleaner::{Cleaner, CleaningReport};
use crate::insights::{derive_insights, Insight};
use crate::reader::{load_records, LoadSummary};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Directory the record files were read from.
    pub data_dir: String,
    /// Validity cutoff applied by the cleaner.
    pub cutoff: String,
    /// Number of distinct APIs in the cleaned table.
    pub api_count: usize,
    /// Wall-clock seconds spent reading the CSV files.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent cleaning and computing metrics.
    pub analysis_time_seconds: f64,
}

/// The complete output of [`analyze_directory`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Cleaned records; charts plot directly from it.
    pub table: RecordTable,
    pub load: LoadSummary,
    pub cleaning: CleaningReport,
    pub metrics: MetricsSnapshot,
    pub insights: Vec<Insight>,
    pub metadata: AnalysisMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full analysis pipeline over one directory of record files.
///
/// 1. Load every `*.csv` file in `data_dir` into one raw table.
/// 2. Clean it with the cutoff and timezone from `config`.
/// 3. Compute the [`MetricsSnapshot`] and derive insights.
///
/// Returns `None` when nothing survives loading and cleaning, so callers
/// can stop before rendering.
pub fn analyze_directory(data_dir: &Path, config: &PipelineConfig) -> Option<AnalysisResult> {
    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let (raw, load) = load_records(data_dir);
    let load_time = load_start.elapsed().as_secs_f64();

    if raw.is_empty() {
        return None;
    }

    // ── Step 2: Clean ─────────────────────────────────────────────────────────
    let analysis_start = std::time::Instant::now();
    let cleaner = Cleaner::new(config);
    let (table, cleaning) = cleaner.clean(&raw);
    if table.is_empty() {
        debug!("all {} loaded records were dropped by cleaning", cleaning.rows_in);
        return None;
    }

    // ── Step 3: Metrics and insights ──────────────────────────────────────────
    let metrics = MetricsSnapshot::compute(&table, config.top_n);
    let insights = derive_insights(&metrics);
    let analysis_time = analysis_start.elapsed().as_secs_f64();

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        data_dir: data_dir.display().to_string(),
        cutoff: cleaner.cutoff().to_rfc3339(),
        api_count: table.api_names().len(),
        load_time_seconds: load_time,
        analysis_time_seconds: analysis_time,
    };

    debug!(
        "analysis: {} records, {} APIs, {} insights",
        table.len(),
        metadata.api_count,
        insights.len()
    );

    Some(AnalysisResult {
        table,
        load,
        cleaning,
        metrics,
        insights,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &Path, name: &str, lines: &[&str]) {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    // ── analyze_directory ─────────────────────────────────────────────────────

    #[test]
    fn test_analyze_empty_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(analyze_directory(tmp.path(), &PipelineConfig::default()).is_none());
    }

    #[test]
    fn test_analyze_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(analyze_directory(&missing, &PipelineConfig::default()).is_none());
    }

    #[test]
    fn test_analyze_everything_before_cutoff() {
        let tmp = TempDir::new().unwrap();
        write_csv(
            tmp.path(),
            "old_api_latency.csv",
            &["timestamp,latency_ms,status_code", "1970-01-01,10,200"],
        );
        assert!(analyze_directory(tmp.path(), &PipelineConfig::default()).is_none());
    }

    #[test]
    fn test_analyze_two_apis() {
        let tmp = TempDir::new().unwrap();
        write_csv(
            tmp.path(),
            "maps_api_latency.csv",
            &[
                "timestamp,latency_ms,status_code",
                "2025-03-01T10:00:00Z,100,200",
                "2025-03-01T10:01:00Z,200,200",
            ],
        );
        write_csv(
            tmp.path(),
            "auth_api_latency.csv",
            &[
                "timestamp,latency_ms,status_code",
                "2025-03-01T10:02:00Z,300,200",
                "1970-01-01,1,200",
            ],
        );

        let result = analyze_directory(tmp.path(), &PipelineConfig::default()).unwrap();
        assert_eq!(result.table.len(), 3);
        assert_eq!(result.metadata.api_count, 2);
        assert_eq!(result.load.files_loaded, 2);
        assert_eq!(result.cleaning.dropped_before_cutoff, 1);
        assert_eq!(result.metrics.total_calls, 3);
        assert_eq!(result.insights.len(), 1);
        assert!(result.metadata.cutoff.starts_with("2025-01-01T00:00:00"));
    }
}
