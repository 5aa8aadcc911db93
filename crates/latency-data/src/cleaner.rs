//! Type coercion and validation of loaded rows.
//!
//! Turns a [`RawTable`] into a [`RecordTable`] whose every row has a valid
//! timestamp on or after the cutoff, a finite non-negative latency and an
//! integer status code.

use chrono::{DateTime, Utc};
use latency_core::models::{
    RawRecord, RawTable, Record, RecordTable, INVALID_STATUS, UNKNOWN_CONNECTION_STATE,
};
use latency_core::settings::PipelineConfig;
use latency_core::time_utils::TimestampParser;
use serde::Serialize;
use tracing::{debug, info, warn};

// ── CleaningReport ────────────────────────────────────────────────────────────

/// Row counts before and after each cleaning step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    /// Rows handed to the cleaner.
    pub rows_in: usize,
    /// Rows dropped for an unparsable timestamp or latency.
    pub dropped_missing: usize,
    /// Rows dropped for a timestamp before the cutoff.
    pub dropped_before_cutoff: usize,
    /// Rows kept whose status code was replaced by the sentinel.
    pub status_defaulted: usize,
    /// Rows in the cleaned table.
    pub rows_out: usize,
}

impl CleaningReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_missing + self.dropped_before_cutoff
    }
}

// ── Cleaner ───────────────────────────────────────────────────────────────────

/// Validates raw rows against a cutoff and coerces their fields.
#[derive(Debug, Clone)]
pub struct Cleaner {
    parser: TimestampParser,
    cutoff: DateTime<Utc>,
}

impl Cleaner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            parser: TimestampParser::new(config.timezone),
            cutoff: config.cutoff,
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Clean `raw` into a validated table.
    ///
    /// Rows keep their relative order. Running the cleaner again over
    /// `table.to_raw()` yields the same table.
    pub fn clean(&self, raw: &RawTable) -> (RecordTable, CleaningReport) {
        let mut report = CleaningReport {
            rows_in: raw.len(),
            ..Default::default()
        };

        if !raw.columns.status_code && !raw.is_empty() {
            warn!("'status_code' column missing; every record gets status {INVALID_STATUS}");
        }

        // Step 1: coerce, dropping rows whose mandatory fields are unusable.
        let coerced: Vec<Record> = raw
            .records
            .iter()
            .filter_map(|row| {
                let record = self.coerce(row, raw.columns.connection_state);
                if record.is_none() {
                    report.dropped_missing += 1;
                }
                record
            })
            .collect();

        // Step 2: cutoff filter.
        let before_cutoff = coerced.len();
        let records: Vec<Record> = coerced
            .into_iter()
            .filter(|r| r.timestamp >= self.cutoff)
            .collect();
        report.dropped_before_cutoff = before_cutoff - records.len();

        if report.dropped_before_cutoff > 0 {
            info!(
                "Filtered out {} records with invalid dates (before {})",
                report.dropped_before_cutoff,
                self.cutoff.format("%Y-%m-%d")
            );
        }

        report.status_defaulted = records
            .iter()
            .filter(|r| r.status_code == INVALID_STATUS)
            .count();
        report.rows_out = records.len();

        debug!(
            "Cleaning: {} in, {} missing, {} before cutoff, {} out",
            report.rows_in, report.dropped_missing, report.dropped_before_cutoff, report.rows_out
        );

        (RecordTable::new(records, raw.columns), report)
    }

    /// Coerce one row; `None` when timestamp or latency is unusable.
    fn coerce(&self, row: &RawRecord, has_connection_state: bool) -> Option<Record> {
        let timestamp = row.timestamp.as_deref().and_then(|s| self.parser.parse(s))?;
        let latency_ms = row.latency_ms.as_deref().and_then(parse_latency)?;

        let connection_state = has_connection_state.then(|| {
            row.connection_state
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_CONNECTION_STATE)
                .to_string()
        });

        Some(Record {
            timestamp,
            latency_ms,
            status_code: row
                .status_code
                .as_deref()
                .and_then(parse_status)
                .unwrap_or(INVALID_STATUS),
            api_name: row.api_name.clone(),
            connection_state,
            signal_strength: row.signal_strength.as_deref().and_then(parse_number),
            speed_kmph: row.speed_kmph.as_deref().and_then(parse_number),
        })
    }
}

// ── Field coercion ────────────────────────────────────────────────────────────

/// Finite number, `None` otherwise (blank, text, NaN, infinity).
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Latency must be a finite, non-negative number of milliseconds.
pub fn parse_latency(s: &str) -> Option<f64> {
    parse_number(s).filter(|v| *v >= 0.0)
}

/// Integer status code; integral-looking floats such as `"200.0"` truncate.
pub fn parse_status(s: &str) -> Option<i32> {
    let s = s.trim();
    if let Ok(code) = s.parse::<i32>() {
        return Some(code);
    }
    let value = parse_number(s)?.trunc();
    if value >= i32::MIN as f64 && value <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use latency_core::models::ColumnSet;

    fn raw(ts: &str, latency: &str, status: Option<&str>) -> RawRecord {
        RawRecord {
            api_name: "maps".to_string(),
            timestamp: Some(ts.to_string()).filter(|s| !s.is_empty()),
            latency_ms: Some(latency.to_string()).filter(|s| !s.is_empty()),
            status_code: status.map(str::to_string),
            ..Default::default()
        }
    }

    fn table(records: Vec<RawRecord>, columns: ColumnSet) -> RawTable {
        RawTable { records, columns }
    }

    fn status_only() -> ColumnSet {
        ColumnSet {
            status_code: true,
            ..Default::default()
        }
    }

    fn cleaner() -> Cleaner {
        Cleaner::new(&PipelineConfig::default())
    }

    // ── field coercion ───────────────────────────────────────────────────────

    #[test]
    fn test_parse_latency() {
        assert_eq!(parse_latency("120"), Some(120.0));
        assert_eq!(parse_latency(" 12.5 "), Some(12.5));
        assert_eq!(parse_latency("1e3"), Some(1000.0));
        assert_eq!(parse_latency("-4"), None);
        assert_eq!(parse_latency("NaN"), None);
        assert_eq!(parse_latency("inf"), None);
        assert_eq!(parse_latency("slow"), None);
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("200"), Some(200));
        assert_eq!(parse_status("0"), Some(0));
        assert_eq!(parse_status("503.0"), Some(503));
        assert_eq!(parse_status("timeout"), None);
        assert_eq!(parse_status("1e20"), None);
    }

    // ── clean ────────────────────────────────────────────────────────────────

    #[test]
    fn test_clean_drops_unparsable_mandatory_fields() {
        let input = table(
            vec![
                raw("2025-03-01T10:00:00Z", "100", Some("200")),
                raw("garbage", "100", Some("200")),
                raw("2025-03-01T10:00:00Z", "fast", Some("200")),
                raw("", "100", Some("200")),
            ],
            status_only(),
        );

        let (cleaned, report) = cleaner().clean(&input);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(report.rows_in, 4);
        assert_eq!(report.dropped_missing, 3);
        assert_eq!(report.dropped_before_cutoff, 0);
        assert_eq!(report.rows_out, 1);
    }

    #[test]
    fn test_clean_filters_before_cutoff() {
        let input = table(
            vec![
                raw("1970-01-01", "100", Some("200")),
                raw("2024-12-31T23:59:59Z", "100", Some("200")),
                raw("2025-01-01T00:00:00Z", "100", Some("200")),
            ],
            status_only(),
        );

        let (cleaned, report) = cleaner().clean(&input);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(report.dropped_before_cutoff, 2);
        assert_eq!(report.rows_dropped(), 2);
    }

    #[test]
    fn test_clean_status_sentinel_never_drops() {
        let input = table(
            vec![
                raw("2025-03-01T10:00:00Z", "100", None),
                raw("2025-03-01T10:00:01Z", "100", Some("n/a")),
            ],
            status_only(),
        );

        let (cleaned, report) = cleaner().clean(&input);
        assert_eq!(cleaned.len(), 2);
        assert!(cleaned.iter().all(|r| r.status_code == INVALID_STATUS));
        assert_eq!(report.status_defaulted, 2);
    }

    #[test]
    fn test_clean_fills_unknown_connection_state() {
        let mut row = raw("2025-03-01T10:00:00Z", "100", Some("200"));
        row.connection_state = None;
        let columns = ColumnSet {
            status_code: true,
            connection_state: true,
            ..Default::default()
        };

        let (cleaned, _) = cleaner().clean(&table(vec![row], columns));
        assert_eq!(
            cleaned.records()[0].connection_state.as_deref(),
            Some(UNKNOWN_CONNECTION_STATE)
        );
    }

    #[test]
    fn test_clean_without_connection_column_leaves_none() {
        let (cleaned, _) = cleaner().clean(&table(
            vec![raw("2025-03-01T10:00:00Z", "100", Some("200"))],
            status_only(),
        ));
        assert!(cleaned.records()[0].connection_state.is_none());
        assert!(!cleaned.has_connection_state());
    }

    #[test]
    fn test_clean_optional_numbers_become_absent_not_zero() {
        let mut row = raw("2025-03-01T10:00:00Z", "100", Some("200"));
        row.signal_strength = Some("weak".to_string());
        row.speed_kmph = Some("42.5".to_string());
        let (cleaned, _) = cleaner().clean(&table(vec![row], ColumnSet::all()));
        let record = &cleaned.records()[0];
        assert_eq!(record.signal_strength, None);
        assert_eq!(record.speed_kmph, Some(42.5));
    }

    #[test]
    fn test_clean_preserves_order() {
        let input = table(
            vec![
                raw("2025-03-01T10:00:05Z", "3", Some("200")),
                raw("2025-03-01T10:00:01Z", "1", Some("200")),
                raw("2025-03-01T10:00:03Z", "2", Some("200")),
            ],
            status_only(),
        );
        let (cleaned, _) = cleaner().clean(&input);
        let latencies: Vec<f64> = cleaned.iter().map(|r| r.latency_ms).collect();
        assert_eq!(latencies, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let mut with_state = raw("2025-03-01 10:00:00.125", "100.25", Some("200.0"));
        with_state.connection_state = None;
        with_state.signal_strength = Some("17".to_string());
        let input = table(
            vec![
                with_state,
                raw("2025-03-01T10:00:00+02:00", "5000", Some("x")),
                raw("1970-01-01", "1", Some("200")),
            ],
            ColumnSet::all(),
        );

        let c = cleaner();
        let (first, _) = c.clean(&input);
        let (second, report) = c.clean(&first.to_raw());
        assert_eq!(first, second);
        assert_eq!(report.rows_dropped(), 0);
        assert_eq!(report.rows_in, report.rows_out);
    }

    #[test]
    fn test_clean_empty_table() {
        let (cleaned, report) = cleaner().clean(&RawTable::new());
        assert!(cleaned.is_empty());
        assert_eq!(report, CleaningReport::default());
    }
}
