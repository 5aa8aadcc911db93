//! End-to-end checks of load → clean → metrics → insights over real files.

use std::io::Write;
use std::path::Path;

use latency_core::settings::PipelineConfig;
use latency_data::aggregator::{LatencyAggregator, MetricsSnapshot};
use latency_data::analysis::analyze_directory;
use latency_data::cleaner::Cleaner;
use latency_data::insights::{derive_insights, MAX_INSIGHTS};
use latency_data::reader::load_records;
use tempfile::TempDir;

fn write_csv(dir: &Path, name: &str, lines: &[&str]) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
}

fn messages(dir: &Path) -> Vec<String> {
    analyze_directory(dir, &PipelineConfig::default())
        .unwrap()
        .insights
        .into_iter()
        .map(|i| i.message)
        .collect()
}

/// A mixed directory: three APIs, optional columns in some files only,
/// one malformed file, a few pre-cutoff rows.
fn mixed_fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_csv(
        tmp.path(),
        "maps_api_latency.csv",
        &[
            "timestamp,latency_ms,status_code,connection_state,signal_strength",
            "2025-03-01T10:00:00Z,120,200,connected,80",
            "2025-03-01T10:00:30Z,450,200,connected,75",
            "2025-03-01T10:01:00Z,22000,200,disconnected,10",
            "2025-03-01T10:01:30Z,50,0,disconnected,5",
            "2025-03-01T10:02:00Z,800,503,,",
            "1970-01-01T00:00:00Z,10,200,connected,90",
        ],
    );
    write_csv(
        tmp.path(),
        "auth_api_latency.csv",
        &[
            "timestamp,latency_ms,status_code",
            "2025-03-01 10:00:10,90,200",
            "2025-03-01 10:00:20,95,200",
            "2025-03-01 10:00:40,not-a-number,200",
            "2025-03-01 10:00:50,110,404",
        ],
    );
    write_csv(tmp.path(), "broken_api_latency.csv", &["id,value", "1,2"]);
    tmp
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn scenario_a_all_nominal() {
    let tmp = TempDir::new().unwrap();
    write_csv(
        tmp.path(),
        "login_api_latency.csv",
        &[
            "timestamp,latency_ms,status_code",
            "2025-02-01T08:00:00Z,100,200",
            "2025-02-01T08:00:01Z,200,200",
            "2025-02-01T08:00:02Z,300,200",
        ],
    );
    assert_eq!(
        messages(tmp.path()),
        vec!["All APIs are performing within normal parameters."]
    );
}

#[test]
fn scenario_b_network_errors() {
    let tmp = TempDir::new().unwrap();
    let mut lines = vec!["timestamp,latency_ms,status_code".to_string()];
    for i in 0..10 {
        let status = if i < 6 { 0 } else { 200 };
        lines.push(format!("2025-02-01T08:00:{:02}Z,100,{}", i, status));
    }
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    write_csv(tmp.path(), "sync_api_latency.csv", &lines);

    let msgs = messages(tmp.path());
    assert_eq!(msgs[0], "NETWORK: 60.0% calls failed due to network (Status 0).");
    assert!(msgs.contains(&"STABILITY: Overall success rate is low (40.0%).".to_string()));
}

#[test]
fn scenario_c_epoch_rows_filtered_and_counted() {
    let tmp = TempDir::new().unwrap();
    write_csv(
        tmp.path(),
        "clock_api_latency.csv",
        &[
            "timestamp,latency_ms,status_code",
            "1970-01-01,100,200",
            "2025-02-01T08:00:00Z,100,200",
        ],
    );
    let result = analyze_directory(tmp.path(), &PipelineConfig::default()).unwrap();
    assert_eq!(result.cleaning.dropped_before_cutoff, 1);
    assert_eq!(result.table.len(), 1);
}

#[test]
fn scenario_d_no_connection_column() {
    let tmp = TempDir::new().unwrap();
    write_csv(
        tmp.path(),
        "feed_api_latency.csv",
        &[
            "timestamp,latency_ms,status_code",
            "2025-02-01T08:00:00Z,100,200",
            "2025-02-01T08:00:01Z,100,500",
        ],
    );
    let result = analyze_directory(tmp.path(), &PipelineConfig::default()).unwrap();
    assert!(result.metrics.connectivity.is_none());
    assert!(LatencyAggregator::failure_rate_by_connection_state(&result.table).is_none());
    assert!(result
        .insights
        .iter()
        .all(|i| !i.message.starts_with("CONNECTIVITY") && !i.message.starts_with("RISK")));
}

#[test]
fn scenario_e_empty_directory() {
    let tmp = TempDir::new().unwrap();
    let (raw, summary) = load_records(tmp.path());
    assert!(raw.is_empty());
    assert_eq!(summary.files_found, 0);
    assert!(analyze_directory(tmp.path(), &PipelineConfig::default()).is_none());
}

// ── Properties ────────────────────────────────────────────────────────────────

#[test]
fn cleaned_rows_respect_invariants() {
    let tmp = mixed_fixture();
    let config = PipelineConfig::default();
    let (raw, summary) = load_records(tmp.path());
    assert_eq!(summary.files_skipped, 1);

    let (table, report) = Cleaner::new(&config).clean(&raw);
    assert_eq!(report.dropped_missing, 1);
    assert_eq!(report.dropped_before_cutoff, 1);
    for record in &table {
        assert!(record.timestamp >= config.cutoff);
        assert!(record.latency_ms.is_finite() && record.latency_ms >= 0.0);
    }
    // Union of columns across files; rows from files without it read "Unknown".
    assert!(table.has_connection_state());
    assert!(table
        .iter()
        .filter(|r| r.api_name == "auth")
        .all(|r| r.connection_state.as_deref() == Some("Unknown")));
}

#[test]
fn cleaning_is_idempotent() {
    let tmp = mixed_fixture();
    let cleaner = Cleaner::new(&PipelineConfig::default());
    let (raw, _) = load_records(tmp.path());
    let (once, _) = cleaner.clean(&raw);
    let (twice, _) = cleaner.clean(&once.to_raw());
    assert_eq!(once, twice);
}

#[test]
fn percentiles_are_ordered() {
    let tmp = mixed_fixture();
    let result = analyze_directory(tmp.path(), &PipelineConfig::default()).unwrap();
    let by_api = LatencyAggregator::percentiles_by_api(&result.table);
    assert!(!by_api.is_empty());
    for p in by_api.values() {
        assert!(p.p50 <= p.p90 && p.p90 <= p.p95 && p.p95 <= p.p99);
    }
}

#[test]
fn single_instant_throughput_equals_count() {
    let tmp = TempDir::new().unwrap();
    write_csv(
        tmp.path(),
        "burst_api_latency.csv",
        &[
            "timestamp,latency_ms,status_code",
            "2025-02-01T08:00:00Z,1,200",
            "2025-02-01T08:00:00Z,2,200",
            "2025-02-01T08:00:00Z,3,200",
            "2025-02-01T08:00:00Z,4,200",
        ],
    );
    let result = analyze_directory(tmp.path(), &PipelineConfig::default()).unwrap();
    assert_eq!(result.metrics.throughput_per_minute, 4.0);
}

#[test]
fn slowest_calls_bounded_and_non_increasing() {
    let tmp = mixed_fixture();
    let result = analyze_directory(tmp.path(), &PipelineConfig::default()).unwrap();
    for n in [1, 3, 100] {
        let slow = LatencyAggregator::slowest_calls(&result.table, n);
        assert!(slow.len() <= n);
        assert!(slow.len() <= result.table.len());
        assert!(slow.windows(2).all(|w| w[0].latency_ms >= w[1].latency_ms));
    }
}

#[test]
fn insights_capped_and_unique() {
    let tmp = mixed_fixture();
    let result = analyze_directory(tmp.path(), &PipelineConfig::default()).unwrap();
    let again = derive_insights(&MetricsSnapshot::compute(&result.table, 10));
    assert_eq!(result.insights, again);
    assert!(again.len() <= MAX_INSIGHTS);
    let mut seen = std::collections::HashSet::new();
    assert!(again.iter().all(|i| seen.insert(i.message.clone())));
}
