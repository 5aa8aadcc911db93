//! Grouped latency aggregates over a cleaned [`RecordTable`].
//!
//! Every function here is pure: it reads the table and returns a fresh value.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use latency_core::formatting::ratio;
use latency_core::models::{Record, RecordTable, StatusClass};
use latency_core::percentile::{mean, percentile, sample_std_dev, sorted, Percentiles};
use serde::Serialize;

/// Latency at or above which a call counts as an incident.
pub const HIGH_LATENCY_MS: f64 = 20_000.0;
/// Signal strength (percent) below which a call counts as weak-signal.
pub const WEAK_SIGNAL_THRESHOLD: f64 = 20.0;

// ── ApiStats ──────────────────────────────────────────────────────────────────

/// Per-API summary; latency figures cover successful calls only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiStats {
    pub api_name: String,
    /// All calls, any status.
    pub count: usize,
    pub success_count: usize,
    /// Fraction of calls whose status is not exactly 200.
    pub error_rate: f64,
    pub mean_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    /// Absent when the API has no successful call.
    pub percentiles: Option<Percentiles>,
}

// ── StatusBreakdown ───────────────────────────────────────────────────────────

/// Call counts per [`StatusClass`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub total: usize,
    pub success: usize,
    pub network_errors: usize,
    pub client_errors: usize,
    pub server_errors: usize,
    pub invalid: usize,
    pub other: usize,
}

impl StatusBreakdown {
    fn add(&mut self, class: StatusClass) {
        self.total += 1;
        match class {
            StatusClass::Success => self.success += 1,
            StatusClass::NetworkError => self.network_errors += 1,
            StatusClass::ClientError => self.client_errors += 1,
            StatusClass::ServerError => self.server_errors += 1,
            StatusClass::Invalid => self.invalid += 1,
            StatusClass::Other => self.other += 1,
        }
    }

    pub fn success_rate(&self) -> f64 {
        ratio(self.success, self.total)
    }

    pub fn network_error_rate(&self) -> f64 {
        ratio(self.network_errors, self.total)
    }

    pub fn client_error_rate(&self) -> f64 {
        ratio(self.client_errors, self.total)
    }

    pub fn server_error_rate(&self) -> f64 {
        ratio(self.server_errors, self.total)
    }
}

// ── SlowCall ──────────────────────────────────────────────────────────────────

/// One entry of the global slowest-calls list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowCall {
    pub timestamp: DateTime<Utc>,
    pub api_name: String,
    pub latency_ms: f64,
    pub status_code: i32,
}

// ── Connectivity ──────────────────────────────────────────────────────────────

/// Calls and failure rate observed in one connection state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateCount {
    pub state: String,
    pub count: usize,
    pub failure_rate: f64,
}

/// How calls split across connection states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivitySummary {
    /// Ordered by descending count, then state name.
    pub states: Vec<StateCount>,
    /// Calls made in any state other than `"connected"`.
    pub disconnected_calls: usize,
    /// Non-200 calls among [`Self::disconnected_calls`].
    pub disconnected_failures: usize,
    /// Sorted distinct non-connected states.
    pub disconnected_states: Vec<String>,
}

impl ConnectivitySummary {
    pub fn disconnected_failure_rate(&self) -> f64 {
        ratio(self.disconnected_failures, self.disconnected_calls)
    }
}

// ── LatencyDescription ────────────────────────────────────────────────────────

/// Descriptive statistics of all latencies for one API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyDescription {
    pub api_name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; absent for a single value.
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

// ── Incidents ─────────────────────────────────────────────────────────────────

/// Why a call shows up on the failure page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum IncidentKind {
    NetworkError,
    ClientError(i32),
    ServerError(i32),
    HighLatency,
    OtherError,
}

impl IncidentKind {
    /// Classify a record; `None` for a fast successful call.
    pub fn classify(record: &Record) -> Option<Self> {
        if record.is_success() && record.latency_ms < HIGH_LATENCY_MS {
            return None;
        }
        Some(match record.status_class() {
            StatusClass::NetworkError => Self::NetworkError,
            StatusClass::ClientError => Self::ClientError(record.status_code),
            StatusClass::ServerError => Self::ServerError(record.status_code),
            _ if record.latency_ms >= HIGH_LATENCY_MS => Self::HighLatency,
            _ => Self::OtherError,
        })
    }

    pub fn label(&self) -> String {
        match self {
            Self::NetworkError => "Network Error (0)".to_string(),
            Self::ClientError(code) => format!("Client Error ({})", code),
            Self::ServerError(code) => format!("Server Error ({})", code),
            Self::HighLatency => "High Latency (>20s)".to_string(),
            Self::OtherError => "Other Error".to_string(),
        }
    }
}

/// A failed or very slow call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    pub timestamp: DateTime<Utc>,
    pub api_name: String,
    pub latency_ms: f64,
    pub status_code: i32,
    pub kind: IncidentKind,
}

// ── LatencyAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that groups records and computes aggregates.
pub struct LatencyAggregator;

impl LatencyAggregator {
    /// p50/p90/p95/p99 per API over successful calls.
    ///
    /// APIs without a successful call are absent from the map.
    pub fn percentiles_by_api(table: &RecordTable) -> BTreeMap<String, Percentiles> {
        group_latencies(table.successes())
            .into_iter()
            .filter_map(|(api, values)| {
                let values = sorted(values);
                Percentiles::from_sorted(&values).map(|p| (api, p))
            })
            .collect()
    }

    /// Average calls per minute between the first and last timestamp.
    ///
    /// When every record shares one instant the record count is returned.
    pub fn throughput_per_minute(table: &RecordTable) -> f64 {
        let Some((first, last)) = Self::time_range(table) else {
            return 0.0;
        };
        let elapsed = last - first;
        let minutes = elapsed
            .num_microseconds()
            .map(|us| us as f64 / 60_000_000.0)
            .unwrap_or_else(|| elapsed.num_seconds() as f64 / 60.0);
        if minutes == 0.0 {
            return table.len() as f64;
        }
        table.len() as f64 / minutes
    }

    /// Earliest and latest timestamp, `None` for an empty table.
    pub fn time_range(table: &RecordTable) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = table.iter().map(|r| r.timestamp).min()?;
        let last = table.iter().map(|r| r.timestamp).max()?;
        Some((first, last))
    }

    /// The `n` slowest calls across all APIs and statuses, slowest first.
    ///
    /// Equal latencies keep their table order.
    pub fn slowest_calls(table: &RecordTable, n: usize) -> Vec<SlowCall> {
        let mut indexed: Vec<&Record> = table.iter().collect();
        // Stable sort: ties stay in load order.
        indexed.sort_by(|a, b| b.latency_ms.total_cmp(&a.latency_ms));
        indexed
            .into_iter()
            .take(n)
            .map(|r| SlowCall {
                timestamp: r.timestamp,
                api_name: r.api_name.clone(),
                latency_ms: r.latency_ms,
                status_code: r.status_code,
            })
            .collect()
    }

    /// Fraction of non-200 calls per API.
    pub fn error_rate_by_api(table: &RecordTable) -> BTreeMap<String, f64> {
        error_rate_by(table, |r| Some(r.api_name.as_str()))
    }

    /// Fraction of non-200 calls per connection state.
    ///
    /// `None` when the table carries no connection state.
    pub fn failure_rate_by_connection_state(table: &RecordTable) -> Option<BTreeMap<String, f64>> {
        if !table.has_connection_state() {
            return None;
        }
        Some(error_rate_by(table, |r| r.connection_state.as_deref()))
    }

    pub fn status_breakdown(table: &RecordTable) -> StatusBreakdown {
        let mut breakdown = StatusBreakdown::default();
        for record in table {
            breakdown.add(record.status_class());
        }
        breakdown
    }

    /// Per-API summary rows, sorted by API name.
    pub fn api_stats(table: &RecordTable) -> Vec<ApiStats> {
        let counts = count_by(table.iter(), |r| r.api_name.as_str());
        let error_rates = Self::error_rate_by_api(table);
        let mut successes = group_latencies(table.successes());

        counts
            .into_iter()
            .map(|(api, count)| {
                let values = sorted(successes.remove(api).unwrap_or_default());
                ApiStats {
                    api_name: api.to_string(),
                    count,
                    success_count: values.len(),
                    error_rate: error_rates.get(api).copied().unwrap_or(0.0),
                    mean_ms: mean(&values),
                    min_ms: values.first().copied(),
                    max_ms: values.last().copied(),
                    percentiles: Percentiles::from_sorted(&values),
                }
            })
            .collect()
    }

    /// Mean latency per API, over all calls or successful calls only.
    pub fn mean_latency_by_api(table: &RecordTable, success_only: bool) -> BTreeMap<String, f64> {
        let groups = if success_only {
            group_latencies(table.successes())
        } else {
            group_latencies(table.iter())
        };
        groups
            .into_iter()
            .filter_map(|(api, values)| mean(&values).map(|m| (api, m)))
            .collect()
    }

    /// Call counts per API and status code.
    pub fn status_counts_by_api(table: &RecordTable) -> BTreeMap<String, BTreeMap<i32, usize>> {
        let mut map: BTreeMap<String, BTreeMap<i32, usize>> = BTreeMap::new();
        for record in table {
            *map.entry(record.api_name.clone())
                .or_default()
                .entry(record.status_code)
                .or_default() += 1;
        }
        map
    }

    /// Per-state counts and the non-connected breakdown.
    pub fn connectivity_summary(table: &RecordTable) -> Option<ConnectivitySummary> {
        let failure_rates = Self::failure_rate_by_connection_state(table)?;
        let counts = count_by(table.iter(), |r| {
            r.connection_state.as_deref().unwrap_or_default()
        });

        let mut states: Vec<StateCount> = counts
            .into_iter()
            .map(|(state, count)| StateCount {
                state: state.to_string(),
                count,
                failure_rate: failure_rates.get(state).copied().unwrap_or(0.0),
            })
            .collect();
        states.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.state.cmp(&b.state)));

        let disconnected: Vec<&Record> = table.iter().filter(|r| r.is_disconnected()).collect();
        let disconnected_states: BTreeSet<&str> = disconnected
            .iter()
            .filter_map(|r| r.connection_state.as_deref())
            .collect();

        Some(ConnectivitySummary {
            states,
            disconnected_calls: disconnected.len(),
            disconnected_failures: disconnected.iter().filter(|r| !r.is_success()).count(),
            disconnected_states: disconnected_states.into_iter().map(str::to_string).collect(),
        })
    }

    /// Calls made with signal below [`WEAK_SIGNAL_THRESHOLD`].
    ///
    /// `None` when the table carries no signal strength.
    pub fn weak_signal_count(table: &RecordTable) -> Option<usize> {
        if !table.has_signal_strength() {
            return None;
        }
        Some(
            table
                .iter()
                .filter(|r| r.signal_strength.is_some_and(|s| s < WEAK_SIGNAL_THRESHOLD))
                .count(),
        )
    }

    /// count/mean/std/min/quartiles/max of all latencies per API.
    pub fn describe_by_api(table: &RecordTable) -> Vec<LatencyDescription> {
        group_latencies(table.iter())
            .into_iter()
            .filter_map(|(api, values)| {
                let values = sorted(values);
                Some(LatencyDescription {
                    count: values.len(),
                    mean: mean(&values)?,
                    std: sample_std_dev(&values),
                    min: *values.first()?,
                    p25: percentile(&values, 25.0),
                    p50: percentile(&values, 50.0),
                    p75: percentile(&values, 75.0),
                    max: *values.last()?,
                    api_name: api,
                })
            })
            .collect()
    }

    /// Non-200 or very slow calls in table order.
    pub fn incidents(table: &RecordTable) -> Vec<Incident> {
        table
            .iter()
            .filter_map(|r| {
                IncidentKind::classify(r).map(|kind| Incident {
                    timestamp: r.timestamp,
                    api_name: r.api_name.clone(),
                    latency_ms: r.latency_ms,
                    status_code: r.status_code,
                    kind,
                })
            })
            .collect()
    }
}

// ── MetricsSnapshot ───────────────────────────────────────────────────────────

/// Everything insight rules and the renderer need, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_calls: usize,
    pub status: StatusBreakdown,
    pub throughput_per_minute: f64,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Sorted by API name.
    pub apis: Vec<ApiStats>,
    pub slowest: Vec<SlowCall>,
    /// `None` when connection state is unavailable.
    pub connectivity: Option<ConnectivitySummary>,
    /// `None` when signal strength is unavailable.
    pub weak_signal_calls: Option<usize>,
    /// Non-200 fraction per connection state; `None` without the column.
    pub failure_rate_by_state: Option<BTreeMap<String, f64>>,
    /// Call count per API and status code.
    pub status_counts: BTreeMap<String, BTreeMap<i32, usize>>,
    /// Latency statistics over all calls, one row per API.
    pub descriptions: Vec<LatencyDescription>,
    pub incidents: Vec<Incident>,
}

impl MetricsSnapshot {
    pub fn compute(table: &RecordTable, top_n: usize) -> Self {
        let range = LatencyAggregator::time_range(table);
        Self {
            total_calls: table.len(),
            status: LatencyAggregator::status_breakdown(table),
            throughput_per_minute: LatencyAggregator::throughput_per_minute(table),
            first_timestamp: range.map(|(first, _)| first),
            last_timestamp: range.map(|(_, last)| last),
            apis: LatencyAggregator::api_stats(table),
            slowest: LatencyAggregator::slowest_calls(table, top_n),
            connectivity: LatencyAggregator::connectivity_summary(table),
            weak_signal_calls: LatencyAggregator::weak_signal_count(table),
            failure_rate_by_state: LatencyAggregator::failure_rate_by_connection_state(table),
            status_counts: LatencyAggregator::status_counts_by_api(table),
            descriptions: LatencyAggregator::describe_by_api(table),
            incidents: LatencyAggregator::incidents(table),
        }
    }

    pub fn api(&self, name: &str) -> Option<&ApiStats> {
        self.apis.iter().find(|a| a.api_name == name)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn group_latencies<'a>(records: impl Iterator<Item = &'a Record>) -> BTreeMap<String, Vec<f64>> {
    let mut map: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        map.entry(record.api_name.clone())
            .or_default()
            .push(record.latency_ms);
    }
    map
}

fn count_by<'a>(
    records: impl Iterator<Item = &'a Record>,
    key: impl Fn(&'a Record) -> &'a str,
) -> BTreeMap<&'a str, usize> {
    let mut map: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *map.entry(key(record)).or_default() += 1;
    }
    map
}

/// Fraction of non-200 rows per group; rows whose key is `None` are skipped.
fn error_rate_by<'a>(
    table: &'a RecordTable,
    key: impl Fn(&'a Record) -> Option<&'a str>,
) -> BTreeMap<String, f64> {
    let mut tallies: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in table {
        if let Some(k) = key(record) {
            let entry = tallies.entry(k).or_default();
            entry.0 += 1;
            if !record.is_success() {
                entry.1 += 1;
            }
        }
    }
    tallies
        .into_iter()
        .map(|(k, (total, errors))| (k.to_string(), ratio(errors, total)))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use latency_core::models::ColumnSet;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn rec(api: &str, at: &str, latency: f64, status: i32) -> Record {
        Record {
            timestamp: ts(at),
            latency_ms: latency,
            status_code: status,
            api_name: api.to_string(),
            connection_state: None,
            signal_strength: None,
            speed_kmph: None,
        }
    }

    fn with_state(mut r: Record, state: &str, signal: Option<f64>) -> Record {
        r.connection_state = Some(state.to_string());
        r.signal_strength = signal;
        r
    }

    fn basic_columns() -> ColumnSet {
        ColumnSet {
            status_code: true,
            ..Default::default()
        }
    }

    fn sample_table() -> RecordTable {
        RecordTable::new(
            vec![
                rec("maps", "2025-03-01T10:00:00Z", 100.0, 200),
                rec("maps", "2025-03-01T10:01:00Z", 300.0, 200),
                rec("maps", "2025-03-01T10:02:00Z", 9_000.0, 500),
                rec("auth", "2025-03-01T10:03:00Z", 50.0, 0),
                rec("auth", "2025-03-01T10:04:00Z", 25_000.0, 200),
            ],
            basic_columns(),
        )
    }

    // ── percentiles_by_api ───────────────────────────────────────────────────

    #[test]
    fn test_percentiles_success_only() {
        let p = LatencyAggregator::percentiles_by_api(&sample_table());
        let maps = p.get("maps").unwrap();
        // Successes are [100, 300]; the 9000 ms failure is ignored.
        assert!((maps.p50 - 200.0).abs() < 1e-9);
        assert!(maps.p99 <= 300.0);
    }

    #[test]
    fn test_percentiles_absent_without_successes() {
        let table = RecordTable::new(
            vec![
                rec("down", "2025-03-01T10:00:00Z", 10.0, 503),
                rec("up", "2025-03-01T10:00:00Z", 10.0, 200),
            ],
            basic_columns(),
        );
        let p = LatencyAggregator::percentiles_by_api(&table);
        assert!(p.contains_key("up"));
        assert!(!p.contains_key("down"));
    }

    // ── throughput ───────────────────────────────────────────────────────────

    #[test]
    fn test_throughput_over_four_minutes() {
        // 5 records over 4 minutes.
        let t = LatencyAggregator::throughput_per_minute(&sample_table());
        assert!((t - 1.25).abs() < 1e-9, "throughput = {t}");
    }

    #[test]
    fn test_throughput_single_instant_is_count() {
        let table = RecordTable::new(
            vec![
                rec("a", "2025-03-01T10:00:00Z", 1.0, 200),
                rec("b", "2025-03-01T10:00:00Z", 2.0, 200),
                rec("c", "2025-03-01T10:00:00Z", 3.0, 404),
            ],
            basic_columns(),
        );
        assert_eq!(LatencyAggregator::throughput_per_minute(&table), 3.0);
    }

    #[test]
    fn test_throughput_empty_is_zero() {
        assert_eq!(LatencyAggregator::throughput_per_minute(&RecordTable::default()), 0.0);
    }

    // ── slowest_calls ────────────────────────────────────────────────────────

    #[test]
    fn test_slowest_calls_descending_any_status() {
        let slow = LatencyAggregator::slowest_calls(&sample_table(), 3);
        let latencies: Vec<f64> = slow.iter().map(|s| s.latency_ms).collect();
        assert_eq!(latencies, vec![25_000.0, 9_000.0, 300.0]);
        assert_eq!(slow[1].status_code, 500);
    }

    #[test]
    fn test_slowest_calls_ties_keep_table_order() {
        let table = RecordTable::new(
            vec![
                rec("first", "2025-03-01T10:00:00Z", 500.0, 200),
                rec("fast", "2025-03-01T10:00:01Z", 1.0, 200),
                rec("second", "2025-03-01T10:00:02Z", 500.0, 200),
            ],
            basic_columns(),
        );
        let slow = LatencyAggregator::slowest_calls(&table, 2);
        assert_eq!(slow[0].api_name, "first");
        assert_eq!(slow[1].api_name, "second");
    }

    #[test]
    fn test_slowest_calls_bounded_by_rows() {
        let slow = LatencyAggregator::slowest_calls(&sample_table(), 10);
        assert_eq!(slow.len(), 5);
    }

    // ── error rates ──────────────────────────────────────────────────────────

    #[test]
    fn test_error_rate_by_api() {
        let rates = LatencyAggregator::error_rate_by_api(&sample_table());
        assert!((rates["maps"] - 1.0 / 3.0).abs() < 1e-9);
        assert!((rates["auth"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_failure_rate_by_state_unavailable() {
        assert!(LatencyAggregator::failure_rate_by_connection_state(&sample_table()).is_none());
    }

    #[test]
    fn test_failure_rate_by_state() {
        let table = RecordTable::new(
            vec![
                with_state(rec("a", "2025-03-01T10:00:00Z", 1.0, 200), "connected", None),
                with_state(rec("a", "2025-03-01T10:00:01Z", 1.0, 0), "disconnected", None),
                with_state(rec("a", "2025-03-01T10:00:02Z", 1.0, 200), "disconnected", None),
            ],
            ColumnSet::all(),
        );
        let rates = LatencyAggregator::failure_rate_by_connection_state(&table).unwrap();
        assert_eq!(rates["connected"], 0.0);
        assert!((rates["disconnected"] - 0.5).abs() < 1e-9);
    }

    // ── status_breakdown / api_stats ─────────────────────────────────────────

    #[test]
    fn test_status_breakdown() {
        let b = LatencyAggregator::status_breakdown(&sample_table());
        assert_eq!(b.total, 5);
        assert_eq!(b.success, 3);
        assert_eq!(b.server_errors, 1);
        assert_eq!(b.network_errors, 1);
        assert_eq!(b.client_errors, 0);
        assert!((b.success_rate() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_api_stats_success_only_latency() {
        let stats = LatencyAggregator::api_stats(&sample_table());
        let names: Vec<&str> = stats.iter().map(|s| s.api_name.as_str()).collect();
        assert_eq!(names, vec!["auth", "maps"]);

        let maps = &stats[1];
        assert_eq!(maps.count, 3);
        assert_eq!(maps.success_count, 2);
        assert_eq!(maps.mean_ms, Some(200.0));
        assert_eq!(maps.max_ms, Some(300.0));
        assert_eq!(maps.min_ms, Some(100.0));
    }

    #[test]
    fn test_api_stats_without_successes() {
        let table = RecordTable::new(
            vec![rec("down", "2025-03-01T10:00:00Z", 10.0, 503)],
            basic_columns(),
        );
        let stats = LatencyAggregator::api_stats(&table);
        assert_eq!(stats[0].count, 1);
        assert_eq!(stats[0].mean_ms, None);
        assert!(stats[0].percentiles.is_none());
        assert_eq!(stats[0].error_rate, 1.0);
    }

    #[test]
    fn test_mean_latency_by_api() {
        let all = LatencyAggregator::mean_latency_by_api(&sample_table(), false);
        let ok = LatencyAggregator::mean_latency_by_api(&sample_table(), true);
        assert!((all["maps"] - 3_133.333_333).abs() < 1e-3);
        assert_eq!(ok["maps"], 200.0);
        assert_eq!(ok["auth"], 25_000.0);
    }

    #[test]
    fn test_status_counts_by_api() {
        let counts = LatencyAggregator::status_counts_by_api(&sample_table());
        assert_eq!(counts["maps"][&200], 2);
        assert_eq!(counts["maps"][&500], 1);
        assert_eq!(counts["auth"][&0], 1);
    }

    // ── connectivity / signal ────────────────────────────────────────────────

    #[test]
    fn test_connectivity_summary() {
        let table = RecordTable::new(
            vec![
                with_state(rec("a", "2025-03-01T10:00:00Z", 1.0, 200), "connected", Some(80.0)),
                with_state(rec("a", "2025-03-01T10:00:01Z", 1.0, 0), "disconnected", Some(5.0)),
                with_state(rec("a", "2025-03-01T10:00:02Z", 1.0, 200), "Unknown", None),
                with_state(rec("a", "2025-03-01T10:00:03Z", 1.0, 200), "connected", Some(19.9)),
            ],
            ColumnSet::all(),
        );
        let c = LatencyAggregator::connectivity_summary(&table).unwrap();
        assert_eq!(c.states[0].state, "connected");
        assert_eq!(c.states[0].count, 2);
        assert_eq!(c.disconnected_calls, 2);
        assert_eq!(c.disconnected_failures, 1);
        assert_eq!(c.disconnected_states, vec!["Unknown", "disconnected"]);
        assert!((c.disconnected_failure_rate() - 0.5).abs() < 1e-9);

        assert_eq!(LatencyAggregator::weak_signal_count(&table), Some(2));
    }

    #[test]
    fn test_connectivity_and_signal_unavailable() {
        assert!(LatencyAggregator::connectivity_summary(&sample_table()).is_none());
        assert!(LatencyAggregator::weak_signal_count(&sample_table()).is_none());
    }

    // ── describe / incidents ─────────────────────────────────────────────────

    #[test]
    fn test_describe_by_api() {
        let d = LatencyAggregator::describe_by_api(&sample_table());
        let maps = d.iter().find(|x| x.api_name == "maps").unwrap();
        assert_eq!(maps.count, 3);
        assert_eq!(maps.min, 100.0);
        assert_eq!(maps.p50, 300.0);
        assert_eq!(maps.max, 9_000.0);
        assert!((maps.p25 - 200.0).abs() < 1e-9);
        assert!(maps.std.is_some());
    }

    #[test]
    fn test_incidents_classification() {
        let incidents = LatencyAggregator::incidents(&sample_table());
        let kinds: Vec<IncidentKind> = incidents.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IncidentKind::ServerError(500),
                IncidentKind::NetworkError,
                IncidentKind::HighLatency,
            ]
        );
        assert_eq!(kinds[0].label(), "Server Error (500)");
    }

    #[test]
    fn test_incident_other_error() {
        let r = rec("a", "2025-03-01T10:00:00Z", 10.0, -1);
        assert_eq!(IncidentKind::classify(&r), Some(IncidentKind::OtherError));
        let ok = rec("a", "2025-03-01T10:00:00Z", 10.0, 200);
        assert_eq!(IncidentKind::classify(&ok), None);
    }

    // ── MetricsSnapshot ──────────────────────────────────────────────────────

    #[test]
    fn test_snapshot_compute() {
        let snap = MetricsSnapshot::compute(&sample_table(), 2);
        assert_eq!(snap.total_calls, 5);
        assert_eq!(snap.slowest.len(), 2);
        assert_eq!(snap.apis.len(), 2);
        assert_eq!(snap.first_timestamp, Some(ts("2025-03-01T10:00:00Z")));
        assert_eq!(snap.last_timestamp, Some(ts("2025-03-01T10:04:00Z")));
        assert!(snap.api("maps").is_some());
        assert!(snap.connectivity.is_none());
        assert!(snap.failure_rate_by_state.is_none());
        assert_eq!(snap.status_counts["maps"][&500], 1);
        assert_eq!(snap.descriptions.len(), 2);
        assert_eq!(snap.incidents.len(), 3);
    }

    #[test]
    fn test_snapshot_serializes_every_aggregate() {
        let snap = MetricsSnapshot::compute(&sample_table(), 10);
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["status_counts"]["auth"]["0"], 1);
        assert_eq!(value["descriptions"][0]["api_name"], "auth");
        assert_eq!(value["incidents"][0]["kind"]["kind"], "server_error");
        assert_eq!(value["incidents"][0]["kind"]["status"], 500);
        assert!(value["failure_rate_by_state"].is_null());
    }
}
