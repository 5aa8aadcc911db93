use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Status code of a successful call.
pub const SUCCESS_STATUS: i32 = 200;
/// Status code logged when the request never reached the server.
pub const NETWORK_ERROR_STATUS: i32 = 0;
/// Placeholder for records whose status could not be determined.
pub const INVALID_STATUS: i32 = -1;

/// Fill value for blank `connection_state` cells.
pub const UNKNOWN_CONNECTION_STATE: &str = "Unknown";
/// The only connection state considered healthy.
pub const CONNECTED_STATE: &str = "connected";

// ── StatusClass ───────────────────────────────────────────────────────────────

/// Coarse classification of an HTTP-ish status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// Exactly 200.
    Success,
    /// Status 0: failed below the HTTP layer.
    NetworkError,
    /// 400–499.
    ClientError,
    /// 500–599.
    ServerError,
    /// The sentinel −1.
    Invalid,
    /// Anything else (redirects, 2xx other than 200, ...).
    Other,
}

impl StatusClass {
    pub fn from_code(code: i32) -> Self {
        match code {
            SUCCESS_STATUS => Self::Success,
            NETWORK_ERROR_STATUS => Self::NetworkError,
            INVALID_STATUS => Self::Invalid,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Other,
        }
    }

    /// Human-readable label used in charts and tables.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NetworkError => "Network Error",
            Self::ClientError => "Client Error",
            Self::ServerError => "Server Error",
            Self::Invalid => "Invalid",
            Self::Other => "Other",
        }
    }
}

// ── ColumnSet ─────────────────────────────────────────────────────────────────

/// Which non-mandatory columns were present in at least one loaded file.
///
/// `timestamp` and `latency_ms` are mandatory and therefore not tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    pub status_code: bool,
    pub connection_state: bool,
    pub signal_strength: bool,
    pub speed_kmph: bool,
}

impl ColumnSet {
    /// Every optional column present.
    pub fn all() -> Self {
        Self {
            status_code: true,
            connection_state: true,
            signal_strength: true,
            speed_kmph: true,
        }
    }

    /// Column-wise OR, matching how tables with differing headers concatenate.
    pub fn union(self, other: ColumnSet) -> ColumnSet {
        ColumnSet {
            status_code: self.status_code || other.status_code,
            connection_state: self.connection_state || other.connection_state,
            signal_strength: self.signal_strength || other.signal_strength,
            speed_kmph: self.speed_kmph || other.speed_kmph,
        }
    }
}

// ── Raw (uncleaned) data ──────────────────────────────────────────────────────

/// One row exactly as read from a record file, before any coercion.
///
/// Cells are trimmed; blank cells and absent columns are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub api_name: String,
    pub timestamp: Option<String>,
    pub latency_ms: Option<String>,
    pub status_code: Option<String>,
    pub connection_state: Option<String>,
    pub signal_strength: Option<String>,
    pub speed_kmph: Option<String>,
}

/// The unified table produced by the loader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub records: Vec<RawRecord>,
    pub columns: ColumnSet,
}

impl RawTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append the rows of one file, widening the column set as needed.
    pub fn append(&mut self, records: Vec<RawRecord>, columns: ColumnSet) {
        self.records.extend(records);
        self.columns = self.columns.union(columns);
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// One validated API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// UTC instant the call was logged.
    pub timestamp: DateTime<Utc>,
    /// Round-trip duration in milliseconds.
    pub latency_ms: f64,
    /// Status code, or [`INVALID_STATUS`] when unknown.
    pub status_code: i32,
    /// API the record belongs to, derived from its source file.
    pub api_name: String,
    /// Network state label; `None` only when the column is unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_kmph: Option<f64>,
}

impl Record {
    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_STATUS
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_code(self.status_code)
    }

    /// `true` when the call was made in any state other than `"connected"`.
    ///
    /// Always `false` when the connection state is unavailable.
    pub fn is_disconnected(&self) -> bool {
        self.connection_state
            .as_deref()
            .is_some_and(|state| state != CONNECTED_STATE)
    }
}

// ── RecordTable ───────────────────────────────────────────────────────────────

/// The cleaned, invariant-respecting table handed to metrics and rendering.
///
/// Records keep their original load order; top-N tie breaking relies on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    records: Vec<Record>,
    columns: ColumnSet,
}

impl RecordTable {
    pub fn new(records: Vec<Record>, columns: ColumnSet) -> Self {
        Self { records, columns }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn columns(&self) -> ColumnSet {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Records with status 200.
    pub fn successes(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_success())
    }

    pub fn has_connection_state(&self) -> bool {
        self.columns.connection_state
    }

    pub fn has_signal_strength(&self) -> bool {
        self.columns.signal_strength
    }

    pub fn has_speed(&self) -> bool {
        self.columns.speed_kmph
    }

    /// Distinct API names, sorted.
    pub fn api_names(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.api_name.as_str()).collect()
    }

    /// Render the table back into raw cell text so it can be cleaned again.
    pub fn to_raw(&self) -> RawTable {
        let records = self
            .records
            .iter()
            .map(|r| RawRecord {
                api_name: r.api_name.clone(),
                timestamp: Some(r.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                latency_ms: Some(r.latency_ms.to_string()),
                status_code: self.columns.status_code.then(|| r.status_code.to_string()),
                connection_state: r.connection_state.clone(),
                signal_strength: r.signal_strength.map(|v| v.to_string()),
                speed_kmph: r.speed_kmph.map(|v| v.to_string()),
            })
            .collect();

        RawTable {
            records,
            columns: self.columns,
        }
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
