//! Record file discovery and loading.
//!
//! Reads one `<api_name>_api_latency.csv` file per API from a directory and
//! concatenates their rows into a single [`RawTable`], tagging every row with
//! the API name derived from its file name.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use latency_core::error::{ReportError, Result};
use latency_core::models::{ColumnSet, RawRecord, RawTable};
use regex::Regex;
use tracing::{debug, info, warn};

/// File-name suffix that carries the API name in front of it.
pub const FILE_SUFFIX: &str = "_api_latency.csv";

const COL_TIMESTAMP: &str = "timestamp";
const COL_LATENCY: &str = "latency_ms";
const COL_STATUS: &str = "status_code";
const COL_CONNECTION_STATE: &str = "connection_state";
const COL_SIGNAL: &str = "signal_strength";
const COL_SPEED: &str = "speed_kmph";

// ── Public API ────────────────────────────────────────────────────────────────

/// Per-run bookkeeping of what the loader did.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadSummary {
    /// CSV files found in the directory.
    pub files_found: usize,
    /// Files parsed and appended to the table.
    pub files_loaded: usize,
    /// Files skipped because they could not be read or parsed.
    pub files_skipped: usize,
}

/// Find all `.csv` files directly inside `data_path`, sorted by path.
pub fn find_record_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Derive the API name from a record file path.
///
/// `google_places_api_latency.csv` → `google_places`. Files that do not follow
/// the naming convention keep their file stem.
pub fn api_name_from_path(path: &Path) -> String {
    static SUFFIX_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = SUFFIX_RE.get_or_init(|| Regex::new(r"(?i)^(?P<api>.+)_api_latency\.csv$").ok());

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if let Some(caps) = re.as_ref().and_then(|re| re.captures(&file_name)) {
        return caps["api"].to_string();
    }

    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or(file_name)
}

/// Load every record file under `data_path` into one table.
///
/// A missing directory or one without CSV files yields an empty table. Files
/// that fail to parse are skipped with a warning; the rest still load.
pub fn load_records(data_path: &Path) -> (RawTable, LoadSummary) {
    let files = find_record_files(data_path);
    let mut summary = LoadSummary {
        files_found: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        warn!("No CSV files found in {}", data_path.display());
        return (RawTable::new(), summary);
    }

    let mut table = RawTable::new();
    for file_path in &files {
        match read_record_file(file_path) {
            Ok((records, columns)) => {
                info!(
                    "Loaded {} with {} records.",
                    file_path.display(),
                    records.len()
                );
                table.append(records, columns);
                summary.files_loaded += 1;
            }
            Err(e) => {
                warn!("Error loading {}: {}", file_path.display(), e);
                summary.files_skipped += 1;
            }
        }
    }

    debug!(
        "Loaded {} rows from {} of {} files",
        table.len(),
        summary.files_loaded,
        summary.files_found
    );

    (table, summary)
}

/// Parse a single record file.
///
/// Returns the rows tagged with the file's API name and the set of optional
/// columns the header declared. Fails when the file cannot be read, a row is
/// malformed, or a mandatory column is missing.
pub fn read_record_file(path: &Path) -> Result<(Vec<RawRecord>, ColumnSet)> {
    let file = std::fs::File::open(path).map_err(|source| ReportError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .clone();
    let layout = HeaderLayout::from_headers(&headers);

    let timestamp_idx = layout.timestamp.ok_or_else(|| missing(path, COL_TIMESTAMP))?;
    let latency_idx = layout.latency_ms.ok_or_else(|| missing(path, COL_LATENCY))?;

    let api_name = api_name_from_path(path);
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row.map_err(|source| csv_error(path, source))?;
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        records.push(RawRecord {
            api_name: api_name.clone(),
            timestamp: cell(Some(timestamp_idx)),
            latency_ms: cell(Some(latency_idx)),
            status_code: cell(layout.status_code),
            connection_state: cell(layout.connection_state),
            signal_strength: cell(layout.signal_strength),
            speed_kmph: cell(layout.speed_kmph),
        });
    }

    Ok((records, layout.columns()))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Column positions resolved from a header row.
#[derive(Debug, Default)]
struct HeaderLayout {
    timestamp: Option<usize>,
    latency_ms: Option<usize>,
    status_code: Option<usize>,
    connection_state: Option<usize>,
    signal_strength: Option<usize>,
    speed_kmph: Option<usize>,
}

impl HeaderLayout {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        Self {
            timestamp: find(COL_TIMESTAMP),
            latency_ms: find(COL_LATENCY),
            status_code: find(COL_STATUS),
            connection_state: find(COL_CONNECTION_STATE),
            signal_strength: find(COL_SIGNAL),
            speed_kmph: find(COL_SPEED),
        }
    }

    fn columns(&self) -> ColumnSet {
        ColumnSet {
            status_code: self.status_code.is_some(),
            connection_state: self.connection_state.is_some(),
            signal_strength: self.signal_strength.is_some(),
            speed_kmph: self.speed_kmph.is_some(),
        }
    }
}

fn csv_error(path: &Path, source: csv::Error) -> ReportError {
    ReportError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn missing(path: &Path, column: &str) -> ReportError {
    ReportError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
