use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::Parser;

use crate::error::ReportError;
use crate::time_utils::{resolve_timezone, start_of_day};

/// Default validity cutoff; earlier timestamps are clock-fault artifacts.
pub const DEFAULT_CUTOFF: &str = "2025-01-01";
/// Default length of the slowest-calls list.
pub const DEFAULT_TOP_N: usize = 10;
/// Default sub-directory of the target folder that holds the CSV files.
pub const DEFAULT_DATA_SUBDIR: &str = "api_latency";
/// Directory under the home directory that collects reports by run name.
pub const REPORTS_DIR_NAME: &str = "latency-reports";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Analyze per-API latency logs and render a paginated report
#[derive(Parser, Debug, Clone)]
#[command(
    name = "latency-report",
    about = "Analyze per-API latency logs and render a paginated report",
    version
)]
pub struct Settings {
    /// Folder containing the latency logs (e.g. one device log dump)
    pub target_folder: PathBuf,

    /// Sub-directory of the target folder holding `<api>_api_latency.csv` files
    /// (empty string reads the target folder itself)
    #[arg(long, default_value = DEFAULT_DATA_SUBDIR)]
    pub data_subdir: String,

    /// Output directory (defaults to ~/latency-reports/<run name>)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Drop records logged before this date (YYYY-MM-DD)
    #[arg(long, default_value = DEFAULT_CUTOFF, value_parser = parse_cutoff)]
    pub cutoff: NaiveDate,

    /// Number of slowest calls listed in the report
    #[arg(long, default_value_t = DEFAULT_TOP_N, value_parser = parse_top_n)]
    pub top_n: usize,

    /// Timezone for timestamps without an offset (IANA name or "auto")
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse process arguments; exits with a usage message on error.
    pub fn load() -> Self {
        Self::parse().resolved()
    }

    /// Parse an explicit argument list, for tests and embedding.
    pub fn try_load_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args).map(Self::resolved)
    }

    /// Apply `--debug` on top of `--log-level`.
    fn resolved(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    /// Display name of the run: the last component of the target folder.
    pub fn run_name(&self) -> String {
        run_name_for(&self.target_folder)
    }

    /// Directory the record files are read from.
    pub fn data_dir(&self) -> PathBuf {
        if self.data_subdir.is_empty() {
            self.target_folder.clone()
        } else {
            self.target_folder.join(&self.data_subdir)
        }
    }

    /// Output directory, falling back to `~/latency-reports/<run name>`.
    pub fn resolve_output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(REPORTS_DIR_NAME).join(self.run_name())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let timezone = resolve_timezone(&self.timezone);
        PipelineConfig {
            cutoff: start_of_day(self.cutoff, timezone),
            timezone,
            top_n: self.top_n,
        }
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Parameters of the cleaning and metrics stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Records strictly before this instant are dropped.
    pub cutoff: DateTime<Utc>,
    /// Zone used to interpret timestamps without an offset.
    pub timezone: Tz,
    /// Length of the slowest-calls list.
    pub top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let cutoff_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
        Self {
            cutoff: start_of_day(cutoff_date, Tz::UTC),
            timezone: Tz::UTC,
            top_n: DEFAULT_TOP_N,
        }
    }
}

// ── Value parsers ──────────────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` cutoff date.
pub fn parse_cutoff(s: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidCutoff(s.to_string()))
}

fn parse_top_n(s: &str) -> Result<usize, ReportError> {
    match s.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ReportError::Config(format!(
            "top-n must be a positive integer, got '{}'",
            s
        ))),
    }
}

fn run_name_for(target: &Path) -> String {
    let name = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
    };
    name(target)
        .or_else(|| std::fs::canonicalize(target).ok().as_deref().and_then(name))
        .unwrap_or_else(|| "latency-report".to_string())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
