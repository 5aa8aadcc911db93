use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the latency report pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV record file could not be parsed.
    #[error("Failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A record file is missing one of the required columns.
    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: String },

    /// The validity cutoff supplied on the command line is not a date.
    #[error("Invalid cutoff date: {0}")]
    InvalidCutoff(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The report document could not be produced.
    #[error("Render error: {0}")]
    Render(String),

    /// A JSON document could not be serialized.
    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the latency crates.
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ReportError::FileRead {
            path: PathBuf::from("/logs/maps_api_latency.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/logs/maps_api_latency.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = ReportError::MissingColumn {
            path: PathBuf::from("/logs/a.csv"),
            column: "latency_ms".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required column 'latency_ms' in /logs/a.csv"
        );
    }

    #[test]
    fn test_error_display_invalid_cutoff() {
        let err = ReportError::InvalidCutoff("2025-13-40".to_string());
        assert_eq!(err.to_string(), "Invalid cutoff date: 2025-13-40");
    }

    #[test]
    fn test_error_display_config() {
        let err = ReportError::Config("top-n must be positive".to_string());
        assert_eq!(err.to_string(), "Configuration error: top-n must be positive");
    }

    #[test]
    fn test_error_display_render() {
        let err = ReportError::Render("empty chart".to_string());
        assert_eq!(err.to_string(), "Render error: empty chart");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ReportError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: ReportError = json_err.into();
        assert!(err.to_string().contains("Failed to serialize JSON"));
    }
}
