use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` name onto an [`EnvFilter`] directive.
///
/// Unrecognised names pass through lowercased so that full filter
/// directives such as `latency_data=debug` keep working.
pub fn log_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Falls back to `"info"` if the level string does not parse as a filter.
/// All output goes to stderr so the report paths on stdout stay clean.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(log_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .context("failed to install the log subscriber")?;

    Ok(())
}

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Create the report output directory, including missing parents.
pub fn ensure_output_dir(output_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "cannot create output directory {}",
            output_dir.display()
        )
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── log_directive ─────────────────────────────────────────────────────────

    #[test]
    fn test_log_directive_maps_level_names() {
        assert_eq!(log_directive("DEBUG"), "debug");
        assert_eq!(log_directive("info"), "info");
        assert_eq!(log_directive("WARNING"), "warn");
        assert_eq!(log_directive("ERROR"), "error");
    }

    #[test]
    fn test_log_directive_passes_through_filters() {
        assert_eq!(log_directive("latency_data=debug"), "latency_data=debug");
    }

    // ── ensure_output_dir ─────────────────────────────────────────────────────

    #[test]
    fn test_ensure_output_dir_creates_nested() {
        let tmp = TempDir::new().expect("tempdir");
        let out = tmp.path().join("latency-reports").join("ride_1");

        ensure_output_dir(&out).expect("ensure_output_dir should succeed");
        assert!(out.is_dir());

        // Second call on an existing directory is a no-op.
        ensure_output_dir(&out).expect("existing directory is fine");
    }

    #[test]
    fn test_ensure_output_dir_fails_on_file() {
        let tmp = TempDir::new().expect("tempdir");
        let file = tmp.path().join("taken");
        std::fs::write(&file, "x").unwrap();
        assert!(ensure_output_dir(&file).is_err());
    }
}
