mod bootstrap;

use anyhow::{Context, Result};
use latency_core::settings::Settings;
use latency_data::analysis::analyze_directory;
use latency_render::{write_report, ReportConfig};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("latency-report v{} starting", env!("CARGO_PKG_VERSION"));

    let run_name = settings.run_name();
    let data_dir = settings.data_dir();
    let output_dir = settings.resolve_output_dir();

    tracing::info!("Target Folder: {}", settings.target_folder.display());
    tracing::info!("Data Directory: {}", data_dir.display());
    tracing::info!("Output Directory: {}", output_dir.display());

    bootstrap::ensure_output_dir(&output_dir)?;

    tracing::info!("Starting API Latency Analysis...");
    let config = settings.pipeline_config();

    let Some(result) = analyze_directory(&data_dir, &config) else {
        tracing::info!("No data to analyze.");
        return Ok(());
    };

    tracing::info!(
        "Loaded {} records from {} of {} files ({} kept after cleaning)",
        result.cleaning.rows_in,
        result.load.files_loaded,
        result.load.files_found,
        result.table.len()
    );

    let paths = write_report(&result, &ReportConfig::default(), &output_dir, &run_name)
        .with_context(|| format!("failed to write report for {}", run_name))?;

    tracing::info!("Analysis complete. Report saved to {}", paths.html.display());
    println!("{}", paths.html.display());
    println!("{}", paths.text.display());
    println!("{}", paths.metrics.display());

    Ok(())
}
