//! Data layer of the latency report.
//!
//! Responsible for discovering and reading per-API latency CSV files,
//! cleaning them into a validated table, computing grouped metrics,
//! deriving insights and running the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod cleaner;
pub mod insights;
pub mod reader;

pub use latency_core as core;
