//! Shared types for the latency report workspace: the record model, the
//! error type, settings, percentile math and formatting helpers.

pub mod error;
pub mod formatting;
pub mod models;
pub mod percentile;
pub mod settings;
pub mod time_utils;

pub use error::{ReportError, Result};
