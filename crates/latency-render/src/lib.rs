//! Report rendering for the latency analyzer.
//!
//! Turns an analysis result into a paginated, self-contained HTML document
//! with inline SVG charts, a plain-text statistics dump and a JSON metrics
//! sidecar.

pub mod pages;
pub mod svg;
pub mod text_dump;
pub mod themes;
pub mod writer;

pub use themes::ReportConfig;
pub use writer::{write_report, ReportPaths};
