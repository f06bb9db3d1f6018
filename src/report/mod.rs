//! Report module - console summaries and exported results

pub mod analysis_report;
pub mod summary;

pub use analysis_report::*;
pub use summary::*;
