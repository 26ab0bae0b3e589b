//! Processing report for a study run.
//!
//! Tracks what the pipeline did across all subjects so a run can be
//! summarised and audited after the fact.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, ProcessingLog, ProcessingStats, SharedProcessingLog};
