//! Thread-safe counters for a processing run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Processing statistics for the current run.
///
/// Shared between worker threads; every counter is updated atomically.
#[derive(Debug)]
pub struct ProcessingLog {
    /// Subjects that were aligned and segmented without error
    subjects_processed: AtomicU64,
    /// Subjects whose processing failed
    subjects_failed: AtomicU64,
    /// Sensor tables produced by alignment
    tables_aligned: AtomicU64,
    /// Event segments produced by segmentation
    segments_emitted: AtomicU64,
    /// Segments whose pre-event padding was clamped
    truncated_segments: AtomicU64,
    /// Run start time
    run_start: DateTime<Utc>,
}

impl ProcessingLog {
    /// Create a new processing log.
    pub fn new() -> Self {
        Self {
            subjects_processed: AtomicU64::new(0),
            subjects_failed: AtomicU64::new(0),
            tables_aligned: AtomicU64::new(0),
            segments_emitted: AtomicU64::new(0),
            truncated_segments: AtomicU64::new(0),
            run_start: Utc::now(),
        }
    }

    /// Record a successfully processed subject.
    pub fn record_subject_processed(&self) {
        self.subjects_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed subject.
    pub fn record_subject_failed(&self) {
        self.subjects_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record aligned tables.
    pub fn record_tables_aligned(&self, count: u64) {
        self.tables_aligned.fetch_add(count, Ordering::Relaxed);
    }

    /// Record emitted segments.
    pub fn record_segments(&self, count: u64) {
        self.segments_emitted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record clamped segments.
    pub fn record_truncated(&self, count: u64) {
        self.truncated_segments.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> ProcessingStats {
        ProcessingStats {
            subjects_processed: self.subjects_processed.load(Ordering::Relaxed),
            subjects_failed: self.subjects_failed.load(Ordering::Relaxed),
            tables_aligned: self.tables_aligned.load(Ordering::Relaxed),
            segments_emitted: self.segments_emitted.load(Ordering::Relaxed),
            truncated_segments: self.truncated_segments.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_ms: (Utc::now() - self.run_start).num_milliseconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Run Statistics:\n\
             - Subjects processed: {}\n\
             - Subjects failed: {}\n\
             - Tables aligned: {}\n\
             - Segments emitted: {}\n\
             - Segments with truncated pre-time: {}\n\
             - Run duration: {:.1} seconds",
            stats.subjects_processed,
            stats.subjects_failed,
            stats.tables_aligned,
            stats.segments_emitted,
            stats.truncated_segments,
            stats.run_duration_ms as f64 / 1000.0
        )
    }

    /// Write the current statistics to `path` as JSON.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.stats()).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for ProcessingLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of processing statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub subjects_processed: u64,
    pub subjects_failed: u64,
    pub tables_aligned: u64,
    pub segments_emitted: u64,
    pub truncated_segments: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_ms: u64,
}

/// Thread-safe shared processing log.
pub type SharedProcessingLog = Arc<ProcessingLog>;

/// Create a new shared processing log.
pub fn create_shared_log() -> SharedProcessingLog {
    Arc::new(ProcessingLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_log_counting() {
        let log = ProcessingLog::new();

        log.record_subject_processed();
        log.record_subject_processed();
        log.record_subject_failed();
        log.record_segments(12);
        log.record_truncated(1);

        let stats = log.stats();
        assert_eq!(stats.subjects_processed, 2);
        assert_eq!(stats.subjects_failed, 1);
        assert_eq!(stats.segments_emitted, 12);
        assert_eq!(stats.truncated_segments, 1);
        assert_eq!(stats.tables_aligned, 0);
    }

    #[test]
    fn test_shared_across_threads() {
        let log = create_shared_log();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || log.record_tables_aligned(5))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.stats().tables_aligned, 20);
    }

    #[test]
    fn test_summary_format() {
        let log = ProcessingLog::new();
        let summary = log.summary();

        assert!(summary.contains("Subjects processed: 0"));
        assert!(summary.contains("Segments emitted"));
        assert!(summary.contains("truncated pre-time"));
    }

    #[test]
    fn test_save_to() {
        let path = std::env::temp_dir().join(format!("biostamp-stats-{}.json", uuid::Uuid::new_v4()));
        let log = ProcessingLog::new();
        log.record_segments(3);
        log.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let stats: ProcessingStats = serde_json::from_str(&content).unwrap();
        assert_eq!(stats.segments_emitted, 3);
        let _ = std::fs::remove_file(&path);
    }
}
