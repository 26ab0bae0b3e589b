//! Error and warning types for alignment and segmentation.

use serde::{Deserialize, Serialize};

/// Errors raised by the aligner and the segmenter.
///
/// Every variant is fatal for the subject being processed. Non-fatal
/// conditions are reported as [`TruncatedSegmentWarning`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Structural or type violation in the inputs (mismatched column
    /// lengths, ragged tables, non-numeric annotation times).
    Input(String),
    /// No common time window could be established across locations.
    Alignment(String),
    /// Not enough samples for the requested operation.
    InsufficientData {
        location: String,
        kind: String,
        samples: usize,
        required: usize,
    },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Input(msg) => write!(f, "Input error: {msg}"),
            CoreError::Alignment(msg) => write!(f, "Alignment error: {msg}"),
            CoreError::InsufficientData {
                location,
                kind,
                samples,
                required,
            } => write!(
                f,
                "Insufficient data: {location}/{kind} has {samples} samples, {required} required"
            ),
        }
    }
}

impl std::error::Error for CoreError {}

/// A segment whose pre-event padding reached past the start of the table.
///
/// The segment was still emitted, starting at row 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncatedSegmentWarning {
    pub location: String,
    pub kind: String,
    pub event: String,
    /// Padding rows requested by `pre_time`
    pub requested_pad: usize,
    /// Padding rows actually available before the event start
    pub available_pad: usize,
}

impl std::fmt::Display for TruncatedSegmentWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} event '{}': pre-time padding truncated to {} of {} samples",
            self.location, self.kind, self.event, self.available_pad, self.requested_pad
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InsufficientData {
            location: "chest".to_string(),
            kind: "gyro".to_string(),
            samples: 3,
            required: 4,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data: chest/gyro has 3 samples, 4 required"
        );

        let err = CoreError::Input("length mismatch".to_string());
        assert!(err.to_string().starts_with("Input error"));
    }

    #[test]
    fn test_warning_display() {
        let warning = TruncatedSegmentWarning {
            location: "chest".to_string(),
            kind: "accel".to_string(),
            event: "walk 1".to_string(),
            requested_pad: 5,
            available_pad: 2,
        };
        assert!(warning.to_string().contains("truncated to 2 of 5"));
    }
}
