//! Core alignment and segmentation engine.
//!
//! This module contains:
//! - Sensor tables and the per-subject containers built from them
//! - Timestamp alignment onto common per-location time vectors
//! - Event segmentation driven by annotations

pub mod align;
pub mod annotations;
pub mod catalog;
pub mod error;
pub mod segment;
pub mod spline;
pub mod subject;
pub mod table;

// Re-export commonly used types
pub use align::{Aligner, CommonWindow, MissingReferencePolicy, DEFAULT_REFERENCE_KIND};
pub use annotations::{dedup_event_names, Annotation, Annotations};
pub use catalog::{SampleRateCatalog, DEFAULT_RATES_HZ};
pub use error::{CoreError, TruncatedSegmentWarning};
pub use segment::{Segmentation, Segmenter};
pub use subject::{EventSegments, LocationData, SegmentedData, SubjectData};
pub use table::SensorTable;
