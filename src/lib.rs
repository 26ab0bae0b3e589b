//! BioStamp Segmenter - align and segment MC10 BioStamp RC recordings.
//!
//! BioStamp RC sensors record each channel group (accelerometer,
//! gyroscope, ...) on its own clock and at one of a few hardware rates.
//! This crate puts every sensor location of a subject onto one regular
//! time base and then cuts the recording into the events an observer
//! annotated during the session.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      BioStamp Segmenter                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Loader    │──▶│   Aligner   │──▶│  Segmenter  │         │
//! │  │ (CSV study) │   │ (cubic fit) │   │  (events)   │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │                           │                 │                 │
//! │                           ▼                 ▼                 │
//! │                    ┌─────────────┐   ┌─────────────┐         │
//! │                    │ Processing  │   │  Persister  │         │
//! │                    │     Log     │   │   (JSON)    │         │
//! │                    └─────────────┘   └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use biostamp_segmenter::core::{Aligner, Annotations, Segmenter, SensorTable, SubjectData};
//!
//! let times: Vec<f64> = (0..100).map(|i| i as f64 * 8.0).collect();
//! let values = times.iter().map(|t| (t / 100.0).sin()).collect();
//!
//! let mut subject = SubjectData::new();
//! subject.insert("chest", "accel", SensorTable::new(times, vec![values]).unwrap());
//!
//! let aligned = Aligner::default().align(&subject).unwrap();
//!
//! let annotations = Annotations::from_columns(
//!     vec!["walk".to_string(), "walk".to_string()],
//!     vec![80.0, 400.0],
//!     vec![240.0, 560.0],
//! )
//! .unwrap();
//! let segmentation = Segmenter::new(0.0).unwrap().segment(&aligned, &annotations).unwrap();
//!
//! assert!(segmentation.data.get("chest", "accel", "walk 2").is_some());
//! ```

pub mod config;
pub mod core;
pub mod loader;
pub mod persist;
pub mod pipeline;
pub mod report;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    Aligner, Annotation, Annotations, CoreError, MissingReferencePolicy, SampleRateCatalog,
    SegmentedData, Segmenter, SensorTable, SubjectData, TruncatedSegmentWarning,
};
pub use loader::{LoadedStudy, LoaderError, StudyLoader};
pub use persist::{load_study, save_study, OutputFormat, PersistError};
pub use pipeline::{Pipeline, RunMetadata, StudyOutput, SubjectInput, SubjectOutput};
pub use report::{ProcessingLog, ProcessingStats, SharedProcessingLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
