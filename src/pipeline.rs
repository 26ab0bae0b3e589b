//! Per-subject processing and parallel study runs.
//!
//! Each subject is aligned, then segmented, independently of every other
//! subject. A study run fans subjects out to worker threads over a
//! channel and collects each result into its own slot, so one subject
//! failing never affects another.

use crate::config::{Config, ConfigError};
use crate::core::{
    Aligner, Annotations, CoreError, SegmentedData, Segmenter, SubjectData,
    TruncatedSegmentWarning,
};
use crate::report::{create_shared_log, SharedProcessingLog};
use chrono::{DateTime, Utc};
use crossbeam_channel::unbounded;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Everything the core needs for one subject.
#[derive(Debug, Clone)]
pub struct SubjectInput {
    pub subject: String,
    pub data: SubjectData,
    pub annotations: Annotations,
}

/// Processed result for one subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectOutput {
    /// Aligned (or raw) tables; only kept when segmentation is skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SubjectData>,
    /// Event segments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<SegmentedData>,
    /// Non-fatal segmentation warnings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TruncatedSegmentWarning>,
}

/// Description of the run that produced a [`StudyOutput`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub aligned: bool,
    pub segmented: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_time_secs: Option<f64>,
}

/// Results for every subject of a study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyOutput {
    pub metadata: RunMetadata,
    pub subjects: BTreeMap<String, SubjectOutput>,
    /// Subject → error message for subjects that could not be processed
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<String, String>,
}

/// Aligner and segmenter composed per subject.
pub struct Pipeline {
    aligner: Option<Aligner>,
    segmenter: Option<Segmenter>,
    workers: usize,
    log: SharedProcessingLog,
}

impl Pipeline {
    /// Create a pipeline; either stage may be skipped by passing `None`.
    pub fn new(aligner: Option<Aligner>, segmenter: Option<Segmenter>) -> Self {
        Self {
            aligner,
            segmenter,
            workers: 1,
            log: create_shared_log(),
        }
    }

    /// Create the pipeline described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let aligner = if config.align {
            Some(config.aligner()?)
        } else {
            None
        };
        let segmenter = if config.segment {
            Some(config.segmenter()?)
        } else {
            None
        };
        Ok(Self::new(aligner, segmenter).with_workers(config.workers))
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Record statistics into an existing log.
    pub fn with_log(mut self, log: SharedProcessingLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> &SharedProcessingLog {
        &self.log
    }

    /// Align then segment one subject.
    pub fn process_subject(&self, input: &SubjectInput) -> Result<SubjectOutput, CoreError> {
        let aligned;
        let data = match &self.aligner {
            Some(aligner) => {
                aligned = aligner.align(&input.data)?;
                &aligned
            }
            None => &input.data,
        };

        let mut output = SubjectOutput::default();
        match &self.segmenter {
            Some(segmenter) => {
                let segmentation = segmenter.segment(data, &input.annotations)?;
                output.segments = Some(segmentation.data);
                output.warnings = segmentation.warnings;
            }
            None => output.data = Some(data.clone()),
        }

        if self.aligner.is_some() {
            self.log.record_tables_aligned(data.table_count() as u64);
        }
        if let Some(segments) = &output.segments {
            self.log.record_segments(segments.segment_count() as u64);
        }
        self.log.record_truncated(output.warnings.len() as u64);

        Ok(output)
    }

    /// Process every subject, in parallel when more than one worker is configured.
    pub fn process_study(&self, inputs: Vec<SubjectInput>) -> StudyOutput {
        let mut study = StudyOutput {
            metadata: self.metadata(),
            subjects: BTreeMap::new(),
            failures: BTreeMap::new(),
        };
        if inputs.is_empty() {
            return study;
        }

        let workers = self.workers.min(inputs.len());
        tracing::info!(
            "Processing {} subjects on {} worker(s)",
            inputs.len(),
            workers
        );

        let (job_tx, job_rx) = unbounded::<SubjectInput>();
        let (result_tx, result_rx) = unbounded();
        for input in inputs {
            // Receiver is alive until the scope below ends
            let _ = job_tx.send(input);
        }
        drop(job_tx);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for input in job_rx.iter() {
                        let result = self.process_subject(&input);
                        if result_tx.send((input.subject, result)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        for (subject, result) in result_rx.iter() {
            match result {
                Ok(output) => {
                    tracing::info!(
                        "Subject {subject}: {} segments, {} warnings",
                        output.segments.as_ref().map_or(0, SegmentedData::segment_count),
                        output.warnings.len()
                    );
                    self.log.record_subject_processed();
                    study.subjects.insert(subject, output);
                }
                Err(e) => {
                    tracing::error!("Subject {subject} failed: {e}");
                    self.log.record_subject_failed();
                    study.failures.insert(subject, e.to_string());
                }
            }
        }

        study
    }

    fn metadata(&self) -> RunMetadata {
        RunMetadata {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            version: crate::VERSION.to_string(),
            aligned: self.aligner.is_some(),
            segmented: self.segmenter.is_some(),
            reference_kind: self.aligner.as_ref().map(|a| a.reference_kind().to_string()),
            pre_time_secs: self.segmenter.as_ref().map(Segmenter::pre_time_secs),
        }
    }
}
