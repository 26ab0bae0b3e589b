//! Loader for BioStamp RC study exports.
//!
//! Expected layout:
//!
//! ```text
//! <study>/annotations.csv
//! <study>/<subject>/<location>/<recording>/<kind>.csv
//! ```
//!
//! Sensor files have a header row and numeric columns, timestamp first.
//! Several recordings of the same kind at one location are concatenated
//! in recording-name order.

use crate::config::Config;
use crate::core::{Annotations, CoreError, SensorTable, SubjectData};
use crate::pipeline::SubjectInput;
use csv::{ReaderBuilder, Trim};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the study-level annotation log.
pub const ANNOTATIONS_FILE: &str = "annotations.csv";

pub const SUBJECT_COLUMN: &str = "Subject";
pub const EVENT_COLUMN: &str = "EventType";
pub const START_COLUMN: &str = "Start Timestamp (ms)";
pub const STOP_COLUMN: &str = "Stop Timestamp (ms)";

/// Errors while reading a study export.
#[derive(Debug)]
pub enum LoaderError {
    Io { path: PathBuf, message: String },
    Csv { path: PathBuf, message: String },
    MissingColumn { path: PathBuf, column: String },
    InvalidValue { path: PathBuf, row: usize, message: String },
    Table { path: PathBuf, source: CoreError },
    NoSensorData(String),
    EmptyStudy(PathBuf),
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderError::Io { path, message } => write!(f, "IO error on {path:?}: {message}"),
            LoaderError::Csv { path, message } => write!(f, "CSV error in {path:?}: {message}"),
            LoaderError::MissingColumn { path, column } => {
                write!(f, "{path:?} has no '{column}' column")
            }
            LoaderError::InvalidValue { path, row, message } => {
                write!(f, "{path:?} row {row}: {message}")
            }
            LoaderError::Table { path, source } => write!(f, "{path:?}: {source}"),
            LoaderError::NoSensorData(subject) => {
                write!(f, "subject {subject} has no sensor data")
            }
            LoaderError::EmptyStudy(path) => write!(f, "no subject directories in {path:?}"),
        }
    }
}

impl std::error::Error for LoaderError {}

/// Annotation columns for one subject, as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationColumns {
    pub events: Vec<String>,
    pub starts: Vec<String>,
    pub stops: Vec<String>,
}

impl AnnotationColumns {
    /// Parse into validated annotations.
    pub fn parse(self) -> Result<Annotations, CoreError> {
        Annotations::parse_columns(self.events, &self.starts, &self.stops)
    }
}

/// Subjects that loaded, plus the ones that did not.
#[derive(Debug, Default)]
pub struct LoadedStudy {
    pub subjects: Vec<SubjectInput>,
    /// Subject → error message
    pub failures: BTreeMap<String, String>,
}

/// Reads subjects from a study export directory.
#[derive(Debug, Clone)]
pub struct StudyLoader {
    root: PathBuf,
    sensor_kinds: Vec<String>,
    subjects: Option<Vec<String>>,
}

impl StudyLoader {
    /// Loader for the study rooted at `root`, reading accel and gyro files.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sensor_kinds: vec!["accel".to_string(), "gyro".to_string()],
            subjects: None,
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &Config) -> Self {
        Self::new(root).with_sensor_kinds(config.sensor_kinds.clone())
    }

    /// Sensor kinds to read (file stems such as "accel").
    pub fn with_sensor_kinds(mut self, kinds: Vec<String>) -> Self {
        self.sensor_kinds = kinds;
        self
    }

    /// Only load these subjects. An empty list loads everything.
    pub fn with_subjects(mut self, subjects: Vec<String>) -> Self {
        self.subjects = if subjects.is_empty() {
            None
        } else {
            Some(subjects)
        };
        self
    }

    /// Subject directory names, sorted.
    pub fn subject_names(&self) -> Result<Vec<String>, LoaderError> {
        let names: Vec<String> = sorted_subdirs(&self.root)?
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| {
                self.subjects
                    .as_ref()
                    .map_or(true, |wanted| wanted.iter().any(|w| w == name))
            })
            .collect();

        if names.is_empty() {
            return Err(LoaderError::EmptyStudy(self.root.clone()));
        }
        Ok(names)
    }

    /// Load every selected subject.
    ///
    /// A subject that cannot be read is recorded in `failures` and skipped.
    pub fn load(&self) -> Result<LoadedStudy, LoaderError> {
        let names = self.subject_names()?;

        let annotations_path = self.root.join(ANNOTATIONS_FILE);
        let mut annotation_log = if annotations_path.exists() {
            read_annotation_log(&annotations_path)?
        } else {
            tracing::warn!("No {ANNOTATIONS_FILE} in {:?}; subjects will have no events", self.root);
            BTreeMap::new()
        };

        let mut study = LoadedStudy::default();
        for name in names {
            let columns = annotation_log.remove(&name).unwrap_or_default();
            match self.load_subject(&name, columns) {
                Ok(input) => {
                    tracing::info!(
                        "Loaded subject {name}: {} tables, {} annotations",
                        input.data.table_count(),
                        input.annotations.len()
                    );
                    study.subjects.push(input);
                }
                Err(e) => {
                    tracing::error!("Could not load subject {name}: {e}");
                    study.failures.insert(name, e.to_string());
                }
            }
        }

        Ok(study)
    }

    /// Load one subject's sensor tables and parse its annotations.
    pub fn load_subject(
        &self,
        subject: &str,
        annotations: AnnotationColumns,
    ) -> Result<SubjectInput, LoaderError> {
        let subject_dir = self.root.join(subject);
        let annotations = annotations.parse().map_err(|source| LoaderError::Table {
            path: self.root.join(ANNOTATIONS_FILE),
            source,
        })?;

        let mut data = SubjectData::new();
        for (location, location_dir) in sorted_subdirs(&subject_dir)? {
            for (recording, recording_dir) in sorted_subdirs(&location_dir)? {
                for kind in &self.sensor_kinds {
                    let path = recording_dir.join(format!("{kind}.csv"));
                    if !path.is_file() {
                        continue;
                    }
                    let table = read_sensor_csv(&path)?;
                    tracing::debug!(
                        "{subject}/{location}/{recording}/{kind}: {} rows",
                        table.len()
                    );
                    append_table(&mut data, &location, kind, table)
                        .map_err(|source| LoaderError::Table { path, source })?;
                }
            }
        }

        if data.is_empty() {
            return Err(LoaderError::NoSensorData(subject.to_string()));
        }

        Ok(SubjectInput {
            subject: subject.to_string(),
            data,
            annotations,
        })
    }
}

fn append_table(
    data: &mut SubjectData,
    location: &str,
    kind: &str,
    table: SensorTable,
) -> Result<(), CoreError> {
    match data.get(location, kind) {
        Some(existing) => {
            let mut merged = existing.clone();
            merged.extend_from(&table)?;
            data.insert(location, kind, merged);
        }
        None => {
            data.insert(location, kind, table);
        }
    }
    Ok(())
}

/// Read a sensor CSV into a table. Column 0 is the timestamp.
pub fn read_sensor_csv(path: &Path) -> Result<SensorTable, LoaderError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let row = record
            .iter()
            .map(|field| {
                field.parse::<f64>().map_err(|_| LoaderError::InvalidValue {
                    path: path.to_path_buf(),
                    row: row_idx + 1,
                    message: format!("'{field}' is not a number"),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        rows.push(row);
    }

    SensorTable::from_rows(&rows).map_err(|source| LoaderError::Table {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the study annotation log, grouped by subject in file order.
pub fn read_annotation_log(path: &Path) -> Result<BTreeMap<String, AnnotationColumns>, LoaderError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoaderError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let subject_idx = column(SUBJECT_COLUMN)?;
    let event_idx = column(EVENT_COLUMN)?;
    let start_idx = column(START_COLUMN)?;
    let stop_idx = column(STOP_COLUMN)?;

    let mut log: BTreeMap<String, AnnotationColumns> = BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();

        let columns = log.entry(field(subject_idx)).or_default();
        columns.events.push(field(event_idx));
        columns.starts.push(field(start_idx));
        columns.stops.push(field(stop_idx));
    }

    Ok(log)
}

/// Non-hidden sub-directories of `dir`, sorted by name.
fn sorted_subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, LoaderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LoaderError::Io {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut dirs: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            (!name.starts_with('.')).then_some((name, p))
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn csv_error(path: &Path, err: csv::Error) -> LoaderError {
    LoaderError::Csv {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
