//! Saving and loading processed study output.

use crate::pipeline::{RunMetadata, StudyOutput, SubjectOutput};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// On-disk format for a [`StudyOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One pretty-printed JSON document
    #[default]
    Json,
    /// A metadata line followed by one line per subject
    Jsonl,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        }
    }

    /// `path` with this format's extension, unless it already has one.
    pub fn resolve_path(&self, path: PathBuf) -> PathBuf {
        if path.extension().is_some() {
            path
        } else {
            path.with_extension(self.extension())
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            other => Err(format!("unknown output format '{other}' (expected json or jsonl)")),
        }
    }
}

/// Persistence errors.
#[derive(Debug)]
pub enum PersistError {
    IoError(String),
    SerializeError(String),
    ParseError(String),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::IoError(e) => write!(f, "IO error: {e}"),
            PersistError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            PersistError::ParseError(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for PersistError {}

/// One line of the JSON Lines format.
#[derive(Serialize)]
#[serde(untagged)]
enum JsonlRecord<'a> {
    Metadata {
        metadata: &'a RunMetadata,
    },
    Subject {
        subject: &'a str,
        output: &'a SubjectOutput,
    },
    Failure {
        subject: &'a str,
        error: &'a str,
    },
}

/// Write `study` to `path`.
pub fn save_study(study: &StudyOutput, path: &Path, format: OutputFormat) -> Result<(), PersistError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PersistError::IoError(e.to_string()))?;
    }

    let file = std::fs::File::create(path).map_err(|e| PersistError::IoError(e.to_string()))?;
    let mut writer = std::io::BufWriter::new(file);

    match format {
        OutputFormat::Json => serde_json::to_writer_pretty(&mut writer, study)
            .map_err(|e| PersistError::SerializeError(e.to_string()))?,
        OutputFormat::Jsonl => {
            let records = std::iter::once(JsonlRecord::Metadata {
                metadata: &study.metadata,
            })
            .chain(study.subjects.iter().map(|(subject, output)| {
                JsonlRecord::Subject { subject, output }
            }))
            .chain(study.failures.iter().map(|(subject, error)| {
                JsonlRecord::Failure { subject, error }
            }));

            for record in records {
                serde_json::to_writer(&mut writer, &record)
                    .map_err(|e| PersistError::SerializeError(e.to_string()))?;
                writer
                    .write_all(b"\n")
                    .map_err(|e| PersistError::IoError(e.to_string()))?;
            }
        }
    }

    writer
        .flush()
        .map_err(|e| PersistError::IoError(e.to_string()))?;
    tracing::info!("Saved study output to {path:?}");
    Ok(())
}

/// Read a study saved in the JSON format.
pub fn load_study(path: &Path) -> Result<StudyOutput, PersistError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| PersistError::IoError(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| PersistError::ParseError(e.to_string()))
}
