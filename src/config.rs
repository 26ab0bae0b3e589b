//! Configuration for the BioStamp segmenter.

use crate::core::{
    Aligner, CoreError, MissingReferencePolicy, SampleRateCatalog, Segmenter,
    DEFAULT_RATES_HZ, DEFAULT_REFERENCE_KIND,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for processing a study.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling rates (Hz) the hardware can record at
    pub sample_rates_hz: Vec<f64>,

    /// Sensor kind whose recording window defines alignment
    pub reference_kind: String,

    /// Handling of locations without a reference table
    pub missing_reference: MissingReferencePolicy,

    /// Sensor kinds loaded from each recording
    pub sensor_kinds: Vec<String>,

    /// Seconds of data to include before each annotated event
    pub pre_time_secs: f64,

    /// Table time units per second (1000 for millisecond timestamps)
    pub time_units_per_second: f64,

    /// Whether to run timestamp alignment
    pub align: bool,

    /// Whether to run event segmentation
    pub segment: bool,

    /// Number of subjects processed in parallel
    pub workers: usize,

    /// Default path for processed output
    pub output_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("biostamp-segmenter");

        Self {
            sample_rates_hz: DEFAULT_RATES_HZ.to_vec(),
            reference_kind: DEFAULT_REFERENCE_KIND.to_string(),
            missing_reference: MissingReferencePolicy::default(),
            sensor_kinds: vec!["accel".to_string(), "gyro".to_string()],
            pre_time_secs: 0.0,
            time_units_per_second: 1000.0,
            align: true,
            segment: true,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            output_path: data_dir.join("study.json"),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("biostamp-segmenter")
            .join("config.json")
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog().is_none() {
            return Err(ConfigError::Invalid(
                "sample_rates_hz must contain at least one positive rate".to_string(),
            ));
        }
        if !(self.time_units_per_second.is_finite() && self.time_units_per_second > 0.0) {
            return Err(ConfigError::Invalid(
                "time_units_per_second must be positive".to_string(),
            ));
        }
        if !self.pre_time_secs.is_finite() || self.pre_time_secs < 0.0 {
            return Err(ConfigError::Invalid(
                "pre_time_secs must be zero or positive".to_string(),
            ));
        }
        if self.reference_kind.trim().is_empty() {
            return Err(ConfigError::Invalid("reference_kind is empty".to_string()));
        }
        Ok(())
    }

    pub fn catalog(&self) -> Option<SampleRateCatalog> {
        SampleRateCatalog::new(self.sample_rates_hz.iter().copied())
    }

    /// Build the aligner described by this configuration.
    pub fn aligner(&self) -> Result<Aligner, ConfigError> {
        let catalog = self.catalog().ok_or_else(|| {
            ConfigError::Invalid("sample_rates_hz must contain a positive rate".to_string())
        })?;
        Ok(Aligner::new(catalog)
            .with_reference_kind(self.reference_kind.clone())
            .with_missing_reference(self.missing_reference)
            .with_time_units_per_second(self.time_units_per_second))
    }

    /// Build the segmenter described by this configuration.
    pub fn segmenter(&self) -> Result<Segmenter, ConfigError> {
        Segmenter::new(self.pre_time_secs)
            .map(|s| s.with_time_units_per_second(self.time_units_per_second))
            .map_err(|e: CoreError| ConfigError::Invalid(e.to_string()))
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
