//! Timestamp alignment across sensors.
//!
//! Each sensor location is resampled onto a regular time vector that
//! starts where the latest reference recording starts and stops before
//! the earliest reference recording ends. Every kind at a location
//! shares the same time vector; the step is the location's measured
//! sampling interval snapped to the hardware rate catalog.

use crate::core::catalog::SampleRateCatalog;
use crate::core::error::CoreError;
use crate::core::spline::{CubicSpline, SplineError, MIN_POINTS};
use crate::core::subject::{LocationData, SubjectData};
use crate::core::table::SensorTable;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default sensor kind whose timing defines the common window.
pub const DEFAULT_REFERENCE_KIND: &str = "accel";

/// What to do with locations that have no reference table.
///
/// Such locations never contribute to the common window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReferencePolicy {
    /// Leave the location out of the aligned output
    #[default]
    Drop,
    /// Keep the location on its native timestamps
    Passthrough,
    /// Resample onto the common window, timed by the location's first kind
    Resample,
}

impl FromStr for MissingReferencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "passthrough" => Ok(Self::Passthrough),
            "resample" => Ok(Self::Resample),
            other => Err(format!(
                "unknown missing-reference policy '{other}' (expected drop, passthrough or resample)"
            )),
        }
    }
}

impl std::fmt::Display for MissingReferencePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Drop => "drop",
            Self::Passthrough => "passthrough",
            Self::Resample => "resample",
        };
        f.write_str(name)
    }
}

/// The overlap of all reference recordings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommonWindow {
    pub start: f64,
    pub stop: f64,
}

/// Resamples a subject's sensors onto common per-location time vectors.
#[derive(Debug, Clone)]
pub struct Aligner {
    catalog: SampleRateCatalog,
    reference_kind: String,
    missing_reference: MissingReferencePolicy,
    units_per_second: f64,
}

enum LocationPlan<'a> {
    Resample {
        interval: f64,
        splines: Vec<(&'a str, Vec<CubicSpline>)>,
    },
    Passthrough,
    Drop,
}

impl Aligner {
    /// Create an aligner using `catalog`, the "accel" reference kind and
    /// millisecond timestamps.
    pub fn new(catalog: SampleRateCatalog) -> Self {
        Self {
            catalog,
            reference_kind: DEFAULT_REFERENCE_KIND.to_string(),
            missing_reference: MissingReferencePolicy::default(),
            units_per_second: 1000.0,
        }
    }

    /// Sensor kind whose recordings define the common window.
    pub fn with_reference_kind(mut self, kind: impl Into<String>) -> Self {
        self.reference_kind = kind.into();
        self
    }

    /// What to do with locations lacking the reference kind.
    pub fn with_missing_reference(mut self, policy: MissingReferencePolicy) -> Self {
        self.missing_reference = policy;
        self
    }

    /// Number of table time units per second (1000 for milliseconds).
    pub fn with_time_units_per_second(mut self, units: f64) -> Self {
        self.units_per_second = units;
        self
    }

    /// Reference sensor kind.
    pub fn reference_kind(&self) -> &str {
        &self.reference_kind
    }

    /// Latest reference start and earliest reference end across locations.
    pub fn common_window(&self, data: &SubjectData) -> Result<CommonWindow, CoreError> {
        let mut window: Option<CommonWindow> = None;

        for (location, kinds) in data.locations() {
            let Some(reference) = kinds.get(&self.reference_kind) else {
                continue;
            };
            let (Some(begin), Some(end)) = (reference.first_timestamp(), reference.last_timestamp())
            else {
                return Err(insufficient(location, &self.reference_kind, 0));
            };

            window = Some(match window {
                None => CommonWindow {
                    start: begin,
                    stop: end,
                },
                Some(w) => CommonWindow {
                    start: w.start.max(begin),
                    stop: w.stop.min(end),
                },
            });
        }

        let window = window.ok_or_else(|| {
            CoreError::Alignment(format!(
                "no location has a '{}' table to define the common window",
                self.reference_kind
            ))
        })?;

        if window.stop <= window.start {
            return Err(CoreError::Alignment(format!(
                "'{}' recordings do not overlap (latest start {}, earliest end {})",
                self.reference_kind, window.start, window.stop
            )));
        }

        Ok(window)
    }

    /// Align every location of `data`.
    ///
    /// Returns a new subject; `data` is untouched. Nothing is resampled
    /// until every table has been checked and fitted, so an error leaves
    /// no partial result behind.
    pub fn align(&self, data: &SubjectData) -> Result<SubjectData, CoreError> {
        for (location, kinds) in data.locations() {
            if let Some(reference) = kinds.get(&self.reference_kind) {
                if reference.len() < MIN_POINTS {
                    return Err(insufficient(location, &self.reference_kind, reference.len()));
                }
            }
        }

        let window = self.common_window(data)?;
        tracing::debug!(
            "Common window for '{}': {} .. {}",
            self.reference_kind,
            window.start,
            window.stop
        );

        let mut plans = Vec::with_capacity(data.len());
        for (location, kinds) in data.locations() {
            let plan = self.plan_location(location, kinds, window)?;
            plans.push((location, kinds, plan));
        }

        let mut aligned = SubjectData::new();
        for (location, kinds, plan) in plans {
            match plan {
                LocationPlan::Resample { interval, splines } => {
                    let times = time_vector(window.start, window.stop, interval);
                    let mut out = LocationData::new();
                    for (kind, channel_splines) in splines {
                        let channels = channel_splines
                            .iter()
                            .map(|s| s.evaluate_sorted(&times))
                            .collect();
                        out.insert(kind.to_string(), SensorTable::new(times.clone(), channels)?);
                    }
                    tracing::debug!(
                        "Aligned {location}: {} kinds, {} samples at {interval} per sample",
                        out.len(),
                        times.len()
                    );
                    aligned.insert_location(location.clone(), out);
                }
                LocationPlan::Passthrough => {
                    aligned.insert_location(location.clone(), kinds.clone());
                }
                LocationPlan::Drop => {}
            }
        }

        Ok(aligned)
    }

    fn plan_location<'a>(
        &self,
        location: &str,
        kinds: &'a LocationData,
        window: CommonWindow,
    ) -> Result<LocationPlan<'a>, CoreError> {
        let (timing_kind, timing_table) = match kinds.get_key_value(&self.reference_kind) {
            Some(reference) => reference,
            None => match self.missing_reference {
                MissingReferencePolicy::Drop => {
                    tracing::warn!(
                        "Dropping location '{location}': no '{}' table",
                        self.reference_kind
                    );
                    return Ok(LocationPlan::Drop);
                }
                MissingReferencePolicy::Passthrough => {
                    tracing::warn!(
                        "Keeping location '{location}' on native timestamps: no '{}' table",
                        self.reference_kind
                    );
                    return Ok(LocationPlan::Passthrough);
                }
                MissingReferencePolicy::Resample => match kinds.iter().next() {
                    Some(first) => first,
                    None => return Ok(LocationPlan::Drop),
                },
            },
        };

        let measured = timing_table
            .mean_interval()
            .ok_or_else(|| insufficient(location, timing_kind, timing_table.len()))?;
        let interval = self.catalog.snap_interval(measured, self.units_per_second);
        tracing::debug!("{location}: measured interval {measured:.4}, snapped to {interval}");

        let mut splines = Vec::with_capacity(kinds.len());
        for (kind, table) in kinds {
            if table.len() < MIN_POINTS {
                return Err(insufficient(location, kind, table.len()));
            }
            if let (Some(first), Some(last)) = (table.first_timestamp(), table.last_timestamp()) {
                if window.start < first - interval || window.stop > last + interval {
                    tracing::debug!(
                        "{location}/{kind} spans {first} .. {last}; extrapolating to the common window"
                    );
                }
            }

            let fitted = table
                .channels()
                .iter()
                .map(|values| CubicSpline::fit(table.timestamps(), values))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| fit_error(location, kind, e))?;
            splines.push((kind.as_str(), fitted));
        }

        Ok(LocationPlan::Resample { interval, splines })
    }
}

impl Default for Aligner {
    fn default() -> Self {
        Self::new(SampleRateCatalog::default())
    }
}

/// Regular samples from `start` (inclusive) toward `stop` (exclusive).
pub fn time_vector(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step.is_nan() || step <= 0.0 || stop <= start {
        return Vec::new();
    }
    let count = ((stop - start) / step).ceil() as usize;
    (0..count)
        .map(|k| start + k as f64 * step)
        .take_while(|&t| t < stop)
        .collect()
}

fn insufficient(location: &str, kind: &str, samples: usize) -> CoreError {
    CoreError::InsufficientData {
        location: location.to_string(),
        kind: kind.to_string(),
        samples,
        required: MIN_POINTS,
    }
}

fn fit_error(location: &str, kind: &str, err: SplineError) -> CoreError {
    match err {
        SplineError::TooFewPoints(n) => insufficient(location, kind, n),
        other => CoreError::Input(format!("{location}/{kind}: {other}")),
    }
}
