//! Event segmentation.
//!
//! Every sensor table is cut into one segment per annotation. Segment
//! boundaries snap to the rows nearest the annotated start and stop
//! times; the start row is included and the stop row is not. Segments
//! can be extended backward by a fixed pre-event duration.

use crate::core::annotations::Annotations;
use crate::core::error::{CoreError, TruncatedSegmentWarning};
use crate::core::subject::{SegmentedData, SubjectData};
use crate::core::table::SensorTable;

/// Result of segmenting one subject.
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub data: SegmentedData,
    /// Segments whose pre-event padding was clamped at the table start
    pub warnings: Vec<TruncatedSegmentWarning>,
}

/// Slices subject data into annotated event segments.
#[derive(Debug, Clone)]
pub struct Segmenter {
    pre_time_secs: f64,
    units_per_second: f64,
}

impl Segmenter {
    /// Create a segmenter that pads each segment by `pre_time_secs` seconds.
    pub fn new(pre_time_secs: f64) -> Result<Self, CoreError> {
        if !pre_time_secs.is_finite() || pre_time_secs < 0.0 {
            return Err(CoreError::Input(format!(
                "pre_time must be a non-negative number of seconds, got {pre_time_secs}"
            )));
        }
        Ok(Self {
            pre_time_secs,
            units_per_second: 1000.0,
        })
    }

    /// Number of table time units per second (1000 for milliseconds).
    pub fn with_time_units_per_second(mut self, units: f64) -> Self {
        self.units_per_second = units;
        self
    }

    /// Seconds of data kept before each event.
    pub fn pre_time_secs(&self) -> f64 {
        self.pre_time_secs
    }

    /// Segment from raw annotation columns.
    ///
    /// The columns are validated before any table is read.
    pub fn segment_columns(
        &self,
        data: &SubjectData,
        events: Vec<String>,
        starts: Vec<f64>,
        stops: Vec<f64>,
    ) -> Result<Segmentation, CoreError> {
        let annotations = Annotations::from_columns(events, starts, stops)?;
        self.segment(data, &annotations)
    }

    /// Cut every table of `data` into one segment per annotation.
    pub fn segment(
        &self,
        data: &SubjectData,
        annotations: &Annotations,
    ) -> Result<Segmentation, CoreError> {
        let names = annotations.unique_event_names();
        let mut result = Segmentation::default();

        for (location, kinds) in data.locations() {
            for (kind, table) in kinds {
                let pad = self.pad_samples(location, kind, table)?;
                tracing::debug!(
                    "Segmenting {location}/{kind}: {} rows, {pad} rows of pre-event padding",
                    table.len()
                );

                for (annotation, name) in annotations.iter().zip(&names) {
                    // Non-empty table, checked by pad_samples
                    let (Some(start), Some(stop)) = (
                        table.nearest_index(annotation.start),
                        table.nearest_index(annotation.stop),
                    ) else {
                        continue;
                    };

                    let first = match start.checked_sub(pad) {
                        Some(first) => first,
                        None => {
                            let warning = TruncatedSegmentWarning {
                                location: location.clone(),
                                kind: kind.clone(),
                                event: name.clone(),
                                requested_pad: pad,
                                available_pad: start,
                            };
                            tracing::warn!("{warning}");
                            result.warnings.push(warning);
                            0
                        }
                    };

                    result
                        .data
                        .insert(location.clone(), kind.clone(), name.clone(), table.slice(first..stop));
                }
            }
        }

        Ok(result)
    }

    /// Rows of padding corresponding to `pre_time` for this table.
    fn pad_samples(
        &self,
        location: &str,
        kind: &str,
        table: &SensorTable,
    ) -> Result<usize, CoreError> {
        let required = if self.pre_time_secs > 0.0 { 2 } else { 1 };
        if table.len() < required {
            return Err(CoreError::InsufficientData {
                location: location.to_string(),
                kind: kind.to_string(),
                samples: table.len(),
                required,
            });
        }
        if self.pre_time_secs == 0.0 {
            return Ok(0);
        }

        let interval_secs = table.mean_interval().unwrap_or_default() / self.units_per_second;
        if interval_secs <= 0.0 || !interval_secs.is_finite() {
            return Err(CoreError::Input(format!(
                "{location}/{kind}: cannot derive a sampling interval from its timestamps"
            )));
        }
        Ok((self.pre_time_secs / interval_secs).round() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(times: &[f64]) -> SensorTable {
        let values = times.iter().map(|t| t * 2.0).collect();
        SensorTable::new(times.to_vec(), vec![values]).unwrap()
    }

    fn subject(times: &[f64]) -> SubjectData {
        let mut subject = SubjectData::new();
        subject.insert("wrist", "accel", table(times));
        subject
    }

    fn events(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn tens(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 10.0).collect()
    }

    #[test]
    fn test_nearest_index_boundaries() {
        let data = subject(&tens(6));
        let result = Segmenter::new(0.0)
            .unwrap()
            .segment_columns(&data, events(&["reach"]), vec![21.0], vec![39.0])
            .unwrap();

        let segment = result.data.get("wrist", "accel", "reach").unwrap();
        assert_eq!(segment.timestamps(), &[20.0, 30.0]);
        assert_eq!(segment.channel(0), Some(&[40.0, 60.0][..]));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_pre_time_padding() {
        let data = subject(&tens(11));
        let result = Segmenter::new(0.02)
            .unwrap()
            .segment_columns(&data, events(&["walk"]), vec![50.0], vec![80.0])
            .unwrap();

        let segment = result.data.get("wrist", "accel", "walk").unwrap();
        assert_eq!(segment.timestamps(), &[30.0, 40.0, 50.0, 60.0, 70.0]);
    }

    #[test]
    fn test_padding_clamped_at_start() {
        let data = subject(&tens(11));
        let result = Segmenter::new(0.02)
            .unwrap()
            .segment_columns(&data, events(&["stand"]), vec![10.0], vec![40.0])
            .unwrap();

        let segment = result.data.get("wrist", "accel", "stand").unwrap();
        assert_eq!(segment.timestamps(), &[0.0, 10.0, 20.0, 30.0]);
        assert_eq!(
            result.warnings,
            vec![TruncatedSegmentWarning {
                location: "wrist".to_string(),
                kind: "accel".to_string(),
                event: "stand".to_string(),
                requested_pad: 2,
                available_pad: 1,
            }]
        );
    }

    #[test]
    fn test_length_mismatch_before_any_table() {
        // An empty table would fail segmentation if it were ever read
        let mut data = subject(&tens(6));
        data.insert("chest", "accel", SensorTable::default());

        let err = Segmenter::new(0.0)
            .unwrap()
            .segment_columns(
                &data,
                events(&["a", "b"]),
                vec![0.0, 10.0, 20.0],
                vec![5.0, 15.0, 25.0],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Input(_)));
    }

    #[test]
    fn test_repeated_events_and_overlap() {
        let data = subject(&tens(20));
        let result = Segmenter::new(0.0)
            .unwrap()
            .segment_columns(
                &data,
                events(&["walk", "run", "walk", "walk"]),
                vec![0.0, 20.0, 50.0, 100.0],
                vec![40.0, 60.0, 90.0, 150.0],
            )
            .unwrap();

        let segments = result.data.events("wrist", "accel").unwrap();
        let keys: Vec<&str> = segments.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["run", "walk 1", "walk 2", "walk 3"]);
        // "walk 1" and "run" overlap on 20 and 30
        assert_eq!(segments["walk 1"].timestamps(), &[0.0, 10.0, 20.0, 30.0]);
        assert_eq!(segments["run"].timestamps(), &[20.0, 30.0, 40.0, 50.0]);
        assert_eq!(segments["walk 3"].len(), 5);
    }

    #[test]
    fn test_every_kind_segmented_with_own_interval() {
        let mut data = subject(&tens(11));
        data.insert("wrist", "gyro", table(&(0..21).map(|i| i as f64 * 5.0).collect::<Vec<_>>()));

        let result = Segmenter::new(0.02)
            .unwrap()
            .segment_columns(&data, events(&["sit"]), vec![50.0], vec![60.0])
            .unwrap();

        assert_eq!(result.data.segment_count(), 2);
        let gyro = result.data.get("wrist", "gyro", "sit").unwrap();
        // 4 rows of padding at 5 ms
        assert_eq!(gyro.timestamps()[0], 30.0);
        assert_eq!(gyro.len(), 6);
    }

    #[test]
    fn test_empty_table_is_insufficient() {
        let mut data = SubjectData::new();
        data.insert("wrist", "accel", SensorTable::default());
        let err = Segmenter::new(0.0)
            .unwrap()
            .segment_columns(&data, events(&["sit"]), vec![0.0], vec![1.0])
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientData { samples: 0, .. }));
    }

    #[test]
    fn test_negative_pre_time_rejected() {
        assert!(Segmenter::new(-1.0).is_err());
        assert!(Segmenter::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_seconds_time_unit() {
        let times: Vec<f64> = (0..11).map(|i| i as f64 * 0.01).collect();
        let data = subject(&times);
        let result = Segmenter::new(0.02)
            .unwrap()
            .with_time_units_per_second(1.0)
            .segment_columns(&data, events(&["sit"]), vec![0.05], vec![0.08])
            .unwrap();
        let segment = result.data.get("wrist", "accel", "sit").unwrap();
        assert_eq!(segment.len(), 5);
    }
}
