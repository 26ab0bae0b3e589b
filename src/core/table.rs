//! Sensor tables: a timestamp column plus any number of channel columns.

use crate::core::error::CoreError;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::ops::Range;

/// A time-ordered table of samples from one sensor kind.
///
/// Stored column-major. Row `i` is `timestamps[i]` followed by
/// `channels[c][i]` for every channel `c`. Timestamps are expected to be
/// ascending; this is not verified.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSensorTable")]
pub struct SensorTable {
    timestamps: Vec<f64>,
    channels: Vec<Vec<f64>>,
}

/// Unchecked form read from disk; validated through [`SensorTable::new`].
#[derive(Deserialize)]
struct RawSensorTable {
    timestamps: Vec<f64>,
    channels: Vec<Vec<f64>>,
}

impl TryFrom<RawSensorTable> for SensorTable {
    type Error = CoreError;

    fn try_from(raw: RawSensorTable) -> Result<Self, Self::Error> {
        SensorTable::new(raw.timestamps, raw.channels)
    }
}

impl SensorTable {
    /// Build a table from a timestamp column and channel columns.
    pub fn new(timestamps: Vec<f64>, channels: Vec<Vec<f64>>) -> Result<Self, CoreError> {
        if let Some((idx, column)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != timestamps.len())
        {
            return Err(CoreError::Input(format!(
                "channel {} has {} values but there are {} timestamps",
                idx + 1,
                column.len(),
                timestamps.len()
            )));
        }

        Ok(Self {
            timestamps,
            channels,
        })
    }

    /// Build a table from rows where column 0 is the timestamp.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, CoreError> {
        let width = match rows.first() {
            Some(row) if row.is_empty() => {
                return Err(CoreError::Input("rows must contain a time column".to_string()))
            }
            Some(row) => row.len(),
            None => return Ok(Self::default()),
        };

        let mut timestamps = Vec::with_capacity(rows.len());
        let mut channels = vec![Vec::with_capacity(rows.len()); width - 1];

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(CoreError::Input(format!(
                    "row {row_idx} has {} columns, expected {width}",
                    row.len()
                )));
            }
            timestamps.push(row[0]);
            for (column, &value) in channels.iter_mut().zip(&row[1..]) {
                column.push(value);
            }
        }

        Ok(Self {
            timestamps,
            channels,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of value columns (excluding time).
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Row `index` as `[time, ch1, ch2, ...]`.
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        let time = *self.timestamps.get(index)?;
        let mut row = Vec::with_capacity(self.channels.len() + 1);
        row.push(time);
        row.extend(self.channels.iter().map(|c| c[index]));
        Some(row)
    }

    pub fn first_timestamp(&self) -> Option<f64> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.timestamps.last().copied()
    }

    /// Mean of consecutive timestamp differences, in table time units.
    ///
    /// Returns `None` for tables with fewer than two rows.
    pub fn mean_interval(&self) -> Option<f64> {
        if self.timestamps.len() < 2 {
            return None;
        }
        Some(self.timestamps.windows(2).map(|w| w[1] - w[0]).mean())
    }

    /// Index of the row whose timestamp is closest to `target`.
    ///
    /// Ties resolve to the earlier row. Returns `None` for an empty table.
    pub fn nearest_index(&self, target: f64) -> Option<usize> {
        if self.timestamps.is_empty() {
            return None;
        }

        let upper = self.timestamps.partition_point(|&t| t < target);
        if upper == 0 {
            return Some(0);
        }
        if upper == self.timestamps.len() {
            return Some(upper - 1);
        }

        let below = target - self.timestamps[upper - 1];
        let above = self.timestamps[upper] - target;
        Some(if below <= above { upper - 1 } else { upper })
    }

    /// Copy of the rows in `range`.
    ///
    /// The range is clipped to the table bounds; an inverted range yields
    /// an empty table with the same channel count.
    pub fn slice(&self, range: Range<usize>) -> SensorTable {
        let end = range.end.min(self.len());
        let start = range.start.min(end);

        SensorTable {
            timestamps: self.timestamps[start..end].to_vec(),
            channels: self
                .channels
                .iter()
                .map(|c| c[start..end].to_vec())
                .collect(),
        }
    }

    /// Append the rows of `other`, which must have the same channel count.
    pub fn extend_from(&mut self, other: &SensorTable) -> Result<(), CoreError> {
        if self.is_empty() && self.channels.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        if other.channel_count() != self.channel_count() {
            return Err(CoreError::Input(format!(
                "cannot append a table with {} channels to one with {}",
                other.channel_count(),
                self.channel_count()
            )));
        }

        self.timestamps.extend_from_slice(&other.timestamps);
        for (column, extra) in self.channels.iter_mut().zip(&other.channels) {
            column.extend_from_slice(extra);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> SensorTable {
        let rows: Vec<Vec<f64>> = (0..6)
            .map(|i| vec![i as f64 * 10.0, i as f64, -(i as f64)])
            .collect();
        SensorTable::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_from_rows() {
        let table = sample_table();
        assert_eq!(table.len(), 6);
        assert_eq!(table.channel_count(), 2);
        assert_eq!(table.row(2), Some(vec![20.0, 2.0, -2.0]));
        assert_eq!(table.row(6), None);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![0.0, 1.0], vec![1.0]];
        assert!(matches!(
            SensorTable::from_rows(&rows),
            Err(CoreError::Input(_))
        ));

        let err = SensorTable::new(vec![0.0, 1.0], vec![vec![1.0]]);
        assert!(matches!(err, Err(CoreError::Input(_))));
    }

    #[test]
    fn test_mean_interval() {
        assert_eq!(sample_table().mean_interval(), Some(10.0));

        let single = SensorTable::new(vec![5.0], vec![vec![1.0]]).unwrap();
        assert_eq!(single.mean_interval(), None);
    }

    #[test]
    fn test_nearest_index() {
        let table = sample_table();
        assert_eq!(table.nearest_index(21.0), Some(2));
        assert_eq!(table.nearest_index(39.0), Some(4));
        assert_eq!(table.nearest_index(-100.0), Some(0));
        assert_eq!(table.nearest_index(1000.0), Some(5));
        // Equidistant resolves to the earlier row
        assert_eq!(table.nearest_index(15.0), Some(1));
        assert_eq!(SensorTable::default().nearest_index(1.0), None);
    }

    #[test]
    fn test_slice_is_independent() {
        let table = sample_table();
        let part = table.slice(2..4);
        assert_eq!(part.timestamps(), &[20.0, 30.0]);
        assert_eq!(part.channel(0), Some(&[2.0, 3.0][..]));

        let clipped = table.slice(4..100);
        assert_eq!(clipped.len(), 2);

        #[allow(clippy::reversed_empty_ranges)]
        let inverted = table.slice(4..2);
        assert!(inverted.is_empty());
        assert_eq!(inverted.channel_count(), 2);
    }

    #[test]
    fn test_extend_from() {
        let mut table = SensorTable::default();
        table.extend_from(&sample_table()).unwrap();
        table.extend_from(&sample_table()).unwrap();
        assert_eq!(table.len(), 12);

        let narrow = SensorTable::new(vec![0.0], vec![vec![1.0]]).unwrap();
        assert!(table.extend_from(&narrow).is_err());
    }

    #[test]
    fn test_deserialize_validates_lengths() {
        let table: SensorTable =
            serde_json::from_str(r#"{"timestamps":[0.0,8.0],"channels":[[1.0,2.0]]}"#).unwrap();
        assert_eq!(table.len(), 2);

        let ragged = serde_json::from_str::<SensorTable>(
            r#"{"timestamps":[0.0,8.0],"channels":[[1.0]]}"#,
        );
        let err = ragged.unwrap_err().to_string();
        assert!(err.contains("channel 1 has 1 values"), "{err}");
    }
}
