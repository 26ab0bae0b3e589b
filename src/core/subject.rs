//! Per-subject containers for raw, aligned and segmented sensor data.

use crate::core::table::SensorTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sensor kind (e.g. "accel", "gyro") → table, for one sensor location.
pub type LocationData = BTreeMap<String, SensorTable>;

/// Event name → segment, for one sensor kind.
pub type EventSegments = BTreeMap<String, SensorTable>;

/// All sensor tables recorded for one subject, keyed by location then kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectData {
    locations: BTreeMap<String, LocationData>,
}

impl SubjectData {
    /// Create an empty subject.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table, replacing any existing table for the same location and kind.
    pub fn insert(
        &mut self,
        location: impl Into<String>,
        kind: impl Into<String>,
        table: SensorTable,
    ) -> Option<SensorTable> {
        self.locations
            .entry(location.into())
            .or_default()
            .insert(kind.into(), table)
    }

    /// Insert a whole location.
    pub fn insert_location(&mut self, location: impl Into<String>, data: LocationData) {
        self.locations.insert(location.into(), data);
    }

    /// All tables recorded at `location`.
    pub fn location(&self, location: &str) -> Option<&LocationData> {
        self.locations.get(location)
    }

    /// The `kind` table at `location`.
    pub fn get(&self, location: &str, kind: &str) -> Option<&SensorTable> {
        self.locations.get(location)?.get(kind)
    }

    /// Iterate over locations in key order.
    pub fn locations(&self) -> impl Iterator<Item = (&String, &LocationData)> {
        self.locations.iter()
    }

    pub fn location_names(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Total number of tables across all locations.
    pub fn table_count(&self) -> usize {
        self.locations.values().map(BTreeMap::len).sum()
    }
}

/// Segments keyed by location, kind and de-duplicated event name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentedData {
    locations: BTreeMap<String, BTreeMap<String, EventSegments>>,
}

impl SegmentedData {
    /// Create an empty segmentation.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        location: impl Into<String>,
        kind: impl Into<String>,
        event: impl Into<String>,
        segment: SensorTable,
    ) {
        self.locations
            .entry(location.into())
            .or_default()
            .entry(kind.into())
            .or_default()
            .insert(event.into(), segment);
    }

    /// One event's segment.
    pub fn get(&self, location: &str, kind: &str, event: &str) -> Option<&SensorTable> {
        self.locations.get(location)?.get(kind)?.get(event)
    }

    /// All segments for one location and kind.
    pub fn events(&self, location: &str, kind: &str) -> Option<&EventSegments> {
        self.locations.get(location)?.get(kind)
    }

    pub fn locations(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, EventSegments>)> {
        self.locations.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Total number of segments.
    pub fn segment_count(&self) -> usize {
        self.locations
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> SensorTable {
        SensorTable::new((0..n).map(|i| i as f64).collect(), vec![vec![0.0; n]]).unwrap()
    }

    #[test]
    fn test_subject_insert_and_lookup() {
        let mut subject = SubjectData::new();
        subject.insert("wrist", "accel", table(4));
        subject.insert("wrist", "gyro", table(5));
        subject.insert("chest", "accel", table(6));

        assert_eq!(subject.len(), 2);
        assert_eq!(subject.table_count(), 3);
        assert_eq!(subject.get("wrist", "gyro").map(SensorTable::len), Some(5));
        assert!(subject.get("ankle", "accel").is_none());
        assert_eq!(
            subject.location_names().collect::<Vec<_>>(),
            vec!["chest", "wrist"]
        );
    }

    #[test]
    fn test_segmented_count() {
        let mut segmented = SegmentedData::new();
        segmented.insert("wrist", "accel", "walk 1", table(2));
        segmented.insert("wrist", "accel", "walk 2", table(3));
        segmented.insert("wrist", "gyro", "walk 1", table(2));

        assert_eq!(segmented.segment_count(), 3);
        assert_eq!(segmented.events("wrist", "accel").map(BTreeMap::len), Some(2));
        assert!(segmented.get("wrist", "gyro", "walk 2").is_none());
    }

    #[test]
    fn test_subject_serializes_as_nested_maps() {
        let mut subject = SubjectData::new();
        subject.insert("wrist", "accel", table(2));
        let json = serde_json::to_value(&subject).unwrap();
        assert!(json["wrist"]["accel"]["timestamps"].is_array());
    }
}
