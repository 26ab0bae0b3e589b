//! Annotation events and event-name de-duplication.

use crate::core::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A labelled period of interest entered by an observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub event: String,
    pub start: f64,
    pub stop: f64,
}

/// A validated, ordered list of annotations for one subject.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Annotations {
    items: Vec<Annotation>,
}

impl Annotations {
    /// Build from three parallel columns.
    ///
    /// Fails if the columns differ in length, a time is not finite, or an
    /// annotation stops before it starts.
    pub fn from_columns(
        events: Vec<String>,
        starts: Vec<f64>,
        stops: Vec<f64>,
    ) -> Result<Self, CoreError> {
        if starts.len() != stops.len() || starts.len() != events.len() {
            return Err(CoreError::Input(format!(
                "start, stop and event columns must have equal length (got {}, {} and {})",
                starts.len(),
                stops.len(),
                events.len()
            )));
        }

        let items = events
            .into_iter()
            .zip(starts.into_iter().zip(stops))
            .enumerate()
            .map(|(i, (event, (start, stop)))| {
                if !start.is_finite() || !stop.is_finite() {
                    return Err(CoreError::Input(format!(
                        "annotation {i} ('{event}') has a non-finite start or stop time"
                    )));
                }
                if stop < start {
                    return Err(CoreError::Input(format!(
                        "annotation {i} ('{event}') stops at {stop} before it starts at {start}"
                    )));
                }
                Ok(Annotation { event, start, stop })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { items })
    }

    /// Build from textual columns, parsing start and stop times as floats.
    pub fn parse_columns<S: AsRef<str>>(
        events: Vec<String>,
        starts: &[S],
        stops: &[S],
    ) -> Result<Self, CoreError> {
        if starts.len() != stops.len() || starts.len() != events.len() {
            return Err(CoreError::Input(format!(
                "start, stop and event columns must have equal length (got {}, {} and {})",
                starts.len(),
                stops.len(),
                events.len()
            )));
        }

        let starts = parse_times("start", starts)?;
        let stops = parse_times("stop", stops)?;
        Self::from_columns(events, starts, stops)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.items.iter()
    }

    /// Event names made pairwise unique, in annotation order.
    pub fn unique_event_names(&self) -> Vec<String> {
        dedup_event_names(self.items.iter().map(|a| a.event.as_str()))
    }
}

impl<'a> IntoIterator for &'a Annotations {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn parse_times<S: AsRef<str>>(column: &str, values: &[S]) -> Result<Vec<f64>, CoreError> {
    values
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let raw = raw.as_ref().trim();
            raw.parse::<f64>().map_err(|_| {
                CoreError::Input(format!(
                    "{column} time '{raw}' of annotation {i} is not a number"
                ))
            })
        })
        .collect()
}

/// Append a 1-based occurrence counter to every name that appears more
/// than once: `["walk", "run", "walk"]` becomes `["walk 1", "run", "walk 2"]`.
///
/// Names that occur once are left untouched. A counter that would produce
/// a name already present in the list is skipped.
pub fn dedup_event_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let names: Vec<&str> = names.into_iter().collect();

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for &name in &names {
        *occurrences.entry(name).or_insert(0) += 1;
    }

    let mut taken: HashSet<String> = occurrences
        .iter()
        .filter(|&(_, &count)| count == 1)
        .map(|(name, _)| name.to_string())
        .collect();
    let mut counters: HashMap<&str, usize> = HashMap::new();

    names
        .iter()
        .map(|&name| {
            if occurrences[name] == 1 {
                return name.to_string();
            }
            let counter = counters.entry(name).or_insert(0);
            loop {
                *counter += 1;
                let candidate = format!("{name} {counter}");
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_repeated_names() {
        let out = dedup_event_names(["walk", "run", "walk", "walk"]);
        assert_eq!(out, names(&["walk 1", "run", "walk 2", "walk 3"]));
    }

    #[test]
    fn test_dedup_unique_names_untouched() {
        let out = dedup_event_names(["sit", "stand", "walk"]);
        assert_eq!(out, names(&["sit", "stand", "walk"]));
        assert!(dedup_event_names(Vec::<&str>::new()).is_empty());
    }

    #[test]
    fn test_dedup_avoids_collisions() {
        let out = dedup_event_names(["walk 1", "walk", "walk"]);
        assert_eq!(out, names(&["walk 1", "walk 2", "walk 3"]));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = Annotations::from_columns(
            names(&["a", "b"]),
            vec![0.0, 1.0, 2.0],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Input(msg) if msg.contains("equal length")));
    }

    #[test]
    fn test_parse_columns() {
        let annotations =
            Annotations::parse_columns(names(&["sit", "walk"]), &["100", " 250.5"], &["200", "400"])
                .unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations.iter().nth(1).map(|a| a.start), Some(250.5));

        let err = Annotations::parse_columns(names(&["sit"]), &["abc"], &["200"]).unwrap_err();
        assert!(matches!(err, CoreError::Input(msg) if msg.contains("not a number")));
    }

    #[test]
    fn test_invalid_times_rejected() {
        let err = Annotations::from_columns(names(&["sit"]), vec![10.0], vec![5.0]).unwrap_err();
        assert!(matches!(err, CoreError::Input(_)));

        let err =
            Annotations::from_columns(names(&["sit"]), vec![f64::NAN], vec![5.0]).unwrap_err();
        assert!(matches!(err, CoreError::Input(_)));
    }

    #[test]
    fn test_unique_event_names() {
        let annotations = Annotations::from_columns(
            names(&["walk", "walk"]),
            vec![0.0, 10.0],
            vec![5.0, 15.0],
        )
        .unwrap();
        assert_eq!(annotations.unique_event_names(), names(&["walk 1", "walk 2"]));
    }
}
