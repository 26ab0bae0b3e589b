//! Sampling rates supported by the sensor hardware.

use serde::{Deserialize, Serialize};

/// Nominal BioStamp RC sampling rates, in Hz.
pub const DEFAULT_RATES_HZ: [f64; 4] = [31.25, 62.5, 125.0, 250.0];

/// The fixed set of sampling rates a recording can have been made at.
///
/// Intervals are derived on demand in whatever time unit the tables use,
/// given the number of those units per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRateCatalog {
    rates_hz: Vec<f64>,
}

impl SampleRateCatalog {
    /// Create a catalog from rates in Hz.
    ///
    /// Non-positive and non-finite rates are discarded. Returns `None` if
    /// nothing valid remains.
    pub fn new(rates_hz: impl IntoIterator<Item = f64>) -> Option<Self> {
        let rates_hz: Vec<f64> = rates_hz
            .into_iter()
            .filter(|r| r.is_finite() && *r > 0.0)
            .collect();
        if rates_hz.is_empty() {
            None
        } else {
            Some(Self { rates_hz })
        }
    }

    /// Allowed rates in Hz, in catalog order.
    pub fn rates_hz(&self) -> &[f64] {
        &self.rates_hz
    }

    /// Sampling intervals in table time units, in catalog order.
    pub fn intervals(&self, units_per_second: f64) -> Vec<f64> {
        self.rates_hz.iter().map(|r| units_per_second / r).collect()
    }

    /// Snap a measured interval to the closest catalog interval.
    ///
    /// Ties resolve to the entry listed first.
    pub fn snap_interval(&self, measured: f64, units_per_second: f64) -> f64 {
        let mut best = units_per_second / self.rates_hz[0];
        let mut best_distance = (best - measured).abs();

        for interval in self.intervals(units_per_second).into_iter().skip(1) {
            let distance = (interval - measured).abs();
            if distance < best_distance {
                best = interval;
                best_distance = distance;
            }
        }

        best
    }
}

impl Default for SampleRateCatalog {
    fn default() -> Self {
        Self {
            rates_hz: DEFAULT_RATES_HZ.to_vec(),
        }
    }
}
