//! Final benchmark report
//!
//! The single artifact a run produces. Field labels match the legacy
//! runners (`nqueries`, `latency_stats`, ...) so downstream tooling can
//! read reports from any implementation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::histogram::LATENCY_UNIT;

/// Merged result of the measured phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    /// Total timed calls across all workers
    #[serde(rename = "nqueries")]
    pub queries: u64,
    /// Fastest call in histogram units (0 when no calls ran)
    pub min_latency: u64,
    /// Slowest call in histogram units (0 when no calls ran)
    pub max_latency: u64,
    /// Element-wise sum of worker histograms
    #[serde(rename = "latency_stats")]
    pub latency_counts: Vec<u64>,
    /// Configured length of the measured phase, in seconds
    pub duration: f64,
    /// Response bodies, downsampled with replacement
    pub samples: Vec<String>,
}

impl FinalReport {
    /// Resolution of `min_latency`, `max_latency` and the histogram buckets
    pub fn latency_unit(&self) -> Duration {
        LATENCY_UNIT
    }

    /// Calls per second over the measured phase
    pub fn qps(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        self.queries as f64 / self.duration
    }

    /// Minimum latency in milliseconds
    pub fn min_latency_ms(&self) -> f64 {
        units_to_ms(self.min_latency)
    }

    /// Maximum latency in milliseconds
    pub fn max_latency_ms(&self) -> f64 {
        units_to_ms(self.max_latency)
    }
}

fn units_to_ms(units: u64) -> f64 {
    units as f64 * LATENCY_UNIT.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> FinalReport {
        FinalReport {
            queries: 300,
            min_latency: 150,
            max_latency: 2_000,
            latency_counts: vec![0, 100, 200],
            duration: 30.0,
            samples: vec!["{}".to_string()],
        }
    }

    #[test]
    fn test_serialized_field_labels() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(value["nqueries"], 300);
        assert_eq!(value["min_latency"], 150);
        assert_eq!(value["max_latency"], 2_000);
        assert_eq!(value["latency_stats"], serde_json::json!([0, 100, 200]));
        assert_eq!(value["duration"], 30.0);
        assert_eq!(value["samples"], serde_json::json!(["{}"]));
    }

    #[test]
    fn test_derived_metrics() {
        let report = report();
        assert_eq!(report.qps(), 10.0);
        assert!((report.min_latency_ms() - 1.5).abs() < 1e-9);
        assert!((report.max_latency_ms() - 20.0).abs() < 1e-9);
        assert_eq!(report.latency_unit(), Duration::from_micros(10));
    }

    #[test]
    fn test_qps_with_zero_duration() {
        let report = FinalReport {
            duration: 0.0,
            ..report()
        };
        assert_eq!(report.qps(), 0.0);
    }
}
