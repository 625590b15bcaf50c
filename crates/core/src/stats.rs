// Per-worker statistics
//
// Owned by exactly one worker until it is sent to the aggregator.

use std::time::Duration;

use crate::histogram::{quantize, LatencyHistogram};

/// Accumulator for one worker's phase
#[derive(Debug, Clone)]
pub struct WorkerStats {
    /// Timed calls completed
    pub queries: u64,
    /// Fastest timed call in histogram units (unclamped); None when no calls ran
    pub min_latency: Option<u64>,
    /// Slowest timed call in histogram units (unclamped); None when no calls ran
    pub max_latency: Option<u64>,
    pub histogram: LatencyHistogram,
    /// Response bodies from the sampling sub-phase
    pub samples: Vec<String>,
    sample_limit: usize,
}

impl WorkerStats {
    /// Create empty stats sized for `timeout`, keeping at most `sample_limit` samples
    pub fn new(timeout: Duration, sample_limit: usize) -> Self {
        Self {
            queries: 0,
            min_latency: None,
            max_latency: None,
            histogram: LatencyHistogram::new(timeout),
            samples: Vec::with_capacity(sample_limit),
            sample_limit,
        }
    }

    /// Record one timed call, returning the bucket it landed in
    pub fn record(&mut self, latency: Duration) -> usize {
        let units = quantize(latency);
        self.min_latency = Some(self.min_latency.map_or(units, |m| m.min(units)));
        self.max_latency = Some(self.max_latency.map_or(units, |m| m.max(units)));
        self.queries += 1;
        self.histogram.record(units)
    }

    /// Keep a response sample; returns false once the limit is reached
    pub fn push_sample(&mut self, sample: String) -> bool {
        if self.samples.len() >= self.sample_limit {
            return false;
        }
        self.samples.push(sample);
        true
    }

    pub fn sample_limit(&self) -> usize {
        self.sample_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tracks_unclamped_min_max() {
        let mut stats = WorkerStats::new(Duration::from_millis(1), 0);
        stats.record(Duration::from_micros(300));
        stats.record(Duration::from_millis(5));
        stats.record(Duration::from_micros(40));

        assert_eq!(stats.queries, 3);
        assert_eq!(stats.min_latency, Some(4));
        assert_eq!(stats.max_latency, Some(500));
        // the 5ms call is clamped into the overflow bucket
        assert_eq!(stats.histogram.counts()[100], 1);
        assert_eq!(stats.histogram.total(), stats.queries);
    }

    #[test]
    fn test_empty_stats_have_no_extremes() {
        let stats = WorkerStats::new(Duration::from_secs(1), 5);
        assert_eq!(stats.queries, 0);
        assert!(stats.min_latency.is_none());
        assert!(stats.max_latency.is_none());
        assert_eq!(stats.sample_limit(), 5);
    }

    #[test]
    fn test_samples_are_bounded() {
        let mut stats = WorkerStats::new(Duration::from_secs(1), 2);
        assert!(stats.push_sample("a".into()));
        assert!(stats.push_sample("b".into()));
        assert!(!stats.push_sample("c".into()));
        assert_eq!(stats.samples, vec!["a", "b"]);
    }
}
