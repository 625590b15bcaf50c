//! Merging per-worker stats into the final report
//!
//! Counts and histograms are summed, min/max come from workers that
//! actually ran timed calls, and the pooled samples are re-drawn with
//! replacement down to the configured sample count so report size does
//! not grow with concurrency.

use std::time::Duration;

use rand::Rng;

use crate::histogram::{bucket_count, LatencyHistogram};
use crate::report::FinalReport;
use crate::stats::WorkerStats;

/// Collects worker results for one phase
#[derive(Debug)]
pub struct Aggregator {
    queries: u64,
    min_latency: Option<u64>,
    max_latency: Option<u64>,
    histogram: LatencyHistogram,
    pool: Vec<String>,
    workers: usize,
}

impl Aggregator {
    /// Create an aggregator for histograms sized by `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            queries: 0,
            min_latency: None,
            max_latency: None,
            histogram: LatencyHistogram::with_buckets(bucket_count(timeout)),
            pool: Vec::new(),
            workers: 0,
        }
    }

    /// Fold in one worker's stats
    pub fn add(&mut self, stats: WorkerStats) {
        self.queries += stats.queries;
        self.histogram.merge(&stats.histogram);
        if let Some(min) = stats.min_latency {
            self.min_latency = Some(self.min_latency.map_or(min, |m| m.min(min)));
        }
        if let Some(max) = stats.max_latency {
            self.max_latency = Some(self.max_latency.map_or(max, |m| m.max(max)));
        }
        self.pool.extend(stats.samples);
        self.workers += 1;
    }

    /// Number of workers merged so far
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Produce the report, drawing `sample_count` samples from the pool
    pub fn finish<R: Rng + ?Sized>(
        self,
        duration: Duration,
        sample_count: usize,
        rng: &mut R,
    ) -> FinalReport {
        let samples = if self.pool.is_empty() {
            Vec::new()
        } else {
            (0..sample_count)
                .map(|_| self.pool[rng.gen_range(0..self.pool.len())].clone())
                .collect()
        };

        FinalReport {
            queries: self.queries,
            min_latency: self.min_latency.unwrap_or(0),
            max_latency: self.max_latency.unwrap_or(0),
            latency_counts: self.histogram.into_counts(),
            duration: duration.as_secs_f64(),
            samples,
        }
    }
}

/// Merge a full set of worker stats in one go
pub fn merge<R: Rng + ?Sized>(
    stats: impl IntoIterator<Item = WorkerStats>,
    timeout: Duration,
    duration: Duration,
    sample_count: usize,
    rng: &mut R,
) -> FinalReport {
    let mut aggregator = Aggregator::new(timeout);
    for worker in stats {
        aggregator.add(worker);
    }
    aggregator.finish(duration, sample_count, rng)
}
