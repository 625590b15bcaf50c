//! Fixed-resolution latency histogram
//!
//! Latency is quantized to [`LATENCY_UNIT`] and counted into
//! `1 + timeout / unit` buckets. Anything slower than the timeout lands in
//! the last (overflow) bucket, so the bucket array is sized once up front
//! and never grows mid-run.

use std::time::Duration;

/// Histogram resolution
pub const LATENCY_UNIT: Duration = Duration::from_micros(10);

/// Convert a latency into whole histogram units (truncating)
pub fn quantize(latency: Duration) -> u64 {
    let units = latency.as_nanos() / LATENCY_UNIT.as_nanos();
    u64::try_from(units).unwrap_or(u64::MAX)
}

/// Number of buckets needed for a given timeout
pub fn bucket_count(timeout: Duration) -> usize {
    usize::try_from(quantize(timeout))
        .unwrap_or(usize::MAX - 1)
        .saturating_add(1)
}

/// Bucket counts for one worker or a merged run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyHistogram {
    counts: Vec<u64>,
}

impl LatencyHistogram {
    /// Create an empty histogram sized for `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self::with_buckets(bucket_count(timeout))
    }

    /// Create an empty histogram with an explicit bucket count (at least one)
    pub fn with_buckets(buckets: usize) -> Self {
        Self {
            counts: vec![0; buckets.max(1)],
        }
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Always false; a histogram has at least the overflow bucket
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Index of the overflow bucket
    pub fn overflow_index(&self) -> usize {
        self.counts.len() - 1
    }

    /// Count one call of `units` quantized latency, returning its bucket
    pub fn record(&mut self, units: u64) -> usize {
        let index = usize::try_from(units)
            .unwrap_or(usize::MAX)
            .min(self.overflow_index());
        self.counts[index] += 1;
        index
    }

    /// Element-wise add another histogram of the same shape
    pub fn merge(&mut self, other: &LatencyHistogram) {
        debug_assert_eq!(self.counts.len(), other.counts.len());
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine += theirs;
        }
    }

    /// Sum of all buckets
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn into_counts(self) -> Vec<u64> {
        self.counts
    }
}
