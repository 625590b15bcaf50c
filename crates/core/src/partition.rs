//! Input partitioning
//!
//! Splits the shared argument pool into contiguous, non-overlapping slices,
//! one per worker. Every worker reads the same backing array, but only
//! inside its own index range, so concurrent reads never touch the same
//! tuple.

use std::ops::Range;
use std::sync::Arc;

use rand::Rng;

use crate::config::ArgTuple;
use crate::error::ConfigError;

/// Index ranges for `workers` slices over `inputs` elements
///
/// Slice `i` covers `[chunk*i, chunk*(i+1))` with `chunk = ceil(inputs / workers)`,
/// clipped to `inputs`. Ranges past the end come back empty.
pub fn chunk_ranges(inputs: usize, workers: usize) -> Vec<Range<usize>> {
    if workers == 0 {
        return Vec::new();
    }
    let chunk = inputs.div_ceil(workers);
    (0..workers)
        .map(|i| {
            let start = chunk.saturating_mul(i).min(inputs);
            let end = chunk.saturating_mul(i + 1).min(inputs);
            start..end
        })
        .collect()
}

/// One worker's view into the shared argument pool
///
/// Only [`partition`] builds these, and it never hands out an empty one.
#[derive(Debug, Clone)]
pub struct Partition {
    inputs: Arc<[ArgTuple]>,
    range: Range<usize>,
}

impl Partition {
    /// Index range into the shared pool
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// The worker's tuples, in original order
    pub fn as_slice(&self) -> &[ArgTuple] {
        &self.inputs[self.range.clone()]
    }

    /// Tuple at a partition-local index
    pub fn get(&self, index: usize) -> Option<&ArgTuple> {
        self.as_slice().get(index)
    }

    /// Pick a tuple uniformly at random (with replacement)
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &ArgTuple {
        // partition() never hands out an empty range
        let index = rng.gen_range(self.range.clone());
        &self.inputs[index]
    }
}

/// Split the argument pool into one partition per worker
///
/// Fails when there is nothing to split, or when some worker would end up
/// with an empty slice (it would have nothing to pick from).
pub fn partition(inputs: &Arc<[ArgTuple]>, workers: usize) -> Result<Vec<Partition>, ConfigError> {
    if workers == 0 {
        return Err(ConfigError::ZeroConcurrency);
    }
    if inputs.is_empty() {
        return Err(ConfigError::EmptyInputs);
    }

    let ranges = chunk_ranges(inputs.len(), workers);
    if let Some(worker) = ranges.iter().position(|r| r.is_empty()) {
        return Err(ConfigError::EmptyPartition {
            worker,
            inputs: inputs.len(),
            concurrency: workers,
        });
    }

    Ok(ranges
        .into_iter()
        .map(|range| Partition {
            inputs: Arc::clone(inputs),
            range,
        })
        .collect())
}
