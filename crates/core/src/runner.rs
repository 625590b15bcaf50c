//! Benchmark runner
//!
//! Runs the whole pipeline twice: a warm-up pass whose results are
//! discarded, then the measured pass that produces the [`FinalReport`].
//! Each pass launches one task per partition, each with its own freshly
//! built operation, and waits for exactly one result per worker on a
//! bounded channel before anything is merged.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::aggregate::Aggregator;
use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::partition::{partition, Partition};
use crate::provider::BoxedProvider;
use crate::report::FinalReport;
use crate::stats::WorkerStats;
use crate::worker::{run_worker, WorkerParams};

/// Benchmark phases, always run in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Results are discarded
    Warmup,
    /// Results become the report
    Measured,
}

impl Phase {
    /// Offset that keeps seeded RNG streams distinct per phase
    fn stream_base(self) -> u64 {
        match self {
            Phase::Warmup => 0,
            Phase::Measured => 1 << 32,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Warmup => write!(f, "warmup"),
            Phase::Measured => write!(f, "measured"),
        }
    }
}

/// Stream id reserved for the aggregator's downsampling RNG
const AGGREGATE_STREAM: u64 = u32::MAX as u64;

/// Drives warm-up and measured phases against one provider
pub struct BenchmarkRunner {
    config: Arc<BenchConfig>,
    provider: BoxedProvider,
}

impl BenchmarkRunner {
    pub fn new(config: BenchConfig, provider: BoxedProvider) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run warm-up then the measured phase and return the measured report
    #[instrument(skip(self), fields(benchmark = %self.config.benchmark, query = %self.config.query.name))]
    pub async fn run(&self) -> Result<FinalReport> {
        self.config.validate()?;
        let partitions = partition(&self.config.args, self.config.concurrency)?;

        info!(
            concurrency = self.config.concurrency,
            inputs = self.config.args.len(),
            warmup = ?self.config.warmup,
            duration = ?self.config.duration,
            "starting benchmark"
        );

        let warmup = self.run_phase(Phase::Warmup, &partitions).await?;
        debug!(queries = warmup.queries, "warmup results discarded");

        let report = self.run_phase(Phase::Measured, &partitions).await?;
        info!(
            queries = report.queries,
            qps = report.qps(),
            min_ms = report.min_latency_ms(),
            max_ms = report.max_latency_ms(),
            "benchmark complete"
        );
        Ok(report)
    }

    /// Run one phase over the given partitions and merge the results
    ///
    /// The report's `duration` is the configured length of the phase, so
    /// `queries / duration` matches the timed loops that produced the counts.
    ///
    /// On the first worker failure every other worker is told to stop at its
    /// next loop check; all workers are still awaited so each one closes its
    /// operation before the error is returned.
    pub async fn run_phase(&self, phase: Phase, partitions: &[Partition]) -> Result<FinalReport> {
        let duration = self.phase_duration(phase);
        let workers = partitions.len();
        let (tx, mut rx) = mpsc::channel::<(usize, Result<WorkerStats>)>(workers.max(1));
        let cancel = CancellationToken::new();

        info!(%phase, workers, duration = ?duration, "phase starting");
        let started = Instant::now();

        let mut handles = Vec::with_capacity(workers);
        for (index, part) in partitions.iter().cloned().enumerate() {
            let tx = tx.clone();
            let provider = Arc::clone(&self.provider);
            let config = Arc::clone(&self.config);
            let cancel = cancel.clone();
            let mut rng = self.rng(phase, index as u64);
            let params = WorkerParams {
                index,
                phase,
                duration,
                timeout: config.timeout,
                sample_count: config.sample_count,
            };

            handles.push(tokio::spawn(async move {
                let result = match provider.make_worker(&config).await {
                    Ok(mut op) => run_worker(op.as_mut(), &part, params, &mut rng, &cancel).await,
                    Err(source) => Err(BenchError::Operation {
                        worker: index,
                        phase,
                        source,
                    }),
                };
                // The receiver outlives every worker; a failed send means the run was dropped
                let _ = tx.send((index, result)).await;
            }));
        }
        drop(tx);

        // Slotted by worker index so merge order doesn't depend on scheduling
        let mut slots: Vec<Option<WorkerStats>> = (0..workers).map(|_| None).collect();
        let mut failure: Option<BenchError> = None;
        let mut received = 0;
        while received < workers {
            let Some((index, result)) = rx.recv().await else {
                break;
            };
            received += 1;
            match result {
                Ok(stats) => slots[index] = Some(stats),
                Err(err) => {
                    if !cancel.is_cancelled() {
                        error!(worker = index, %phase, error = %err, "worker failed, stopping remaining workers");
                        cancel.cancel();
                    }
                    failure.get_or_insert(err);
                }
            }
        }
        let elapsed = started.elapsed();

        if received < workers {
            // Every sender is gone, so the missing workers died without reporting
            for handle in handles {
                if let Err(join_err) = handle.await {
                    return Err(BenchError::WorkerPanicked(join_err.to_string()));
                }
            }
            return Err(BenchError::WorkerPanicked(format!(
                "{} of {} workers never reported",
                workers - received,
                workers
            )));
        }
        if let Some(err) = failure {
            return Err(err);
        }

        let mut aggregator = Aggregator::new(self.config.timeout);
        for stats in slots.into_iter().flatten() {
            aggregator.add(stats);
        }
        let mut rng = self.rng(phase, AGGREGATE_STREAM);
        // The report carries the configured phase length; `elapsed` also
        // covers connection setup and sampling
        let report = aggregator.finish(duration, self.config.sample_count, &mut rng);
        info!(
            %phase,
            queries = report.queries,
            elapsed = ?elapsed,
            "phase complete"
        );
        Ok(report)
    }

    fn phase_duration(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Warmup => self.config.warmup,
            Phase::Measured => self.config.duration,
        }
    }

    fn rng(&self, phase: Phase, stream: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => {
                StdRng::seed_from_u64(seed.wrapping_add(phase.stream_base()).wrapping_add(stream))
            }
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Warmup.to_string(), "warmup");
        assert_eq!(Phase::Measured.to_string(), "measured");
        assert_ne!(Phase::Warmup.stream_base(), Phase::Measured.stream_base());
    }
}
