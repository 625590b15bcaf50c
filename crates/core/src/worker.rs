//! Worker loop
//!
//! A worker owns one [`Operation`] and one input partition. It first draws
//! response samples, then runs the timed loop until the phase duration
//! elapses, counting every call into its private histogram. The operation
//! is closed exactly once on every exit path.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{BenchError, OperationError, Result};
use crate::partition::Partition;
use crate::provider::Operation;
use crate::runner::Phase;
use crate::stats::WorkerStats;

/// Per-worker parameters for one phase
#[derive(Debug, Clone, Copy)]
pub struct WorkerParams {
    /// Worker index, for diagnostics
    pub index: usize,
    pub phase: Phase,
    /// Timed-loop length; zero skips the timed loop
    pub duration: Duration,
    /// Histogram timeout
    pub timeout: Duration,
    /// Samples to draw before the timed loop
    pub sample_count: usize,
}

/// Run one worker to completion and close its operation
///
/// The operation is closed whether the loop finished, failed, or stopped
/// because `cancel` fired. A loop error takes precedence over a close error.
///
/// The histogram records the latency each [`Execution`](crate::provider::Execution)
/// reports, as measured by the provider around its own call, rather than a
/// clock the worker holds around `exec`.
pub async fn run_worker<R>(
    op: &mut dyn Operation,
    partition: &Partition,
    params: WorkerParams,
    rng: &mut R,
    cancel: &CancellationToken,
) -> Result<WorkerStats>
where
    R: Rng + Send + ?Sized,
{
    let outcome = drive(op, partition, params, rng, cancel).await;
    let closed = op.close().await;

    match (outcome, closed) {
        (Ok(stats), Ok(())) => Ok(stats),
        (Ok(_), Err(source)) => Err(BenchError::Close {
            worker: params.index,
            phase: params.phase,
            source,
        }),
        (Err(err), Err(close_err)) => {
            warn!(
                worker = params.index,
                phase = %params.phase,
                error = %close_err,
                "close failed after worker error"
            );
            Err(err)
        }
        (Err(err), Ok(())) => Err(err),
    }
}

async fn drive<R>(
    op: &mut dyn Operation,
    partition: &Partition,
    params: WorkerParams,
    rng: &mut R,
    cancel: &CancellationToken,
) -> Result<WorkerStats>
where
    R: Rng + Send + ?Sized,
{
    let mut stats = WorkerStats::new(params.timeout, params.sample_count);
    let op_error = |source: OperationError| BenchError::Operation {
        worker: params.index,
        phase: params.phase,
        source,
    };
    let aborted = || BenchError::Aborted {
        worker: params.index,
        phase: params.phase,
    };

    for _ in 0..params.sample_count {
        if cancel.is_cancelled() {
            return Err(aborted());
        }
        let args = partition.choose(rng);
        let execution = op.exec(args).await.map_err(op_error)?;
        stats.push_sample(execution.sample);
    }

    if params.duration.is_zero() {
        debug!(
            worker = params.index,
            phase = %params.phase,
            samples = stats.samples.len(),
            "timed loop skipped for zero duration"
        );
        return Ok(stats);
    }

    let start = Instant::now();
    while start.elapsed() < params.duration {
        if cancel.is_cancelled() {
            return Err(aborted());
        }
        let args = partition.choose(rng);
        let execution = op.exec(args).await.map_err(op_error)?;
        stats.record(execution.latency);
    }

    debug!(
        worker = params.index,
        phase = %params.phase,
        queries = stats.queries,
        samples = stats.samples.len(),
        "worker finished"
    );
    Ok(stats)
}
