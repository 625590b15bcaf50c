// Benchmark Engine
//
// Protocol-agnostic load generator: splits an argument pool across workers,
// drives each worker's operation for a fixed duration, and merges the
// per-worker latency histograms into one report.
//
// Key design decisions:
// - Backends plug in through traits (Operation, OperationProvider); provider
//   crates register themselves in a ProviderRegistry at startup
// - Each worker owns its operation, its partition view, its RNG and its stats;
//   results are handed to the runner once, over a channel
// - The first worker failure aborts the phase, but every operation is still closed
// - Latencies are counted in 10µs buckets, clamped at the configured timeout

pub mod aggregate;
pub mod config;
pub mod error;
pub mod histogram;
pub mod params;
pub mod partition;
pub mod provider;
pub mod report;
pub mod runner;
pub mod stats;
pub mod telemetry;
pub mod worker;

// Re-exports for convenience
pub use aggregate::{merge, Aggregator};
pub use config::{ArgTuple, BenchConfig, QuerySpec, Target};
pub use error::{BenchError, ConfigError, OperationError, Result};
pub use histogram::{bucket_count, quantize, LatencyHistogram, LATENCY_UNIT};
pub use params::{to_json_object, ParamValue, QueryKind, QueryParams, Variables};
pub use partition::{chunk_ranges, partition, Partition};
pub use provider::{
    BoxedOperation, BoxedProvider, Execution, Operation, OperationProvider, ProviderRegistry,
};
pub use report::FinalReport;
pub use runner::{BenchmarkRunner, Phase};
pub use stats::WorkerStats;
pub use telemetry::{init_telemetry, TelemetryConfig};
pub use worker::{run_worker, WorkerParams};
