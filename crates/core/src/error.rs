// Error types for the benchmark engine
//
// Every error is fatal to the run. Nothing here is downgraded into a
// skipped data point.

use thiserror::Error;

use crate::runner::Phase;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors detected before any worker starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Concurrency must be at least one worker
    #[error("concurrency must be positive")]
    ZeroConcurrency,

    /// The argument pool has no tuples
    #[error("argument pool is empty")]
    EmptyInputs,

    /// A worker would start with nothing to pick from
    #[error(
        "worker {worker} has an empty input partition ({inputs} inputs across {concurrency} workers)"
    )]
    EmptyPartition {
        worker: usize,
        inputs: usize,
        concurrency: usize,
    },

    /// Timeout must be positive so the histogram has a meaningful range
    #[error("timeout must be positive")]
    ZeroTimeout,

    /// The query name has no parameter mapping
    #[error("unknown query name: {0}")]
    UnknownQuery(String),

    /// No provider is registered under the requested tag
    #[error("unknown benchmark provider: {0}")]
    UnknownProvider(String),
}

/// Errors surfaced by an operation provider
#[derive(Debug, Error)]
pub enum OperationError {
    /// Could not establish the worker's private connection
    #[error("connect error: {0}")]
    Connect(String),

    /// The backend rejected or failed a call
    #[error("request error: {0}")]
    Request(String),

    /// The arguments or the response could not be encoded/decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Releasing the worker's resources failed
    #[error("close error: {0}")]
    Close(String),
}

impl OperationError {
    /// Create a connect error
    pub fn connect(msg: impl Into<String>) -> Self {
        OperationError::Connect(msg.into())
    }

    /// Create a request error
    pub fn request(msg: impl Into<String>) -> Self {
        OperationError::Request(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        OperationError::Decode(msg.into())
    }

    /// Create a close error
    pub fn close(msg: impl Into<String>) -> Self {
        OperationError::Close(msg.into())
    }
}

/// Errors that abort a benchmark run
#[derive(Debug, Error)]
pub enum BenchError {
    /// Configuration rejected before launch
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An operation failed during sampling or the timed loop
    #[error("worker {worker} failed during {phase}: {source}")]
    Operation {
        worker: usize,
        phase: Phase,
        #[source]
        source: OperationError,
    },

    /// A worker could not release its resources
    #[error("worker {worker} failed to close during {phase}: {source}")]
    Close {
        worker: usize,
        phase: Phase,
        #[source]
        source: OperationError,
    },

    /// A worker task panicked or was lost
    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),

    /// A worker stopped early because another worker failed
    #[error("worker {worker} aborted during {phase}")]
    Aborted { worker: usize, phase: Phase },
}

impl BenchError {
    /// Whether this error is only a consequence of another worker's failure
    pub fn is_aborted(&self) -> bool {
        matches!(self, BenchError::Aborted { .. })
    }
}
