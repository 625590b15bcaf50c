// Benchmark configuration
//
// Built once from external input and never mutated afterwards. Workers get
// it through an Arc; there are no process-wide settings.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::params::QueryKind;

/// One operation's parameters, e.g. an entity id or an id plus free text
pub type ArgTuple = Vec<String>;

/// Where the operation provider should connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
    /// Request path for HTTP backends, e.g. "/graphql"
    pub path: String,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            path: String::new(),
        }
    }
}

/// The query every worker repeatedly issues
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Query name, selects the parameter mapping (e.g. "get_movie")
    pub name: String,
    /// Query text sent to the backend
    pub text: String,
    /// Whether ids should be sent as integers rather than strings
    pub ids_are_ints: bool,
}

/// Immutable benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of parallel workers
    pub concurrency: usize,
    /// Measured-run length; zero skips the timed loop
    pub duration: Duration,
    /// Upper latency bound used to size and clamp the histogram
    pub timeout: Duration,
    /// Warm-up run length (results discarded)
    pub warmup: Duration,
    /// Maximum response samples retained per phase
    pub sample_count: usize,
    /// Operation provider tag, e.g. "http" or "postgres"
    pub benchmark: String,
    pub target: Target,
    pub query: QuerySpec,
    /// Shared, read-only argument pool
    pub args: Arc<[ArgTuple]>,
    /// Fixed seed for reproducible sampling; None draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            duration: Duration::from_secs(30),
            timeout: Duration::from_secs(2),
            warmup: Duration::from_secs(5),
            sample_count: 10,
            benchmark: "http".to_string(),
            target: Target::default(),
            query: QuerySpec::default(),
            args: Arc::from(Vec::new()),
            seed: None,
        }
    }
}

impl BenchConfig {
    /// Create a configuration over the given argument pool
    pub fn new(args: Vec<ArgTuple>) -> Self {
        Self {
            args: Arc::from(args),
            ..Default::default()
        }
    }

    /// Set the number of workers
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the measured-run duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the histogram timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the warm-up duration
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Set the number of retained samples
    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set the provider tag
    pub fn with_benchmark(mut self, benchmark: impl Into<String>) -> Self {
        self.benchmark = benchmark.into();
        self
    }

    /// Set the connection target
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Set the query
    pub fn with_query(mut self, query: QuerySpec) -> Self {
        self.query = query;
        self
    }

    /// Set a fixed RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject configurations that can't produce a meaningful run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.args.is_empty() {
            return Err(ConfigError::EmptyInputs);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        // An empty name means the provider doesn't map parameters
        if !self.query.name.is_empty() {
            self.query.name.parse::<QueryKind>()?;
        }
        Ok(())
    }
}
