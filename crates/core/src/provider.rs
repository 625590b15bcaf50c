//! Operation providers
//!
//! The engine never speaks a wire protocol itself. A provider turns the
//! configuration into a per-worker [`Operation`]: something that executes
//! one call and reports its latency plus a textual sample, and that can be
//! closed exactly once when the worker is done.
//!
//! Providers are selected by tag through a [`ProviderRegistry`]; each
//! backend crate exposes a `register_provider` function.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::BenchConfig;
use crate::error::{ConfigError, OperationError};

/// Outcome of one successful call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Wall-clock time of the call as measured by the provider
    pub latency: Duration,
    /// Response body (or a serialized rendering of it)
    pub sample: String,
}

impl Execution {
    pub fn new(latency: Duration, sample: impl Into<String>) -> Self {
        Self {
            latency,
            sample: sample.into(),
        }
    }
}

/// One worker's private handle on the backend
///
/// Never shared between workers; any connection state it holds belongs to
/// the worker that created it.
#[async_trait]
pub trait Operation: Send {
    /// Execute one call with the given argument tuple
    async fn exec(&mut self, args: &[String]) -> Result<Execution, OperationError>;

    /// Release the worker's resources
    async fn close(&mut self) -> Result<(), OperationError>;
}

/// Boxed operation handed to a worker
pub type BoxedOperation = Box<dyn Operation>;

/// Builds a fresh operation for each worker
#[async_trait]
pub trait OperationProvider: Send + Sync {
    /// Tag this provider is registered under
    fn name(&self) -> &str;

    /// Create an independent operation for one worker
    async fn make_worker(&self, config: &BenchConfig) -> Result<BoxedOperation, OperationError>;
}

/// Shared provider handle
pub type BoxedProvider = Arc<dyn OperationProvider>;

type ProviderFactory = Arc<dyn Fn() -> BoxedProvider + Send + Sync>;

/// Maps benchmark tags to provider constructors
///
/// # Example
///
/// ```ignore
/// let mut registry = ProviderRegistry::new();
/// imdbench_http::register_provider(&mut registry);
/// let provider = registry.create("http")?;
/// ```
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a provider factory under a tag
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn() -> BoxedProvider + Send + Sync + 'static,
    {
        self.factories.insert(tag.into(), Arc::new(factory));
    }

    /// Create the provider registered under `tag`
    pub fn create(&self, tag: &str) -> Result<BoxedProvider, ConfigError> {
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| ConfigError::UnknownProvider(tag.to_string()))?;
        Ok(factory())
    }

    /// Check if a provider is registered for a tag
    pub fn has_provider(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<_> = self.factories.keys().cloned().collect();
        tags.sort();
        tags
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Operation for Echo {
        async fn exec(&mut self, args: &[String]) -> Result<Execution, OperationError> {
            Ok(Execution::new(Duration::from_micros(10), args.join(",")))
        }

        async fn close(&mut self) -> Result<(), OperationError> {
            Ok(())
        }
    }

    struct EchoProvider;

    #[async_trait]
    impl OperationProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn make_worker(&self, _config: &BenchConfig) -> Result<BoxedOperation, OperationError> {
            Ok(Box::new(Echo))
        }
    }

    #[tokio::test]
    async fn test_registry_creates_registered_provider() {
        let mut registry = ProviderRegistry::new();
        assert!(!registry.has_provider("echo"));

        registry.register("echo", || Arc::new(EchoProvider) as BoxedProvider);
        assert!(registry.has_provider("echo"));
        assert_eq!(registry.tags(), vec!["echo"]);

        let provider = registry.create("echo").unwrap();
        assert_eq!(provider.name(), "echo");

        let mut op = provider.make_worker(&BenchConfig::default()).await.unwrap();
        let exec = op
            .exec(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(exec.sample, "a,b");
        assert!(op.close().await.is_ok());
    }

    #[test]
    fn test_unknown_tag_is_config_error() {
        let registry = ProviderRegistry::new();
        assert_eq!(
            registry.create("mysql").err(),
            Some(ConfigError::UnknownProvider("mysql".to_string()))
        );
    }
}
