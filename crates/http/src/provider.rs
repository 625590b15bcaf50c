// HTTP provider and per-worker operation

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use imdbench_core::config::{BenchConfig, Target};
use imdbench_core::params::{to_json_object, QueryParams};
use imdbench_core::provider::{
    BoxedOperation, BoxedProvider, Execution, Operation, OperationProvider, ProviderRegistry,
};
use imdbench_core::OperationError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

/// Tag the provider is registered under
pub const HTTP_TAG: &str = "http";

/// Request envelope
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    variables: serde_json::Map<String, serde_json::Value>,
}

/// Builds one [`HttpOperation`] per worker
#[derive(Debug, Clone, Default)]
pub struct HttpProvider;

impl HttpProvider {
    pub fn new() -> Self {
        Self
    }

    /// Endpoint URL for a target
    pub fn endpoint(target: &Target) -> String {
        let path = target.path.trim();
        if path.is_empty() || path.starts_with('/') {
            format!("http://{}:{}{}", target.host, target.port, path)
        } else {
            format!("http://{}:{}/{}", target.host, target.port, path)
        }
    }
}

#[async_trait]
impl OperationProvider for HttpProvider {
    fn name(&self) -> &str {
        HTTP_TAG
    }

    async fn make_worker(&self, config: &BenchConfig) -> Result<BoxedOperation, OperationError> {
        let params = QueryParams::new(&config.query)
            .map_err(|e| OperationError::connect(e.to_string()))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| OperationError::connect(format!("failed to build HTTP client: {e}")))?;

        let url = Self::endpoint(&config.target);
        debug!(url = %url, query = %config.query.name, "http worker ready");

        Ok(Box::new(HttpOperation {
            client: Some(client),
            url,
            query: config.query.text.clone(),
            params,
            rng: StdRng::from_entropy(),
        }))
    }
}

/// One worker's HTTP client
///
/// Holds its own connection pool; nothing is shared with other workers.
pub struct HttpOperation {
    client: Option<reqwest::Client>,
    url: String,
    query: String,
    params: QueryParams,
    rng: StdRng,
}

impl HttpOperation {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for HttpOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOperation")
            .field("url", &self.url)
            .field("query_kind", &self.params.kind())
            .field("closed", &self.client.is_none())
            .finish()
    }
}

#[async_trait]
impl Operation for HttpOperation {
    async fn exec(&mut self, args: &[String]) -> Result<Execution, OperationError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| OperationError::request("operation already closed"))?;
        let vars = self.params.bind(args, &mut self.rng)?;
        let body = QueryRequest {
            query: &self.query,
            variables: to_json_object(&vars),
        };

        let start = Instant::now();
        let response = client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OperationError::request(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OperationError::decode(format!("failed to read response body: {e}")))?;
        let latency = start.elapsed();

        if !status.is_success() {
            return Err(OperationError::request(format!("HTTP {}: {}", status.as_u16(), text)));
        }
        Ok(Execution::new(latency, text))
    }

    async fn close(&mut self) -> Result<(), OperationError> {
        // Dropping the client releases its pooled connections
        self.client.take();
        Ok(())
    }
}

/// Register the HTTP provider with the provider registry
///
/// # Example
///
/// ```ignore
/// use imdbench_core::ProviderRegistry;
///
/// let mut registry = ProviderRegistry::new();
/// imdbench_http::register_provider(&mut registry);
/// ```
pub fn register_provider(registry: &mut ProviderRegistry) {
    registry.register(HTTP_TAG, || Arc::new(HttpProvider::new()) as BoxedProvider);
}
