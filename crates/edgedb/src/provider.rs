// EdgeDB provider and per-worker operation

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use edgedb_tokio::Client;
use imdbench_core::config::{BenchConfig, QuerySpec};
use imdbench_core::params::QueryParams;
use imdbench_core::provider::{
    BoxedOperation, BoxedProvider, Execution, Operation, OperationProvider, ProviderRegistry,
};
use imdbench_core::OperationError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, instrument};

use crate::arguments::{named_arguments, query_arguments};

/// Tag for results decoded and re-encoded by the client
pub const EDGEDB_TAG: &str = "edgedb_go";

/// Tag for raw JSON results
pub const EDGEDB_JSON_TAG: &str = "edgedb_go_json";

/// How a worker turns the query result into its sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    /// Decode the JSON result and encode it again
    Repack,
    /// Keep the server's JSON text
    Json,
}

/// Builds one [`EdgeDbOperation`] per worker
#[derive(Debug, Clone)]
pub struct EdgeDbProvider {
    mode: ResultMode,
}

impl EdgeDbProvider {
    pub fn new(mode: ResultMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ResultMode {
        self.mode
    }
}

#[async_trait]
impl OperationProvider for EdgeDbProvider {
    fn name(&self) -> &str {
        match self.mode {
            ResultMode::Repack => EDGEDB_TAG,
            ResultMode::Json => EDGEDB_JSON_TAG,
        }
    }

    #[instrument(skip_all, fields(mode = ?self.mode, query = %config.query.name))]
    async fn make_worker(&self, config: &BenchConfig) -> Result<BoxedOperation, OperationError> {
        // Ids are UUIDs here, whatever the run says about integer ids
        let params = QueryParams::new(&QuerySpec {
            ids_are_ints: false,
            ..config.query.clone()
        })
        .map_err(|e| OperationError::connect(e.to_string()))?;
        if config.query.text.trim().is_empty() {
            return Err(OperationError::connect("query text is empty"));
        }

        let client = edgedb_tokio::create_client()
            .await
            .map_err(|e| OperationError::connect(e.to_string()))?;
        debug!("edgedb worker connected");

        Ok(Box::new(EdgeDbOperation {
            client: Some(client),
            query: config.query.text.clone(),
            params,
            mode: self.mode,
            rng: StdRng::from_entropy(),
        }))
    }
}

/// One worker's EdgeDB client
pub struct EdgeDbOperation {
    client: Option<Client>,
    query: String,
    params: QueryParams,
    mode: ResultMode,
    rng: StdRng,
}

impl std::fmt::Debug for EdgeDbOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeDbOperation")
            .field("mode", &self.mode)
            .field("query_kind", &self.params.kind())
            .field("closed", &self.client.is_none())
            .finish()
    }
}

#[async_trait]
impl Operation for EdgeDbOperation {
    async fn exec(&mut self, args: &[String]) -> Result<Execution, OperationError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| OperationError::request("operation already closed"))?;
        let vars = self.params.bind(args, &mut self.rng)?;
        let arguments = named_arguments(query_arguments(self.params.kind(), vars)?);

        let start = Instant::now();
        let json = client
            .query_single_json(&self.query, &arguments)
            .await
            .map_err(|e| OperationError::request(e.to_string()))?
            .ok_or_else(|| OperationError::request("query returned no data"))?;
        let raw: &str = &json;

        let sample = match self.mode {
            ResultMode::Json => raw.to_owned(),
            ResultMode::Repack => {
                let value: serde_json::Value = serde_json::from_str(raw)
                    .map_err(|e| OperationError::decode(format!("bad result JSON: {e}")))?;
                serde_json::to_string(&value).map_err(|e| OperationError::decode(e.to_string()))?
            }
        };
        let latency = start.elapsed();

        Ok(Execution::new(latency, sample))
    }

    async fn close(&mut self) -> Result<(), OperationError> {
        // Dropping the client closes its connections
        self.client.take();
        Ok(())
    }
}

/// Register both EdgeDB result modes
pub fn register_provider(registry: &mut ProviderRegistry) {
    registry.register(EDGEDB_TAG, || {
        Arc::new(EdgeDbProvider::new(ResultMode::Repack)) as BoxedProvider
    });
    registry.register(EDGEDB_JSON_TAG, || {
        Arc::new(EdgeDbProvider::new(ResultMode::Json)) as BoxedProvider
    });
}
