// Postgres provider and per-worker operation

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use imdbench_core::config::{BenchConfig, Target};
use imdbench_core::params::{ParamValue, QueryKind, QueryParams, Variables};
use imdbench_core::provider::{
    BoxedOperation, BoxedProvider, Execution, Operation, OperationProvider, ProviderRegistry,
};
use imdbench_core::OperationError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Connection, PgConnection, Postgres, Row};
use tracing::{debug, instrument};

use crate::movie;
use crate::statement::Statement;

/// Tag the provider is registered under
pub const POSTGRES_TAG: &str = "postgres";

/// Alternate tags kept for existing benchmark scripts
pub const POSTGRES_SQLX_TAG: &str = "postgres_sqlx";
pub const POSTGRES_PGX_TAG: &str = "postgres_pgx";
pub const POSTGRES_PQ_TAG: &str = "postgres_pq";

/// Environment variable overriding the connection URL
pub const PG_URL_ENV: &str = "IMDBENCH_PG_URL";

const DEFAULT_USER: &str = "postgres_bench";
const DEFAULT_PASSWORD: &str = "edgedbbenchmark";
const DEFAULT_DATABASE: &str = "postgres_bench";

/// Connection URL for a target using the benchmark database credentials
pub fn connection_url(target: &Target) -> String {
    format!(
        "postgresql://{DEFAULT_USER}:{DEFAULT_PASSWORD}@{}:{}/{DEFAULT_DATABASE}",
        target.host, target.port
    )
}

/// Builds one [`PostgresOperation`] per worker
#[derive(Clone, Default)]
pub struct PostgresProvider {
    url: Option<String>,
}

impl PostgresProvider {
    /// Provider that derives the URL from each run's target
    pub fn new() -> Self {
        Self { url: None }
    }

    /// Provider with a fixed connection URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }

    /// Provider honouring `IMDBENCH_PG_URL` when set
    pub fn from_env() -> Self {
        Self {
            url: std::env::var(PG_URL_ENV).ok().filter(|u| !u.is_empty()),
        }
    }

    /// URL a worker will connect to
    pub fn url_for(&self, target: &Target) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| connection_url(target))
    }
}

impl std::fmt::Debug for PostgresProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresProvider")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl OperationProvider for PostgresProvider {
    fn name(&self) -> &str {
        POSTGRES_TAG
    }

    #[instrument(skip_all, fields(host = %config.target.host, port = config.target.port))]
    async fn make_worker(&self, config: &BenchConfig) -> Result<BoxedOperation, OperationError> {
        let params = QueryParams::new(&config.query)
            .map_err(|e| OperationError::connect(e.to_string()))?;
        let statements = Statement::parse_all(&config.query.text);
        if statements.is_empty() {
            return Err(OperationError::connect("query text holds no SQL statements"));
        }
        if movie::is_movie_insert(params.kind()) {
            movie::check_statements(&statements)?;
        }

        let conn = PgConnection::connect(&self.url_for(&config.target))
            .await
            .map_err(|e| OperationError::connect(e.to_string()))?;
        debug!(statements = statements.len(), "postgres worker connected");

        Ok(Box::new(PostgresOperation {
            conn: Some(conn),
            statements: statements.into(),
            params,
            rng: StdRng::from_entropy(),
        }))
    }
}

/// One worker's dedicated connection
pub struct PostgresOperation {
    conn: Option<PgConnection>,
    statements: Arc<[Statement]>,
    params: QueryParams,
    rng: StdRng,
}

impl std::fmt::Debug for PostgresOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresOperation")
            .field("statements", &self.statements.len())
            .field("query_kind", &self.params.kind())
            .field("closed", &self.conn.is_none())
            .finish()
    }
}

#[async_trait]
impl Operation for PostgresOperation {
    async fn exec(&mut self, args: &[String]) -> Result<Execution, OperationError> {
        let vars = self.params.bind(args, &mut self.rng)?;
        let kind = self.params.kind();
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| OperationError::request("operation already closed"))?;

        let start = Instant::now();
        let mut tx = conn.begin().await.map_err(request_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(request_error)?;

        let results = if movie::is_movie_insert(kind) {
            insert_movie(&mut tx, &self.statements, kind, &vars).await?
        } else {
            let values: Vec<ParamValue> = vars.into_iter().map(|(_, value)| value).collect();
            let mut results = Vec::with_capacity(self.statements.len());
            for statement in self.statements.iter() {
                if let Some(rows) = run_statement(&mut tx, statement, &values).await? {
                    results.push(rows);
                }
            }
            results
        };

        tx.commit().await.map_err(request_error)?;
        let latency = start.elapsed();

        Ok(Execution::new(latency, format!("[{}]", results.join(","))))
    }

    async fn close(&mut self) -> Result<(), OperationError> {
        match self.conn.take() {
            Some(conn) => conn
                .close()
                .await
                .map_err(|e| OperationError::close(e.to_string())),
            None => Ok(()),
        }
    }
}

fn request_error(err: sqlx::Error) -> OperationError {
    OperationError::request(err.to_string())
}

fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &'q [ParamValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = match value {
            ParamValue::Int(n) => query.bind(*n),
            ParamValue::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

/// Run one statement with its leading `$n` values; rows come back as JSON text
async fn run_statement(
    conn: &mut PgConnection,
    statement: &Statement,
    values: &[ParamValue],
) -> Result<Option<String>, OperationError> {
    let values = values.get(..statement.params).ok_or_else(|| {
        OperationError::decode(format!(
            "statement uses ${} but the query only has {} values",
            statement.params,
            values.len()
        ))
    })?;
    let query = bind_values(sqlx::query(&statement.sql), values);

    if statement.returns_rows {
        let row = query.fetch_one(&mut *conn).await.map_err(request_error)?;
        let rows: String = row
            .try_get(0)
            .map_err(|e| OperationError::decode(e.to_string()))?;
        Ok(Some(rows))
    } else {
        query.execute(&mut *conn).await.map_err(request_error)?;
        Ok(None)
    }
}

/// Insert a movie, then link its director and cast by the returned ids
async fn insert_movie(
    conn: &mut PgConnection,
    statements: &[Statement],
    kind: QueryKind,
    vars: &Variables,
) -> Result<Vec<String>, OperationError> {
    let [movie_stmt, people_stmt, directors_stmt, actors_stmt] = statements else {
        return Err(OperationError::decode("movie insert needs four statements"));
    };
    let no_rows = || OperationError::decode("statement returned no rows");

    let movie_rows = run_statement(conn, movie_stmt, &movie::movie_values(vars))
        .await?
        .ok_or_else(no_rows)?;
    let people_rows = run_statement(conn, people_stmt, &movie::people_values(vars))
        .await?
        .ok_or_else(no_rows)?;

    let links = movie::links(kind, vars, &movie_rows, &people_rows)?;
    run_statement(conn, directors_stmt, &links.directors).await?;
    run_statement(conn, actors_stmt, &links.actors).await?;

    Ok(vec![movie_rows, people_rows])
}

/// Register the Postgres provider under all of its tags
///
/// Reads `IMDBENCH_PG_URL` once per provider construction.
pub fn register_provider(registry: &mut ProviderRegistry) {
    for tag in [POSTGRES_TAG, POSTGRES_SQLX_TAG, POSTGRES_PGX_TAG, POSTGRES_PQ_TAG] {
        registry.register(tag, || {
            Arc::new(PostgresProvider::from_env()) as BoxedProvider
        });
    }
}
