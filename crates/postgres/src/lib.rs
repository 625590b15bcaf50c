// Postgres Operation Provider
//
// Runs the benchmark query over a dedicated sqlx connection per worker.
// The query text may carry several `;`-separated statements; all of them
// run inside one repeatable-read transaction and their rows come back as
// a JSON array, one element per row-returning statement. Movie inserts
// chain their statements, binding ids returned by earlier ones.

mod movie;
mod provider;
mod statement;


pub use movie::{links, Links, MOVIE_INSERT_STATEMENTS};
pub use provider::{
    connection_url, register_provider, PostgresOperation, PostgresProvider, PG_URL_ENV,
    POSTGRES_PGX_TAG, POSTGRES_PQ_TAG, POSTGRES_SQLX_TAG, POSTGRES_TAG,
};
pub use statement::{max_placeholder, returns_rows, split_statements, wrap_statement, Statement};
