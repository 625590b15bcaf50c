// HTTP Operation Provider
//
// Sends the benchmark query as a JSON POST body, `{"query": ..., "variables": {...}}`,
// to `http://host:port/path`. Suits GraphQL endpoints and plain JSON APIs
// that accept the same envelope.

mod provider;

#[cfg(test)]
mod tests;

pub use provider::{register_provider, HttpOperation, HttpProvider, HTTP_TAG};
