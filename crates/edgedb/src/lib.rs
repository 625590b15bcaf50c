// EdgeDB Operation Provider
//
// Runs the benchmark query with `query_single_json` over a dedicated client
// per worker. Query variables are passed as named arguments; ids are UUIDs.
//
// Two result modes are registered:
// - `edgedb_go_json` returns the server's JSON text as the sample
// - `edgedb_go` decodes the JSON and re-encodes it before the call is timed
//   as finished, so the latency includes client-side result handling

mod arguments;
mod provider;


pub use arguments::{named_arguments, query_arguments, NamedArguments};
pub use provider::{
    register_provider, EdgeDbOperation, EdgeDbProvider, ResultMode, EDGEDB_JSON_TAG, EDGEDB_TAG,
};
