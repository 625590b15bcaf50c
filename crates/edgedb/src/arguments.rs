//! Named query arguments
//!
//! EdgeDB queries declare typed parameters (`<uuid>$id`, `<str>$name`), so
//! the generic variables are converted: id variables become UUIDs, `year`
//! an `int64`, everything else a `str`. `update_movie` only takes `$id`,
//! and `insert_user` images use the `image_<name>` form.

use std::collections::HashMap;

use edgedb_protocol::value::Value;
use edgedb_protocol::value_opt::ValueOpt;
use imdbench_core::params::{ParamValue, QueryKind, Variables};
use imdbench_core::OperationError;
use uuid::Uuid;

/// Arguments in the form the client encodes as named parameters
pub type NamedArguments = HashMap<&'static str, ValueOpt>;

const UUID_VARIABLES: [&str; 5] = ["id", "did", "cid0", "cid1", "cid2"];

/// Convert one call's variables into typed EdgeDB values
pub fn query_arguments(
    kind: QueryKind,
    vars: Variables,
) -> Result<Vec<(&'static str, Value)>, OperationError> {
    let mut arguments = Vec::with_capacity(vars.len());
    let mut user_name = None;

    for (name, value) in vars {
        if kind == QueryKind::UpdateMovie && name == "title" {
            continue;
        }
        let value = match (name, value) {
            (name, ParamValue::Text(raw)) if UUID_VARIABLES.contains(&name) => Uuid::parse_str(&raw)
                .map(Value::Uuid)
                .map_err(|e| OperationError::decode(format!("{name} {raw:?} is not a UUID: {e}")))?,
            (name, ParamValue::Int(n)) if UUID_VARIABLES.contains(&name) => {
                return Err(OperationError::decode(format!(
                    "{name} {n} is not a UUID; ids must not be parsed as integers"
                )))
            }
            ("name", ParamValue::Text(raw)) if kind == QueryKind::InsertUser => {
                user_name = Some(raw.clone());
                Value::Str(raw)
            }
            (_, ParamValue::Int(n)) => Value::Int64(n),
            (_, ParamValue::Text(raw)) => Value::Str(raw),
        };
        arguments.push((name, value));
    }

    if let Some(user_name) = user_name {
        for (name, value) in arguments.iter_mut() {
            if *name == "image" {
                *value = Value::Str(format!("image_{user_name}"));
            }
        }
    }
    Ok(arguments)
}

/// Collect typed values into named arguments
pub fn named_arguments(arguments: Vec<(&'static str, Value)>) -> NamedArguments {
    arguments
        .into_iter()
        .map(|(name, value)| (name, ValueOpt::from(value)))
        .collect()
}
