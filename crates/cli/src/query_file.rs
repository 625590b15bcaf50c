// Query file loading
//
// A query file is a JSON object naming the query, its text, and the pool of
// argument tuples workers draw from. `-` reads the file from stdin.

use std::io::Read;
use std::path::Path;

use imdbench_core::ArgTuple;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryFileError {
    #[error("failed to read query file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid query file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("query file has no arguments (expected `args`, `qargs` or `ids`)")]
    NoArguments,
}

/// Scalar accepted where a string argument is expected
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

fn scalars<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let values: Option<Vec<Scalar>> = Option::deserialize(d)?;
    Ok(values.map(|v| v.into_iter().map(String::from).collect()))
}

fn tuples<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<ArgTuple>>, D::Error> {
    let values: Option<Vec<Vec<Scalar>>> = Option::deserialize(d)?;
    Ok(values.map(|rows| {
        rows.into_iter()
            .map(|row| row.into_iter().map(String::from).collect())
            .collect()
    }))
}

/// Parsed query file
#[derive(Debug, Clone, Deserialize)]
pub struct QueryFile {
    /// Query text sent to the backend
    pub query: String,
    /// Query name, selects the parameter mapping
    #[serde(default)]
    pub queryname: String,
    #[serde(default, alias = "qargs", deserialize_with = "tuples")]
    args: Option<Vec<ArgTuple>>,
    #[serde(default, deserialize_with = "scalars")]
    ids: Option<Vec<String>>,
    /// Second tuple element paired with every id
    #[serde(default)]
    text: Option<String>,
}

impl QueryFile {
    pub fn from_json(raw: &str) -> Result<Self, QueryFileError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load from a path, or from stdin when the path is `-`
    pub fn load(path: &Path) -> Result<Self, QueryFileError> {
        let display = path.display().to_string();
        let io_err = |source: std::io::Error| QueryFileError::Io {
            path: display.clone(),
            source,
        };

        let raw = if path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map_err(io_err)?;
            buf
        } else {
            std::fs::read_to_string(path).map_err(io_err)?
        };
        Self::from_json(&raw)
    }

    /// Argument pool, from `args`/`qargs`, or built from `ids` (+ `text`)
    pub fn into_args(self) -> Result<Vec<ArgTuple>, QueryFileError> {
        if let Some(args) = self.args {
            return Ok(args);
        }
        let ids = self.ids.ok_or(QueryFileError::NoArguments)?;
        Ok(ids
            .into_iter()
            .map(|id| match &self.text {
                Some(text) => vec![id, text.clone()],
                None => vec![id],
            })
            .collect())
    }
}
