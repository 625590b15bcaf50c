//! Query parameter mapping
//!
//! Turns an argument tuple into the named variables a query expects. The
//! mapping depends only on the query name, so every provider binds the
//! same values; HTTP sends them as a JSON object, SQL binds them in order.

use std::str::FromStr;

use rand::Rng;
use serde::Serialize;

use crate::config::QuerySpec;
use crate::error::{ConfigError, OperationError};

/// Upper bound (exclusive) of the random suffix used by insert queries
pub const INSERT_SUFFIX_RANGE: u32 = 1_000_000;

/// Families of benchmark queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Any `get_*` query: a single id
    GetById,
    /// Id plus the text appended to the title, `---<id>` when absent
    UpdateMovie,
    InsertUser,
    InsertMovie,
    InsertMoviePlus,
}

impl QueryKind {
    /// Tuple length the query needs
    pub fn arity(self) -> usize {
        match self {
            QueryKind::GetById
            | QueryKind::UpdateMovie
            | QueryKind::InsertUser
            | QueryKind::InsertMoviePlus => 1,
            QueryKind::InsertMovie => 5,
        }
    }
}

impl FromStr for QueryKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update_movie" => Ok(QueryKind::UpdateMovie),
            "insert_user" => Ok(QueryKind::InsertUser),
            "insert_movie" => Ok(QueryKind::InsertMovie),
            "insert_movie_plus" => Ok(QueryKind::InsertMoviePlus),
            name if name.starts_with("get") => Ok(QueryKind::GetById),
            other => Err(ConfigError::UnknownQuery(other.to_string())),
        }
    }
}

/// A bound query variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

/// Ordered, named query variables
pub type Variables = Vec<(&'static str, ParamValue)>;

/// Render variables as a JSON object, e.g. a GraphQL `variables` payload
pub fn to_json_object(vars: &Variables) -> serde_json::Map<String, serde_json::Value> {
    vars.iter()
        .map(|(name, value)| {
            let value = match value {
                ParamValue::Int(n) => serde_json::Value::from(*n),
                ParamValue::Text(s) => serde_json::Value::from(s.as_str()),
            };
            (name.to_string(), value)
        })
        .collect()
}

/// Maps argument tuples to variables for one query
#[derive(Debug, Clone, Copy)]
pub struct QueryParams {
    kind: QueryKind,
    ids_are_ints: bool,
}

impl QueryParams {
    pub fn new(query: &QuerySpec) -> Result<Self, ConfigError> {
        Ok(Self {
            kind: query.name.parse()?,
            ids_are_ints: query.ids_are_ints,
        })
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Build the variables for one call
    ///
    /// Insert queries append a random suffix so repeated calls don't collide.
    pub fn bind<R: Rng + ?Sized>(&self, args: &[String], rng: &mut R) -> Result<Variables, OperationError> {
        if args.len() < self.kind.arity() {
            return Err(OperationError::decode(format!(
                "{:?} needs {} arguments, got {}",
                self.kind,
                self.kind.arity(),
                args.len()
            )));
        }

        let vars = match self.kind {
            QueryKind::GetById => vec![("id", self.id(&args[0])?)],
            QueryKind::UpdateMovie => {
                let title = match args.get(1) {
                    Some(title) => text(title),
                    None => ParamValue::Text(format!("---{}", args[0])),
                };
                vec![("id", self.id(&args[0])?), ("title", title)]
            }
            QueryKind::InsertUser => {
                let (prefix, num) = (&args[0], rng.gen_range(0..INSERT_SUFFIX_RANGE));
                vec![
                    ("name", ParamValue::Text(format!("{prefix}{num}"))),
                    ("image", ParamValue::Text(format!("{prefix}image{num}"))),
                ]
            }
            QueryKind::InsertMovie => {
                let (prefix, num) = (&args[0], rng.gen_range(0..INSERT_SUFFIX_RANGE));
                let mut vars = movie_fields(prefix, num);
                vars.push(("did", self.id(&args[1])?));
                vars.push(("cid0", self.id(&args[2])?));
                vars.push(("cid1", self.id(&args[3])?));
                vars.push(("cid2", self.id(&args[4])?));
                vars
            }
            QueryKind::InsertMoviePlus => {
                let (prefix, num) = (&args[0], rng.gen_range(0..INSERT_SUFFIX_RANGE));
                let mut vars = movie_fields(prefix, num);
                vars.extend([
                    ("dfn", ParamValue::Text(format!("{prefix}Alice"))),
                    ("dln", ParamValue::Text(format!("{prefix}Director"))),
                    ("dimg", ParamValue::Text(format!("{prefix}image{num}.jpeg"))),
                    ("cfn0", ParamValue::Text(format!("{prefix}Billie"))),
                    ("cln0", ParamValue::Text(format!("{prefix}Actor"))),
                    ("cimg0", ParamValue::Text(format!("{prefix}image{}.jpeg", num + 1))),
                    ("cfn1", ParamValue::Text(format!("{prefix}Cameron"))),
                    ("cln1", ParamValue::Text(format!("{prefix}Actor"))),
                    ("cimg1", ParamValue::Text(format!("{prefix}image{}.jpeg", num + 2))),
                ]);
                vars
            }
        };
        Ok(vars)
    }

    fn id(&self, raw: &str) -> Result<ParamValue, OperationError> {
        if !self.ids_are_ints {
            return Ok(text(raw));
        }
        raw.parse::<i64>()
            .map(ParamValue::Int)
            .map_err(|e| OperationError::decode(format!("id {raw:?} is not an integer: {e}")))
    }
}

fn text(raw: &str) -> ParamValue {
    ParamValue::Text(raw.to_string())
}

fn movie_fields(prefix: &str, num: u32) -> Variables {
    vec![
        ("title", ParamValue::Text(format!("{prefix}{num}"))),
        ("image", ParamValue::Text(format!("{prefix}image{num}"))),
        ("description", ParamValue::Text(format!("{prefix}description{num}"))),
        ("year", ParamValue::Int(i64::from(num))),
    ]
}
