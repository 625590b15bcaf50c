//! Movie inserts
//!
//! `insert_movie` and `insert_movie_plus` run four statements in order:
//! insert the movie, fetch (or insert) its people, link the director, link
//! the cast. The two link statements bind ids returned by the first two, so
//! their values are built here from those rows rather than from the
//! argument tuple.

use imdbench_core::params::{ParamValue, QueryKind, Variables};
use imdbench_core::OperationError;
use serde_json::Value;

use crate::statement::Statement;

/// Statements a movie insert query must have
pub const MOVIE_INSERT_STATEMENTS: usize = 4;

/// Whether a query kind runs as a movie insert
pub fn is_movie_insert(kind: QueryKind) -> bool {
    matches!(kind, QueryKind::InsertMovie | QueryKind::InsertMoviePlus)
}

/// Reject movie insert queries whose statements can't be chained
pub fn check_statements(statements: &[Statement]) -> Result<(), OperationError> {
    if statements.len() != MOVIE_INSERT_STATEMENTS {
        return Err(OperationError::connect(format!(
            "movie inserts need {MOVIE_INSERT_STATEMENTS} statements \
             (movie, people, directors, actors), got {}",
            statements.len()
        )));
    }
    if !(statements[0].returns_rows && statements[1].returns_rows) {
        return Err(OperationError::connect(
            "the movie and people statements must return rows",
        ));
    }
    Ok(())
}

/// Values for the movie statement: title, image, description, year
pub fn movie_values(vars: &Variables) -> Vec<ParamValue> {
    vars.iter().take(4).map(|(_, value)| value.clone()).collect()
}

/// Values for the people statement: the existing people's ids, or the new
/// people's names and images
pub fn people_values(vars: &Variables) -> Vec<ParamValue> {
    vars.iter().skip(4).map(|(_, value)| value.clone()).collect()
}

/// Values for the two link statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    /// Director id, movie id
    pub directors: Vec<ParamValue>,
    /// Cast ids, then the movie id
    pub actors: Vec<ParamValue>,
}

/// Build the link values from the movie and people rows
///
/// `insert_movie` picks the director by the `did` argument and casts three
/// people; `insert_movie_plus` picks the person whose name ends in
/// `Director` and casts two.
pub fn links(
    kind: QueryKind,
    vars: &Variables,
    movie_rows: &str,
    people_rows: &str,
) -> Result<Links, OperationError> {
    let cast_size = match kind {
        QueryKind::InsertMovie => 3,
        QueryKind::InsertMoviePlus => 2,
        other => {
            return Err(OperationError::decode(format!(
                "{other:?} is not a movie insert"
            )))
        }
    };
    let director_key = vars
        .iter()
        .find(|(name, _)| *name == "did")
        .map(|(_, value)| key(value));

    let movie_id = match parse_rows(movie_rows)?.first() {
        Some(row) => row_id(row)?,
        None => return Err(OperationError::decode("movie insert returned no row")),
    };

    let mut director = None;
    let mut cast = Vec::new();
    for person in parse_rows(people_rows)? {
        let id = row_id(&person)?;
        let is_director = match &director_key {
            Some(did) => key(&id) == *did,
            None => person
                .get("full_name")
                .and_then(Value::as_str)
                .is_some_and(|name| name.ends_with("Director")),
        };
        if is_director && director.is_none() {
            director = Some(id);
        } else {
            cast.push(id);
        }
    }

    let director =
        director.ok_or_else(|| OperationError::decode("no director among the movie's people"))?;
    if cast.len() < cast_size {
        return Err(OperationError::decode(format!(
            "expected {cast_size} cast members, got {}",
            cast.len()
        )));
    }
    cast.truncate(cast_size);
    cast.push(movie_id.clone());

    Ok(Links {
        directors: vec![director, movie_id],
        actors: cast,
    })
}

fn parse_rows(rows: &str) -> Result<Vec<Value>, OperationError> {
    serde_json::from_str(rows).map_err(|e| OperationError::decode(format!("bad row set: {e}")))
}

fn row_id(row: &Value) -> Result<ParamValue, OperationError> {
    match row.get("id") {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(ParamValue::Int)
            .ok_or_else(|| OperationError::decode(format!("id {n} is not an integer"))),
        Some(Value::String(s)) => Ok(ParamValue::Text(s.clone())),
        _ => Err(OperationError::decode(format!("row has no id: {row}"))),
    }
}

/// Ids compare by text so `"3"` and `3` match
fn key(value: &ParamValue) -> String {
    match value {
        ParamValue::Int(n) => n.to_string(),
        ParamValue::Text(s) => s.clone(),
    }
}
