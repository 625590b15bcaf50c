//! Statement preparation
//!
//! Each statement of the query text is wrapped so that it yields its rows
//! as a single JSON text value:
//!
//! ```sql
//! WITH q AS (<statement>) SELECT coalesce(json_agg(q), '[]')::text FROM q
//! ```
//!
//! Data-modifying statements without a `RETURNING` clause produce no rows
//! and run as written.

/// A wrapped statement ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Wrapped SQL, or the statement itself when it yields no rows
    pub sql: String,
    /// Number of values the statement binds (`$1..$n`)
    pub params: usize,
    /// Whether the statement yields rows
    pub returns_rows: bool,
}

impl Statement {
    pub fn new(raw: &str) -> Self {
        let returns_rows = returns_rows(raw);
        Self {
            sql: if returns_rows {
                wrap_statement(raw)
            } else {
                raw.trim().to_string()
            },
            params: max_placeholder(raw),
            returns_rows,
        }
    }

    /// Prepare every statement in a `;`-separated query
    pub fn parse_all(query: &str) -> Vec<Statement> {
        split_statements(query).into_iter().map(Statement::new).collect()
    }
}

/// Split query text on `;`, dropping blank statements
pub fn split_statements(query: &str) -> Vec<&str> {
    query
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Wrap a statement so it returns its rows as JSON text
pub fn wrap_statement(stmt: &str) -> String {
    format!(
        "WITH q AS ({}) SELECT coalesce(json_agg(q), '[]')::text FROM q",
        stmt.trim()
    )
}

/// Whether a statement yields rows: queries, and writes with `RETURNING`
pub fn returns_rows(stmt: &str) -> bool {
    let upper = stmt.trim_start().to_ascii_uppercase();
    ["SELECT", "WITH", "VALUES", "TABLE"]
        .iter()
        .any(|keyword| upper.starts_with(keyword))
        || upper.contains("RETURNING")
}

/// Highest `$n` placeholder in a statement, ignoring quoted literals
pub fn max_placeholder(stmt: &str) -> usize {
    let bytes = stmt.as_bytes();
    let mut max = 0;
    let mut in_literal = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_literal = !in_literal,
            b'$' if !in_literal => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                if digits > 0 {
                    let n = stmt[i + 1..i + 1 + digits].parse::<usize>().unwrap_or(0);
                    max = max.max(n);
                    i += digits;
                }
            }
            _ => {}
        }
        i += 1;
    }
    max
}
