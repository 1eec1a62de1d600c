//! Row decoding driven by declared column types.
//!
//! Raw column bytes are turned into [`Value`]s by looking at the declared
//! type name the store reports for each column, never at the bytes alone.
//!
//! ## Rules
//!
//! | Declared type contains (any case) | Result |
//! |---|---|
//! | `INT` | base-10 `i64`; `0` if the bytes do not parse |
//! | `VARCHAR`, `TEXT`, `TIMESTAMP` | text, verbatim |
//! | anything else | `Null` |
//!
//! SQL `NULL` always decodes to `Null`.
//!
//! Integer decoding is lossy on purpose: a value that does not parse (a
//! real stored in an integer column, stray text) becomes `0` and is only
//! logged at `debug` level. Callers that need strictness should check the
//! declared schema instead.

use crate::models::{Record, Value};
use crate::storage::RowSet;
use crate::{Error, Result};

/// Decoding class of a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Integer-like: `INT`, `INTEGER`, `BIGINT`, `TINYINT`, ...
    Integer,
    /// Text-like: `VARCHAR(n)`, `TEXT`, `TIMESTAMP`.
    Text,
    /// Anything else, including no declared type.
    Unknown,
}

impl ColumnKind {
    /// Classifies a declared type name by case-insensitive substring.
    #[must_use]
    pub fn classify(declared_type: &str) -> Self {
        let upper = declared_type.to_ascii_uppercase();
        if upper.contains("INT") {
            Self::Integer
        } else if ["VARCHAR", "TEXT", "TIMESTAMP"]
            .iter()
            .any(|t| upper.contains(t))
        {
            Self::Text
        } else {
            Self::Unknown
        }
    }
}

/// Decodes one raw column value.
///
/// Pure: the same bytes and type name always give the same value.
#[must_use]
pub fn decode(raw: Option<&[u8]>, declared_type: &str) -> Value {
    let Some(bytes) = raw else {
        return Value::Null;
    };
    match ColumnKind::classify(declared_type) {
        ColumnKind::Integer => Value::Integer(parse_integer(bytes)),
        ColumnKind::Text => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ColumnKind::Unknown => Value::Null,
    }
}

fn parse_integer(bytes: &[u8]) -> i64 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or_else(|| {
            tracing::debug!(
                raw = %String::from_utf8_lossy(bytes),
                "integer column did not parse, decoding as 0"
            );
            0
        })
}

/// Decodes one row by zipping it with its column names and types.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the three sequences differ in length.
pub fn decode_row<N, T>(
    raw: &[Option<Vec<u8>>],
    column_names: &[N],
    column_types: &[T],
) -> Result<Record>
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    if raw.len() != column_names.len() || raw.len() != column_types.len() {
        return Err(Error::Decode(format!(
            "row has {} values for {} column names and {} column types",
            raw.len(),
            column_names.len(),
            column_types.len()
        )));
    }

    Ok(raw
        .iter()
        .zip(column_names)
        .zip(column_types)
        .map(|((bytes, name), declared)| {
            (
                name.as_ref().to_string(),
                decode(bytes.as_deref(), declared.as_ref()),
            )
        })
        .collect())
}

/// Decodes every row of a result set.
///
/// # Errors
///
/// Returns [`Error::Decode`] on the first misaligned row.
pub fn decode_rows(rows: &RowSet) -> Result<Vec<Record>> {
    rows.rows
        .iter()
        .map(|raw| decode_row(raw, &rows.column_names, &rows.column_types))
        .collect()
}
