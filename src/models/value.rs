//! Typed field values.

use crate::{Error, Result};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field value carried through records and patches.
///
/// The set of variants is closed. On the wire it keeps the JSON-like shape
/// callers already use: `null`, `true`, `42`, `"text"`. Floats, arrays and
/// objects are rejected during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`, or a column whose declared type is not recognized.
    #[default]
    Null,
    /// Boolean, stored as `0`/`1`.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Text, passed through verbatim.
    Text(String),
}

impl Value {
    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the variant name, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<&serde_json::Value> for Value {
    type Error = Error;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(Self::Integer).ok_or_else(|| {
                Error::InvalidInput(format!("number {n} is not a 64-bit integer"))
            }),
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(
                Error::InvalidInput("nested arrays and objects are not field values".to_string()),
            ),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Self::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Value::Integer(14)).unwrap(), "14");
        assert_eq!(
            serde_json::to_string(&Value::from("moby dick")).unwrap(),
            "\"moby dick\""
        );
    }

    #[test]
    fn test_deserialize_from_json() {
        let value: Value = serde_json::from_str("null").unwrap();
        assert_eq!(value, Value::Null);
        let value: Value = serde_json::from_str("-1").unwrap();
        assert_eq!(value, Value::Integer(-1));
        let value: Value = serde_json::from_str("false").unwrap();
        assert_eq!(value, Value::Bool(false));
        let value: Value = serde_json::from_str("\"rented\"").unwrap();
        assert_eq!(value, Value::Text("rented".to_string()));
    }

    #[test]
    fn test_deserialize_rejects_floats_and_nesting() {
        assert!(serde_json::from_str::<Value>("1.5").is_err());
        assert!(serde_json::from_str::<Value>("[1]").is_err());
        assert!(serde_json::from_str::<Value>("{\"a\":1}").is_err());
    }

    #[test]
    fn test_try_from_json_value() {
        let json = serde_json::json!(7);
        assert_eq!(Value::try_from(&json).unwrap(), Value::Integer(7));

        let json = serde_json::json!(2.5);
        assert!(matches!(
            Value::try_from(&json),
            Err(Error::InvalidInput(_))
        ));

        let json = serde_json::json!({"nested": true});
        assert!(Value::try_from(&json).is_err());
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Integer(3).as_i64(), Some(3));
        assert_eq!(Value::Text("a".to_string()).as_i64(), None);
        assert_eq!(Value::Text("a".to_string()).as_str(), Some("a"));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).type_name(), "bool");
    }

    #[test]
    fn test_to_sql() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let (a, b, c, d): (Option<i64>, i64, i64, String) = conn
            .query_row(
                "SELECT ?1, ?2, ?3, ?4",
                rusqlite::params![
                    Value::Null,
                    Value::Bool(true),
                    Value::Integer(42),
                    Value::from("text")
                ],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(a, None);
        assert_eq!(b, 1);
        assert_eq!(c, 42);
        assert_eq!(d, "text");
    }
}
