//! Structured filter expressions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A two-branch filter expression.
///
/// - `and`: every filter of every field must hold.
/// - `or`: within one field at least one filter must hold; the per-field
///   groups are then conjoined.
///
/// Fields are kept ordered by name so compiled predicates are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    /// Conjoined filters, keyed by field name.
    #[serde(default)]
    pub and: BTreeMap<String, Vec<FieldFilter>>,
    /// Per-field disjoined filters, keyed by field name.
    #[serde(default)]
    pub or: BTreeMap<String, Vec<FieldFilter>>,
}

impl FilterQuery {
    /// Creates an empty filter (matches all rows).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            and: BTreeMap::new(),
            or: BTreeMap::new(),
        }
    }

    /// Appends a filter to the `and` branch of `field`.
    #[must_use]
    pub fn with_and(mut self, field: impl Into<String>, filter: FieldFilter) -> Self {
        self.and.entry(field.into()).or_default().push(filter);
        self
    }

    /// Appends a filter to the `or` group of `field`.
    #[must_use]
    pub fn with_or(mut self, field: impl Into<String>, filter: FieldFilter) -> Self {
        self.or.entry(field.into()).or_default().push(filter);
        self
    }

    /// Returns true if neither branch has any field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty()
    }
}

/// One comparison against a field.
///
/// The operator is kept as its raw token so unknown operators survive
/// deserialization and are rejected by the compiler instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    /// Operator token, see [`Operator`].
    pub operator: String,
    /// Literal operand. Ignored by `isEmpty` and `isNotEmpty`.
    #[serde(default)]
    pub value: String,
    /// Whether the operand is quoted text.
    #[serde(default)]
    pub value_type: ValueType,
}

impl FieldFilter {
    /// Creates a filter from an operator token, operand and operand type.
    #[must_use]
    pub fn new(operator: impl Into<String>, value: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            operator: operator.into(),
            value: value.into(),
            value_type,
        }
    }

    /// Creates a filter for an operator that takes no operand.
    #[must_use]
    pub fn unary(operator: Operator) -> Self {
        Self::new(operator.as_str(), "", ValueType::Other)
    }
}

/// Recognized filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `field = operand`
    Eq,
    /// `field > operand`
    Gt,
    /// `field >= operand`
    Gte,
    /// `field < operand`
    Lt,
    /// `field <= operand`
    Lte,
    /// `field LIKE operand`
    Like,
    /// `NOT field=operand`
    Not,
    /// `field IS NULL`
    IsEmpty,
    /// `field IS NOT NULL`
    IsNotEmpty,
}

impl Operator {
    /// Returns all operators.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Eq,
            Self::Gt,
            Self::Gte,
            Self::Lt,
            Self::Lte,
            Self::Like,
            Self::Not,
            Self::IsEmpty,
            Self::IsNotEmpty,
        ]
    }

    /// Returns the wire token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::Not => "not",
            Self::IsEmpty => "isEmpty",
            Self::IsNotEmpty => "isNotEmpty",
        }
    }

    /// Parses a wire token. Tokens are case-sensitive.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(Self::Eq),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "like" => Some(Self::Like),
            "not" => Some(Self::Not),
            "isEmpty" => Some(Self::IsEmpty),
            "isNotEmpty" => Some(Self::IsNotEmpty),
            _ => None,
        }
    }

    /// Returns false for the null checks, which ignore the operand.
    #[must_use]
    pub const fn takes_operand(&self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a filter operand is rendered.
///
/// Only the exact token `string` selects quoted text; any other token
/// (`int`, `number`, ...) renders the operand verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueType {
    /// Quoted text operand.
    String,
    /// Verbatim operand.
    #[default]
    Other,
}

impl From<String> for ValueType {
    fn from(token: String) -> Self {
        if token == "string" {
            Self::String
        } else {
            Self::Other
        }
    }
}

impl From<ValueType> for String {
    fn from(value_type: ValueType) -> Self {
        match value_type {
            ValueType::String => "string".to_string(),
            ValueType::Other => "other".to_string(),
        }
    }
}
