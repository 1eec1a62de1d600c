//! Filter expression compiler.
//!
//! Turns a [`FilterQuery`] into a SQL predicate. The predicate never carries
//! a clause keyword; callers prefix `WHERE` themselves when it is non-empty.
//!
//! # Shape
//!
//! ```text
//! and only:  a = 1 AND b > 2
//! or only:   (c LIKE 'x%' OR c LIKE '%y') AND (d = 3)
//! both:      (a = 1 AND b > 2) AND (c LIKE 'x%' OR c LIKE '%y')
//! ```
//!
//! The `and` block is parenthesized only when it is combined with an `or`
//! block, while each `or` group is always parenthesized. Existing consumers
//! depend on this exact text.
//!
//! # Operand binding
//!
//! [`compile`] renders non-`string` operands verbatim, so `9.5` or `NULL`
//! reach the SQL text as written. [`compile_bound`] binds them instead: an
//! operand that parses as an `i64` binds as an integer and anything else
//! (`9.5`, `NULL`, `2024-01-01`) binds as text. Against a column with
//! numeric affinity `SQLite` converts the text back to a number, but a
//! column with no affinity (a view expression, for example) compares it as
//! text, and `= NULL` never matches. Use `isEmpty` for null checks.

use super::identifier::is_identifier;
use crate::models::{FieldFilter, FilterQuery, Operator, Value, ValueType};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while compiling a filter.
///
/// Compilation aborts on the first error; no partial predicate is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The operator token is not one of the recognized operators.
    #[error("invalid operator '{operator}' for field '{field}'")]
    InvalidOperator {
        /// Field the filter applies to.
        field: String,
        /// The rejected token.
        operator: String,
    },

    /// A field was listed with no filters.
    #[error("field '{0}' has no filters")]
    EmptyFieldFilters(String),

    /// A field name is not a plain SQL identifier.
    #[error("invalid field name '{0}'")]
    InvalidFieldName(String),
}

/// A predicate with numbered placeholders and the values to bind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoundPredicate {
    /// Predicate text using `?N` placeholders. Empty when the filter is empty.
    pub sql: String,
    /// Values in placeholder order.
    pub params: Vec<Value>,
    /// Next free placeholder number.
    pub next_param: usize,
}

impl BoundPredicate {
    /// Returns true if the filter compiled to no predicate at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Compiles a filter into a predicate with inline literals.
///
/// `string` operands are single-quoted (embedded quotes doubled); other
/// operands are rendered verbatim. Intended for display and for consumers of
/// the textual form; the store executes [`compile_bound`] output instead.
///
/// # Errors
///
/// Returns a [`CompileError`] for unknown operators, empty field filter
/// lists and invalid field names.
///
/// # Examples
///
/// ```
/// use recordkit::{FieldFilter, FilterQuery, ValueType, compile};
///
/// let filter = FilterQuery::new()
///     .with_and("stock", FieldFilter::new("lt", "10", ValueType::Other))
///     .with_or("title", FieldFilter::new("like", "bartleby%", ValueType::String));
///
/// assert_eq!(
///     compile(&filter).unwrap(),
///     "(stock < 10) AND (title LIKE 'bartleby%')"
/// );
/// ```
pub fn compile(filter: &FilterQuery) -> Result<String, CompileError> {
    assemble(filter, &mut InlineOperands)
}

/// Compiles a filter into a predicate with numbered placeholders.
///
/// Placeholders start at `?{start_param}`. `string` operands bind as text;
/// other operands bind as integers when they parse as one, otherwise as text
/// (see the module docs for how that differs from [`compile`]).
///
/// # Errors
///
/// Same as [`compile`].
///
/// # Examples
///
/// ```
/// use recordkit::{FieldFilter, FilterQuery, Value, ValueType, compile_bound};
///
/// let filter = FilterQuery::new()
///     .with_and("stock", FieldFilter::new("lt", "10", ValueType::Other));
///
/// let bound = compile_bound(&filter, 1).unwrap();
/// assert_eq!(bound.sql, "stock < ?1");
/// assert_eq!(bound.params, vec![Value::Integer(10)]);
/// assert_eq!(bound.next_param, 2);
/// ```
pub fn compile_bound(
    filter: &FilterQuery,
    start_param: usize,
) -> Result<BoundPredicate, CompileError> {
    let mut operands = BoundOperands {
        params: Vec::new(),
        next_param: start_param,
    };
    let sql = assemble(filter, &mut operands)?;
    Ok(BoundPredicate {
        sql,
        params: operands.params,
        next_param: operands.next_param,
    })
}

/// Renders the operand of a single filter.
trait OperandRenderer {
    fn render(&mut self, filter: &FieldFilter) -> String;
}

struct InlineOperands;

impl OperandRenderer for InlineOperands {
    fn render(&mut self, filter: &FieldFilter) -> String {
        match filter.value_type {
            ValueType::String => format!("'{}'", filter.value.replace('\'', "''")),
            ValueType::Other => filter.value.clone(),
        }
    }
}

struct BoundOperands {
    params: Vec<Value>,
    next_param: usize,
}

impl OperandRenderer for BoundOperands {
    fn render(&mut self, filter: &FieldFilter) -> String {
        let value = match filter.value_type {
            ValueType::String => Value::Text(filter.value.clone()),
            ValueType::Other => filter
                .value
                .parse::<i64>()
                .map_or_else(|_| Value::Text(filter.value.clone()), Value::Integer),
        };
        self.params.push(value);
        let placeholder = format!("?{}", self.next_param);
        self.next_param += 1;
        placeholder
    }
}

fn assemble<R: OperandRenderer>(
    filter: &FilterQuery,
    operands: &mut R,
) -> Result<String, CompileError> {
    let and_block = if filter.and.is_empty() {
        None
    } else {
        Some(compile_branch(&filter.and, " AND ", false, operands)?)
    };
    let or_block = if filter.or.is_empty() {
        None
    } else {
        Some(compile_branch(&filter.or, " OR ", true, operands)?)
    };

    Ok(match (and_block, or_block) {
        (Some(and), None) => and,
        (None, Some(or)) => or,
        (Some(and), Some(or)) => format!("({and}) AND {or}"),
        (None, None) => String::new(),
    })
}

/// Compiles every field of one branch and conjoins the per-field results.
fn compile_branch<R: OperandRenderer>(
    fields: &BTreeMap<String, Vec<FieldFilter>>,
    joiner: &str,
    group: bool,
    operands: &mut R,
) -> Result<String, CompileError> {
    let mut parts = Vec::with_capacity(fields.len());
    for (field, filters) in fields {
        if !is_identifier(field) {
            return Err(CompileError::InvalidFieldName(field.clone()));
        }
        if filters.is_empty() {
            return Err(CompileError::EmptyFieldFilters(field.clone()));
        }
        let fragments = filters
            .iter()
            .map(|f| compile_fragment(field, f, operands))
            .collect::<Result<Vec<_>, _>>()?;
        let joined = fragments.join(joiner);
        parts.push(if group { format!("({joined})") } else { joined });
    }
    Ok(parts.join(" AND "))
}

fn compile_fragment<R: OperandRenderer>(
    field: &str,
    filter: &FieldFilter,
    operands: &mut R,
) -> Result<String, CompileError> {
    let operator =
        Operator::parse(&filter.operator).ok_or_else(|| CompileError::InvalidOperator {
            field: field.to_string(),
            operator: filter.operator.clone(),
        })?;

    Ok(match operator {
        Operator::IsEmpty => format!("{field} IS NULL"),
        Operator::IsNotEmpty => format!("{field} IS NOT NULL"),
        Operator::Not => format!("NOT {field}={}", operands.render(filter)),
        Operator::Eq => format!("{field} = {}", operands.render(filter)),
        Operator::Gt => format!("{field} > {}", operands.render(filter)),
        Operator::Gte => format!("{field} >= {}", operands.render(filter)),
        Operator::Lt => format!("{field} < {}", operands.render(filter)),
        Operator::Lte => format!("{field} <= {}", operands.render(filter)),
        Operator::Like => format!("{field} LIKE {}", operands.render(filter)),
    })
}
