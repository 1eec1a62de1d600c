//! Statement builders.
//!
//! Every statement uses numbered parameters (`?1`, `?2`, ...) so values are
//! always bound. Table and column names cannot be bound, so they are checked
//! against [`is_identifier`] before being spliced in.

use crate::query::{BoundPredicate, is_identifier};
use crate::{Error, Result};

/// Returns `name` if it is a plain SQL identifier.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] naming the offending `kind` otherwise.
pub fn checked_identifier<'a>(name: &'a str, kind: &str) -> Result<&'a str> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(Error::InvalidInput(format!("invalid {kind} name '{name}'")))
    }
}

/// `SELECT * FROM {table}`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an invalid table name.
pub fn select_all(table: &str) -> Result<String> {
    let table = checked_identifier(table, "table")?;
    Ok(format!("SELECT * FROM {table}"))
}

/// `SELECT * FROM {table} WHERE {id_column} = ?1`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an invalid table or column name.
pub fn select_by_id(table: &str, id_column: &str) -> Result<String> {
    let table = checked_identifier(table, "table")?;
    let id_column = checked_identifier(id_column, "column")?;
    Ok(format!("SELECT * FROM {table} WHERE {id_column} = ?1"))
}

/// `SELECT * FROM {table}`, followed by `WHERE {predicate}` when the
/// predicate is non-empty.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an invalid table name.
pub fn select_where(table: &str, predicate: &BoundPredicate) -> Result<String> {
    let select = select_all(table)?;
    if predicate.is_empty() {
        Ok(select)
    } else {
        Ok(format!("{select} WHERE {}", predicate.sql))
    }
}

/// `INSERT INTO {table} (c1, c2) VALUES (?1, ?2)`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an invalid table or column name, or
/// when `columns` is empty.
pub fn insert<S: AsRef<str>>(table: &str, columns: &[S]) -> Result<String> {
    let table = checked_identifier(table, "table")?;
    if columns.is_empty() {
        return Err(Error::InvalidInput(format!(
            "insert into '{table}' has no fields"
        )));
    }

    let names = columns
        .iter()
        .map(|c| checked_identifier(c.as_ref(), "column"))
        .collect::<Result<Vec<_>>>()?;
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();

    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        names.join(", "),
        placeholders.join(", ")
    ))
}

/// `UPDATE {table} SET c1 = ?1, c2 = ?2 WHERE {id_column} = ?3`.
///
/// The identifier is always the last parameter.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an invalid table or column name, or
/// when `columns` is empty.
pub fn update_by_id<S: AsRef<str>>(table: &str, columns: &[S], id_column: &str) -> Result<String> {
    let table = checked_identifier(table, "table")?;
    let id_column = checked_identifier(id_column, "column")?;
    if columns.is_empty() {
        return Err(Error::InvalidInput(format!(
            "update of '{table}' has no fields to set"
        )));
    }

    let mut param_idx = 1;
    let assignments = columns
        .iter()
        .map(|c| {
            let name = checked_identifier(c.as_ref(), "column")?;
            let assignment = format!("{name} = ?{param_idx}");
            param_idx += 1;
            Ok(assignment)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "UPDATE {table} SET {} WHERE {id_column} = ?{param_idx}",
        assignments.join(", ")
    ))
}

/// `DELETE FROM {table} WHERE {id_column} = ?1`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an invalid table or column name.
pub fn delete_by_id(table: &str, id_column: &str) -> Result<String> {
    let table = checked_identifier(table, "table")?;
    let id_column = checked_identifier(id_column, "column")?;
    Ok(format!("DELETE FROM {table} WHERE {id_column} = ?1"))
}
