//! Data models for recordkit.
//!
//! Records and patches are plain ordered maps from column name to [`Value`];
//! filters are the two-branch [`FilterQuery`].

mod filter;
mod value;

pub use filter::{FieldFilter, FilterQuery, Operator, ValueType};
pub use value::Value;

use std::collections::BTreeMap;

/// A decoded row: column name to typed value.
///
/// Produced by the row decoder; an empty record means "no row".
pub type Record = BTreeMap<String, Value>;

/// A caller-supplied field map, used for inserts and update patches.
pub type Fields = BTreeMap<String, Value>;
