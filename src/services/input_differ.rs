//! Update patch derivation.
//!
//! Compares an incoming partial payload against a reference record whose
//! unset fields hold sentinel defaults (`-1`, `""`), and keeps only the
//! fields the caller actually changed.
//!
//! A field can therefore never be set back to its sentinel value through a
//! patch built here.

use crate::models::{Fields, Value};
use crate::{Error, Result};
use serde::Serialize;

/// Derives minimal update patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDiffer {
    id_column: String,
}

impl Default for InputDiffer {
    fn default() -> Self {
        Self::new("id")
    }
}

impl InputDiffer {
    /// Creates a differ that never emits `id_column`.
    #[must_use]
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
        }
    }

    /// Returns the fields of `incoming` that differ from `reference`.
    ///
    /// A reference field is kept iff `incoming` has it, the incoming value
    /// is not `Null`, it differs from the reference value, and it is not the
    /// identifier. Incoming fields the reference does not declare are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `reference` does not serialize to a
    /// flat object of nulls, booleans, integers and strings.
    ///
    /// # Examples
    ///
    /// ```
    /// use recordkit::{Fields, InputDiffer, Value};
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Book {
    ///     id: i64,
    ///     title: String,
    ///     stock: i64,
    /// }
    ///
    /// let reference = Book { id: -1, title: String::new(), stock: -1 };
    /// let incoming = Fields::from([
    ///     ("id".to_string(), Value::Integer(4)),
    ///     ("stock".to_string(), Value::Integer(13)),
    ///     ("title".to_string(), Value::from("")),
    /// ]);
    ///
    /// let patch = InputDiffer::default().diff(&reference, &incoming)?;
    /// assert_eq!(patch, Fields::from([("stock".to_string(), Value::Integer(13))]));
    /// # Ok::<(), recordkit::Error>(())
    /// ```
    pub fn diff<T: Serialize>(&self, reference: &T, incoming: &Fields) -> Result<Fields> {
        let serialized = serde_json::to_value(reference)
            .map_err(|e| Error::InvalidInput(format!("reference record does not serialize: {e}")))?;
        let serde_json::Value::Object(defaults) = serialized else {
            return Err(Error::InvalidInput(
                "reference record must serialize to an object".to_string(),
            ));
        };

        let mut patch = Fields::new();
        for (name, default) in &defaults {
            let default = Value::try_from(default).map_err(|e| {
                Error::InvalidInput(format!("reference field '{name}': {e}"))
            })?;
            if *name == self.id_column {
                continue;
            }
            match incoming.get(name) {
                Some(value) if !value.is_null() && *value != default => {
                    patch.insert(name.clone(), value.clone());
                },
                _ => {},
            }
        }

        tracing::trace!(
            incoming = incoming.len(),
            kept = patch.len(),
            "derived update patch"
        );
        Ok(patch)
    }
}

/// [`InputDiffer::diff`] with the identifier column `id`.
///
/// # Errors
///
/// Same as [`InputDiffer::diff`].
pub fn diff<T: Serialize>(reference: &T, incoming: &Fields) -> Result<Fields> {
    InputDiffer::default().diff(reference, incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Book {
        id: i64,
        title: String,
        author_id: i64,
        stock: i64,
    }

    fn reference() -> Book {
        Book {
            id: -1,
            title: String::new(),
            author_id: -1,
            stock: -1,
        }
    }

    fn incoming(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_keeps_changed_fields() {
        let patch = diff(
            &reference(),
            &incoming(&[
                ("title", Value::from("Pierre")),
                ("stock", Value::Integer(13)),
            ]),
        )
        .unwrap();

        assert_eq!(
            patch,
            incoming(&[
                ("stock", Value::Integer(13)),
                ("title", Value::from("Pierre")),
            ])
        );
    }

    #[test]
    fn test_never_returns_identifier() {
        let patch = diff(
            &reference(),
            &incoming(&[("id", Value::Integer(99)), ("stock", Value::Integer(2))]),
        )
        .unwrap();
        assert!(!patch.contains_key("id"));
        assert_eq!(patch.len(), 1);
    }

    #[test]
    fn test_custom_identifier() {
        let patch = InputDiffer::new("author_id")
            .diff(
                &reference(),
                &incoming(&[("id", Value::Integer(5)), ("author_id", Value::Integer(6))]),
            )
            .unwrap();
        assert_eq!(patch, incoming(&[("id", Value::Integer(5))]));
    }

    #[test]
    fn test_drops_sentinels_nulls_and_unknown_fields() {
        let patch = diff(
            &reference(),
            &incoming(&[
                ("title", Value::from("")),
                ("stock", Value::Integer(-1)),
                ("author_id", Value::Null),
                ("publisher", Value::from("Harper")),
            ]),
        )
        .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_sentinel_reset_is_not_expressible() {
        // Setting stock back to -1 looks identical to leaving it unset.
        let patch = diff(&reference(), &incoming(&[("stock", Value::Integer(-1))])).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_rejects_non_object_reference() {
        let result = diff(&42_i64, &Fields::new());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_nested_reference_fields() {
        let mut reference = BTreeMap::new();
        reference.insert("tags", vec!["sea"]);
        let result = diff(&reference, &Fields::new());
        assert!(matches!(result, Err(Error::InvalidInput(ref msg)) if msg.contains("tags")));
    }

    #[test]
    fn test_booleans_compare_by_value() {
        #[derive(Serialize)]
        struct Flags {
            id: i64,
            archived: bool,
        }
        let reference = Flags {
            id: -1,
            archived: false,
        };
        assert!(
            diff(&reference, &incoming(&[("archived", Value::Bool(false))]))
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            diff(&reference, &incoming(&[("archived", Value::Bool(true))])).unwrap(),
            incoming(&[("archived", Value::Bool(true))])
        );
    }
}
