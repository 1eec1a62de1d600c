//! # Recordkit
//!
//! A table-agnostic record store for relational databases.
//!
//! Recordkit lets callers that know nothing about a table's shape (HTTP
//! handlers, scripts, the bundled CLI) read and write rows using only a table
//! name and a map of fields, and query them with a structured AND/OR filter.
//!
//! ## Features
//!
//! - Generic CRUD over any table or view by name
//! - Structured filters compiled to bound SQL predicates
//! - Row decoding driven by the live declared column types
//! - Minimal update patches diffed against a reference record
//! - Injected store driver (`SQLite` out of the box)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use recordkit::{FieldFilter, FilterQuery, RecordStore, SqliteDriver, StoreSettings, ValueType};
//!
//! let driver = Arc::new(SqliteDriver::open("library.db")?);
//! let store = RecordStore::new(driver, StoreSettings::default());
//!
//! let filter = FilterQuery::new()
//!     .with_and("stock", FieldFilter::new("lt", "10", ValueType::Other))
//!     .with_or("title", FieldFilter::new("like", "bartleby%", ValueType::String));
//! let books = store.fetch_by_filter("v_books", &filter)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod query;
pub mod services;
pub mod storage;

pub use config::{DatabaseConfig, RecordkitConfig};
pub use models::{FieldFilter, Fields, FilterQuery, Operator, Record, Value, ValueType};
pub use query::{BoundPredicate, CompileError, compile, compile_bound};
pub use services::{InputDiffer, RecordStore, StoreSettings, diff};
pub use storage::{BatchMode, ExecOutcome, RowSet, SqliteDriver, StoreDriver};

/// Error type for recordkit operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `StoreUnreachable` | The liveness probe fails or the connection was closed |
/// | `Compile` | A filter has an unknown operator or a malformed shape |
/// | `Execution` | The store rejects or fails a statement |
/// | `BatchFailed` | One statement of a batch insert/delete fails |
/// | `Decode` | A row does not line up with its column metadata |
/// | `InvalidInput` | Empty patches, mismatched batch keys, bad identifiers |
/// | `OperationFailed` | Config loading or logging setup fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The store did not answer the liveness probe.
    ///
    /// No SQL is issued once this is raised.
    #[error("store unreachable: {0}")]
    StoreUnreachable(String),

    /// A filter expression could not be compiled.
    #[error("filter compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// A statement failed in the store.
    ///
    /// Raised when:
    /// - statement preparation fails (unknown table or column, syntax)
    /// - execution fails (constraint violations, type errors)
    /// - row iteration fails mid-query
    #[error("operation '{operation}' failed: {cause}")]
    Execution {
        /// The store operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A batch statement failed part way through.
    ///
    /// `committed` lists the ids whose effects persisted. It is always
    /// empty for atomic batches.
    #[error("batch operation '{operation}' failed at record {index}: {cause}")]
    BatchFailed {
        /// The batch operation that failed.
        operation: String,
        /// Position of the failing record in the input.
        index: usize,
        /// Ids whose effects persisted before the failure.
        committed: Vec<i64>,
        /// The underlying cause.
        cause: String,
    },

    /// A row could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - an update patch is empty once the identifier is removed
    /// - batch records do not share the first record's field set
    /// - a table or column name is not a plain identifier
    /// - a reference record does not serialize to a flat object
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A non-store operation failed.
    ///
    /// Raised when config files cannot be read or parsed, or logging cannot
    /// be initialized.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::Execution`] from any displayable cause.
    pub fn execution(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Execution {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Short machine-readable name of the variant, used as a log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StoreUnreachable(_) => "store_unreachable",
            Self::Compile(_) => "compile",
            Self::Execution { .. } => "execution",
            Self::BatchFailed { .. } => "batch_failed",
            Self::Decode(_) => "decode",
            Self::InvalidInput(_) => "invalid_input",
            Self::OperationFailed { .. } => "operation_failed",
        }
    }
}

/// Result type alias for recordkit operations.
pub type Result<T> = std::result::Result<T, Error>;
