//! Store driver trait.

use crate::Result;
use crate::models::Value;
use std::time::Duration;

/// Raw result of a query, before decoding.
///
/// The three sequences line up positionally: `column_names[i]` and
/// `column_types[i]` describe byte slot `i` of every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    /// Column names in result order.
    pub column_names: Vec<String>,
    /// Declared type names in result order (empty when the store has none,
    /// as for expression columns).
    pub column_types: Vec<String>,
    /// Raw column bytes per row; `None` is SQL `NULL`.
    pub rows: Vec<Vec<Option<Vec<u8>>>>,
}

/// Outcome of one executed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    /// Rows changed by the statement.
    pub rows_affected: usize,
    /// Identifier generated by the last insert on the connection.
    pub last_insert_id: i64,
}

/// How a repeated statement treats a failure part way through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Run the whole batch in one transaction; roll everything back on the
    /// first failure.
    #[default]
    Atomic,
    /// Stop at the first failure and keep what already ran.
    BestEffort,
}

impl BatchMode {
    /// Returns the config token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::BestEffort => "best-effort",
        }
    }

    /// Parses a config token.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "atomic" | "transactional" => Some(Self::Atomic),
            "best-effort" | "best_effort" | "besteffort" => Some(Self::BestEffort),
            _ => None,
        }
    }
}

/// Capability the record store executes SQL through.
///
/// Implementations own the connection. Statements use numbered `?N`
/// placeholders bound from `params` in order.
pub trait StoreDriver: Send + Sync {
    /// Short backend label used in logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Checks that the store answers within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnreachable`](crate::Error::StoreUnreachable)
    /// when it does not.
    fn ping(&self, timeout: Duration) -> Result<()>;

    /// Runs a query and returns its rows with column metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`](crate::Error::Execution) if preparation,
    /// execution or row iteration fails.
    fn query(&self, sql: &str, params: &[Value]) -> Result<RowSet>;

    /// Executes a statement once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`](crate::Error::Execution) on failure.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecOutcome>;

    /// Prepares `sql` once and executes it for every parameter set, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchFailed`](crate::Error::BatchFailed) naming the
    /// first failing index. Its `committed` list carries the generated ids
    /// of the statements that persisted (always empty for
    /// [`BatchMode::Atomic`]). An atomic batch whose final commit fails is
    /// rolled back and reported with `index == param_sets.len()`.
    fn execute_repeated(
        &self,
        sql: &str,
        param_sets: &[Vec<Value>],
        mode: BatchMode,
    ) -> Result<Vec<ExecOutcome>>;

    /// Releases the connection. Later calls fail as unreachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the store refuses to close cleanly.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
