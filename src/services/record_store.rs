//! Generic record store.
//!
//! CRUD over any table or view, addressed by name, with field maps instead
//! of per-table types.

use crate::config::DatabaseConfig;
use crate::models::{Fields, FilterQuery, Record, Value};
use crate::observability::log_failure;
use crate::query::compile_bound;
use crate::storage::decoder::decode_rows;
use crate::storage::sqlite::sql;
use crate::storage::{BatchMode, StoreDriver, record_operation_metrics};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Settings of a [`RecordStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Identifier column shared by every table.
    pub id_column: String,
    /// Bound on the liveness probe run before each operation.
    pub ping_timeout: Duration,
    /// Failure policy of `insert_many` and `delete_by_ids`.
    pub batch_mode: BatchMode,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            id_column: "id".to_string(),
            ping_timeout: Duration::from_secs(5),
            batch_mode: BatchMode::Atomic,
        }
    }
}

impl StoreSettings {
    /// Sets the identifier column.
    #[must_use]
    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    /// Sets the liveness probe timeout.
    #[must_use]
    pub const fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// Sets the batch failure policy.
    #[must_use]
    pub const fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }
}

impl From<&DatabaseConfig> for StoreSettings {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            id_column: config.id_column.clone(),
            ping_timeout: config.ping_timeout(),
            batch_mode: config.batch_mode,
        }
    }
}

/// Table-agnostic CRUD executor.
///
/// Every operation first probes the driver. If the probe fails the
/// operation returns [`Error::StoreUnreachable`] and issues no SQL. Table
/// and column names must be plain identifiers; values are always bound.
///
/// Cloning is cheap and shares the driver.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use recordkit::{Fields, RecordStore, SqliteDriver, StoreSettings, Value};
///
/// let driver = SqliteDriver::in_memory()?;
/// driver.run_script("CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT)")?;
/// let store = RecordStore::new(Arc::new(driver), StoreSettings::default());
///
/// let fields = Fields::from([("name".to_string(), Value::from("Herman Melville"))]);
/// let id = store.insert_one("authors", &fields)?;
/// let author = store.fetch_by_id("authors", id)?;
/// assert_eq!(author["name"], Value::from("Herman Melville"));
/// # Ok::<(), recordkit::Error>(())
/// ```
#[derive(Clone)]
pub struct RecordStore {
    driver: Arc<dyn StoreDriver>,
    settings: StoreSettings,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("backend", &self.driver.backend_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl RecordStore {
    /// Creates a store over an injected driver.
    #[must_use]
    pub fn new(driver: Arc<dyn StoreDriver>, settings: StoreSettings) -> Self {
        Self { driver, settings }
    }

    /// Returns the store settings.
    #[must_use]
    pub const fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Fetches the row whose identifier is `id`.
    ///
    /// Returns an empty record, not an error, when no row matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnreachable`], [`Error::InvalidInput`] for a bad
    /// table name, [`Error::Execution`] or [`Error::Decode`].
    #[instrument(skip(self), fields(operation = "fetch_by_id", backend = self.driver.backend_name()))]
    pub fn fetch_by_id(&self, table: &str, id: i64) -> Result<Record> {
        self.observe("fetch_by_id", || {
            let statement = sql::select_by_id(table, &self.settings.id_column)?;
            let rows = self.driver.query(&statement, &[Value::Integer(id)])?;
            Ok(decode_rows(&rows)?.into_iter().next().unwrap_or_default())
        })
    }

    /// Fetches every row of a table or view.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_by_id`](Self::fetch_by_id).
    #[instrument(skip(self), fields(operation = "fetch_all", backend = self.driver.backend_name()))]
    pub fn fetch_all(&self, table: &str) -> Result<Vec<Record>> {
        self.observe("fetch_all", || {
            let statement = sql::select_all(table)?;
            let rows = self.driver.query(&statement, &[])?;
            decode_rows(&rows)
        })
    }

    /// Fetches the rows matching a filter.
    ///
    /// An empty filter reads every row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compile`] without querying when the filter does not
    /// compile; otherwise as [`fetch_by_id`](Self::fetch_by_id).
    #[instrument(skip(self, filter), fields(operation = "fetch_by_filter", backend = self.driver.backend_name()))]
    pub fn fetch_by_filter(&self, table: &str, filter: &FilterQuery) -> Result<Vec<Record>> {
        self.observe("fetch_by_filter", || {
            let predicate = compile_bound(filter, 1)?;
            let statement = sql::select_where(table, &predicate)?;
            tracing::debug!(sql = %statement, params = predicate.params.len(), "filtered select");
            let rows = self.driver.query(&statement, &predicate.params)?;
            decode_rows(&rows)
        })
    }

    /// Inserts one row and returns its generated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty field map or bad names,
    /// [`Error::StoreUnreachable`] or [`Error::Execution`].
    #[instrument(skip(self, record), fields(operation = "insert_one", backend = self.driver.backend_name(), field_count = record.len()))]
    pub fn insert_one(&self, table: &str, record: &Fields) -> Result<i64> {
        self.observe("insert_one", || {
            let columns: Vec<&str> = record.keys().map(String::as_str).collect();
            let statement = sql::insert(table, &columns)?;
            let params: Vec<Value> = record.values().cloned().collect();
            Ok(self.driver.execute(&statement, &params)?.last_insert_id)
        })
    }

    /// Inserts several rows with one prepared statement.
    ///
    /// The first record's keys are the column list; every record must have
    /// exactly those keys. Ids come back in input order. An empty batch
    /// returns an empty list without executing SQL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] before any execution when the key sets
    /// differ, and [`Error::BatchFailed`] when a record fails. With
    /// [`BatchMode::Atomic`] nothing persists; with
    /// [`BatchMode::BestEffort`] `committed` lists the ids already inserted.
    #[instrument(skip(self, records), fields(operation = "insert_many", backend = self.driver.backend_name(), record_count = records.len()))]
    pub fn insert_many(&self, table: &str, records: &[Fields]) -> Result<Vec<i64>> {
        self.observe("insert_many", || {
            let Some(first) = records.first() else {
                return Ok(Vec::new());
            };
            let columns: Vec<&str> = first.keys().map(String::as_str).collect();

            let mut param_sets = Vec::with_capacity(records.len());
            for (index, record) in records.iter().enumerate() {
                if !record.keys().map(String::as_str).eq(columns.iter().copied()) {
                    return Err(Error::InvalidInput(format!(
                        "record {index} does not have the same fields as record 0 ({})",
                        columns.join(", ")
                    )));
                }
                param_sets.push(record.values().cloned().collect());
            }

            let statement = sql::insert(table, &columns)?;
            let outcomes = self
                .driver
                .execute_repeated(&statement, &param_sets, self.settings.batch_mode)
                .map_err(|e| rename_batch_error(e, "insert_many", None))?;
            Ok(outcomes.iter().map(|o| o.last_insert_id).collect())
        })
    }

    /// Updates the row whose identifier is `id` with `patch`.
    ///
    /// The identifier key is never part of the `SET` list, even if present
    /// in `patch`. Matching no row is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the patch is empty once the
    /// identifier is removed, [`Error::StoreUnreachable`] or
    /// [`Error::Execution`].
    #[instrument(skip(self, patch), fields(operation = "update_by_id", backend = self.driver.backend_name()))]
    pub fn update_by_id(&self, table: &str, patch: &Fields, id: i64) -> Result<()> {
        self.observe("update_by_id", || {
            let id_column = self.settings.id_column.as_str();
            let (columns, mut params): (Vec<&str>, Vec<Value>) = patch
                .iter()
                .filter(|(name, _)| name.as_str() != id_column)
                .map(|(name, value)| (name.as_str(), value.clone()))
                .unzip();
            if columns.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "update of {table} {id} has no fields besides '{id_column}'"
                )));
            }

            let statement = sql::update_by_id(table, &columns, id_column)?;
            params.push(Value::Integer(id));
            let outcome = self.driver.execute(&statement, &params)?;
            if outcome.rows_affected == 0 {
                tracing::debug!(table, id, "update matched no rows");
            }
            Ok(())
        })
    }

    /// Deletes the row whose identifier is `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnreachable`], [`Error::InvalidInput`] or
    /// [`Error::Execution`].
    #[instrument(skip(self), fields(operation = "delete_by_id", backend = self.driver.backend_name()))]
    pub fn delete_by_id(&self, table: &str, id: i64) -> Result<()> {
        self.observe("delete_by_id", || {
            let statement = sql::delete_by_id(table, &self.settings.id_column)?;
            self.driver.execute(&statement, &[Value::Integer(id)])?;
            Ok(())
        })
    }

    /// Deletes several rows with one prepared statement, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchFailed`] at the first failing id. With
    /// [`BatchMode::BestEffort`] `committed` lists the ids already deleted.
    #[instrument(skip(self, ids), fields(operation = "delete_by_ids", backend = self.driver.backend_name(), id_count = ids.len()))]
    pub fn delete_by_ids(&self, table: &str, ids: &[i64]) -> Result<()> {
        self.observe("delete_by_ids", || {
            if ids.is_empty() {
                return Ok(());
            }
            let statement = sql::delete_by_id(table, &self.settings.id_column)?;
            let param_sets: Vec<Vec<Value>> =
                ids.iter().map(|&id| vec![Value::Integer(id)]).collect();
            self.driver
                .execute_repeated(&statement, &param_sets, self.settings.batch_mode)
                .map_err(|e| rename_batch_error(e, "delete_by_ids", Some(ids)))?;
            Ok(())
        })
    }

    /// Runs the liveness probe on its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnreachable`] if the store does not answer.
    #[instrument(skip(self), fields(operation = "check_health", backend = self.driver.backend_name()))]
    pub fn check_health(&self) -> Result<()> {
        self.observe("check_health", || Ok(()))
    }

    /// Closes the driver. Every later operation on any clone of this store
    /// fails with [`Error::StoreUnreachable`].
    ///
    /// # Errors
    ///
    /// Returns the driver's error if it cannot close cleanly.
    #[instrument(skip(self), fields(operation = "close", backend = self.driver.backend_name()))]
    pub fn close(&self) -> Result<()> {
        let result = self.driver.close();
        match &result {
            Ok(()) => tracing::debug!("store closed"),
            Err(e) => {
                log_failure("close", e);
            },
        }
        result
    }

    /// Probes the driver, runs `op`, then records metrics and logs failure.
    fn observe<T>(&self, operation: &'static str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = self.ensure_reachable().and_then(|()| op());

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(self.driver.backend_name(), operation, start, status);
        if let Err(e) = &result {
            log_failure(operation, e);
        }
        result
    }

    fn ensure_reachable(&self) -> Result<()> {
        self.driver
            .ping(self.settings.ping_timeout)
            .map_err(|e| match e {
                Error::StoreUnreachable(_) => e,
                other => Error::StoreUnreachable(other.to_string()),
            })
    }
}

/// Re-labels a driver batch failure with the store operation name.
///
/// The driver reports one committed entry per persisted statement, as a
/// generated id. For deletes those entries are mapped back to the input ids.
fn rename_batch_error(error: Error, operation: &str, ids: Option<&[i64]>) -> Error {
    match error {
        Error::BatchFailed {
            index,
            committed,
            cause,
            ..
        } => {
            let committed = match ids {
                Some(ids) => ids.iter().take(committed.len()).copied().collect(),
                None => committed,
            };
            Error::BatchFailed {
                operation: operation.to_string(),
                index,
                committed,
                cause,
            }
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldFilter, ValueType};
    use crate::storage::{ExecOutcome, RowSet};
    use std::sync::Mutex;

    /// Driver that records statements and answers with canned results.
    #[derive(Default)]
    struct RecordingDriver {
        reachable: bool,
        statements: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl RecordingDriver {
        fn reachable() -> Arc<Self> {
            Arc::new(Self {
                reachable: true,
                ..Self::default()
            })
        }

        fn statements(&self) -> Vec<(String, Vec<Value>)> {
            self.statements.lock().unwrap().clone()
        }
    }

    impl StoreDriver for RecordingDriver {
        fn backend_name(&self) -> &'static str {
            "mock"
        }

        fn ping(&self, _timeout: Duration) -> Result<()> {
            if self.reachable {
                Ok(())
            } else {
                Err(Error::StoreUnreachable("mock is down".to_string()))
            }
        }

        fn query(&self, sql: &str, params: &[Value]) -> Result<RowSet> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(RowSet::default())
        }

        fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecOutcome> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(ExecOutcome {
                rows_affected: 1,
                last_insert_id: 7,
            })
        }

        fn execute_repeated(
            &self,
            sql: &str,
            param_sets: &[Vec<Value>],
            _mode: BatchMode,
        ) -> Result<Vec<ExecOutcome>> {
            let mut statements = self.statements.lock().unwrap();
            let mut outcomes = Vec::new();
            for (i, params) in param_sets.iter().enumerate() {
                statements.push((sql.to_string(), params.clone()));
                outcomes.push(ExecOutcome {
                    rows_affected: 1,
                    last_insert_id: i64::try_from(i).unwrap() + 1,
                });
            }
            Ok(outcomes)
        }
    }

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_fetch_by_id_binds_id() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(driver.clone(), StoreSettings::default());

        let record = store.fetch_by_id("books", 42).unwrap();
        assert!(record.is_empty());
        assert_eq!(
            driver.statements(),
            vec![(
                "SELECT * FROM books WHERE id = ?1".to_string(),
                vec![Value::Integer(42)]
            )]
        );
    }

    #[test]
    fn test_custom_id_column() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(
            driver.clone(),
            StoreSettings::default().with_id_column("book_id"),
        );

        let patch = fields(&[("book_id", Value::Integer(9)), ("stock", Value::Integer(1))]);
        store.update_by_id("books", &patch, 3).unwrap();
        assert_eq!(
            driver.statements()[0].0,
            "UPDATE books SET stock = ?1 WHERE book_id = ?2"
        );
    }

    #[test]
    fn test_fetch_by_filter_binds_operands() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(driver.clone(), StoreSettings::default());
        let filter = FilterQuery::new()
            .with_and("stock", FieldFilter::new("lt", "10", ValueType::Other))
            .with_or("title", FieldFilter::new("like", "bartleby%", ValueType::String));

        store.fetch_by_filter("v_books", &filter).unwrap();
        assert_eq!(
            driver.statements(),
            vec![(
                "SELECT * FROM v_books WHERE (stock < ?1) AND (title LIKE ?2)".to_string(),
                vec![Value::Integer(10), Value::from("bartleby%")]
            )]
        );
    }

    #[test]
    fn test_compile_failure_issues_no_sql() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(driver.clone(), StoreSettings::default());
        let filter =
            FilterQuery::new().with_and("stock", FieldFilter::new("between", "1", ValueType::Other));

        let result = store.fetch_by_filter("books", &filter);
        assert!(matches!(result, Err(Error::Compile(_))));
        assert!(driver.statements().is_empty());
    }

    #[test]
    fn test_update_rejects_id_only_patch() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(driver.clone(), StoreSettings::default());

        let result = store.update_by_id("books", &fields(&[("id", Value::Integer(1))]), 1);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        let result = store.update_by_id("books", &Fields::new(), 1);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(driver.statements().is_empty());
    }

    #[test]
    fn test_insert_one_rejects_empty_fields() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(driver.clone(), StoreSettings::default());

        assert!(matches!(
            store.insert_one("books", &Fields::new()),
            Err(Error::InvalidInput(_))
        ));
        assert!(driver.statements().is_empty());
    }

    #[test]
    fn test_insert_many_checks_keys_before_executing() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(driver.clone(), StoreSettings::default());
        let records = vec![
            fields(&[("title", Value::from("Typee")), ("stock", Value::Integer(1))]),
            fields(&[("title", Value::from("Omoo"))]),
        ];

        let result = store.insert_many("books", &records);
        assert!(
            matches!(result, Err(Error::InvalidInput(ref msg)) if msg.contains("record 1")),
            "Expected InvalidInput for record 1, got {result:?}"
        );
        assert!(driver.statements().is_empty());
    }

    #[test]
    fn test_insert_many_empty_batch() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(driver.clone(), StoreSettings::default());
        assert_eq!(store.insert_many("books", &[]).unwrap(), Vec::<i64>::new());
        assert!(driver.statements().is_empty());
    }

    #[test]
    fn test_insert_many_returns_ids_in_order() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(driver.clone(), StoreSettings::default());
        let records = vec![
            fields(&[("title", Value::from("Typee"))]),
            fields(&[("title", Value::from("Omoo"))]),
        ];

        assert_eq!(store.insert_many("books", &records).unwrap(), vec![1, 2]);
        let statements = driver.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].0, "INSERT INTO books (title) VALUES (?1)");
        assert_eq!(statements[1].1, vec![Value::from("Omoo")]);
    }

    #[test]
    fn test_unreachable_store_issues_no_sql() {
        let driver = Arc::new(RecordingDriver::default());
        let store = RecordStore::new(driver.clone(), StoreSettings::default());
        let patch = fields(&[("stock", Value::Integer(13))]);

        assert!(matches!(store.fetch_by_id("books", 1), Err(Error::StoreUnreachable(_))));
        assert!(matches!(store.fetch_all("books"), Err(Error::StoreUnreachable(_))));
        assert!(matches!(
            store.fetch_by_filter("books", &FilterQuery::new()),
            Err(Error::StoreUnreachable(_))
        ));
        assert!(matches!(store.insert_one("books", &patch), Err(Error::StoreUnreachable(_))));
        assert!(matches!(
            store.insert_many("books", &[patch.clone()]),
            Err(Error::StoreUnreachable(_))
        ));
        assert!(matches!(
            store.update_by_id("books", &patch, 1),
            Err(Error::StoreUnreachable(_))
        ));
        assert!(matches!(store.delete_by_id("books", 1), Err(Error::StoreUnreachable(_))));
        assert!(matches!(
            store.delete_by_ids("books", &[1, 2]),
            Err(Error::StoreUnreachable(_))
        ));
        assert!(matches!(store.check_health(), Err(Error::StoreUnreachable(_))));
        assert!(driver.statements().is_empty());
    }

    #[test]
    fn test_invalid_table_name() {
        let driver = RecordingDriver::reachable();
        let store = RecordStore::new(driver.clone(), StoreSettings::default());
        assert!(matches!(
            store.fetch_all("books; DROP TABLE books"),
            Err(Error::InvalidInput(_))
        ));
        assert!(driver.statements().is_empty());
    }

    #[test]
    fn test_rename_batch_error_for_deletes() {
        let best_effort = Error::BatchFailed {
            operation: "execute_repeated".to_string(),
            index: 2,
            committed: vec![0, 0],
            cause: "constraint".to_string(),
        };
        match rename_batch_error(best_effort, "delete_by_ids", Some(&[10, 11, 12])) {
            Error::BatchFailed {
                operation,
                committed,
                ..
            } => {
                assert_eq!(operation, "delete_by_ids");
                assert_eq!(committed, vec![10, 11]);
            },
            other => panic!("Expected BatchFailed, got {other:?}"),
        }

        let atomic = Error::BatchFailed {
            operation: "execute_repeated".to_string(),
            index: 2,
            committed: Vec::new(),
            cause: "constraint".to_string(),
        };
        match rename_batch_error(atomic, "delete_by_ids", Some(&[10, 11, 12])) {
            Error::BatchFailed { committed, .. } => assert!(committed.is_empty()),
            other => panic!("Expected BatchFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_from_config() {
        let config = DatabaseConfig {
            id_column: "uid".to_string(),
            ping_timeout_ms: 250,
            batch_mode: BatchMode::BestEffort,
            ..DatabaseConfig::default()
        };
        let settings = StoreSettings::from(&config);
        assert_eq!(settings.id_column, "uid");
        assert_eq!(settings.ping_timeout, Duration::from_millis(250));
        assert_eq!(settings.batch_mode, BatchMode::BestEffort);
    }
}
