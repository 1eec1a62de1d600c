//! `SQLite` store driver.

use super::connection::{
    DEFAULT_LOCK_TIMEOUT, acquire_lock, acquire_lock_with_timeout, configure_connection,
};
use crate::config::DatabaseConfig;
use crate::models::Value;
use crate::storage::traits::{BatchMode, ExecOutcome, RowSet, StoreDriver};
use crate::{Error, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// [`StoreDriver`] backed by a single `rusqlite` connection.
///
/// # Concurrency Model
///
/// The connection sits behind a `Mutex` because `rusqlite::Connection` is
/// not `Sync`. Every call holds the lock for its whole duration, so a batch
/// runs without interleaving. WAL mode and `busy_timeout` cover contention
/// from other processes.
///
/// # Closing
///
/// [`close`](StoreDriver::close) drops the connection. Every later call,
/// including [`ping`](StoreDriver::ping), fails with
/// [`Error::StoreUnreachable`].
pub struct SqliteDriver {
    conn: Mutex<Option<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteDriver {
    /// Opens (or creates) a database file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnreachable`] if the file cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use recordkit::SqliteDriver;
    ///
    /// let driver = SqliteDriver::open("library.db")?;
    /// # Ok::<(), recordkit::Error>(())
    /// ```
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(db_path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Opens a database file with an explicit `busy_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnreachable`] if the file cannot be opened, or
    /// [`Error::OperationFailed`] if the connection cannot be configured.
    pub fn open_with(db_path: impl Into<PathBuf>, busy_timeout: Duration) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| {
            Error::StoreUnreachable(format!("cannot open {}: {e}", db_path.display()))
        })?;
        configure_connection(&conn, busy_timeout)?;

        tracing::debug!(path = %db_path.display(), "opened sqlite database");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            db_path: Some(db_path),
        })
    }

    /// Opens a private in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnreachable`] if `SQLite` cannot allocate it.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::StoreUnreachable(format!("cannot open in-memory database: {e}")))?;
        configure_connection(&conn, DEFAULT_LOCK_TIMEOUT)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            db_path: None,
        })
    }

    /// Opens the database described by `config`.
    ///
    /// # Errors
    ///
    /// Same as [`open_with`](Self::open_with) and [`in_memory`](Self::in_memory).
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        match &config.path {
            Some(path) => Self::open_with(path, config.busy_timeout()),
            None => Self::in_memory(),
        }
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs a multi-statement SQL script, such as a schema fixture.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if any statement fails.
    pub fn run_script(&self, sql: &str) -> Result<()> {
        let guard = acquire_lock(&self.conn);
        let conn = open_connection(&guard)?;
        conn.execute_batch(sql)
            .map_err(|e| Error::execution("run_script", e))
    }
}

fn open_connection<'a>(guard: &'a MutexGuard<'_, Option<Connection>>) -> Result<&'a Connection> {
    guard
        .as_ref()
        .ok_or_else(|| Error::StoreUnreachable("connection closed".to_string()))
}

/// Copies a column value out as the bytes the decoder expects.
///
/// Numbers are rendered in their base-10 text form, the way a textual
/// protocol would deliver them.
fn raw_bytes(value: ValueRef<'_>) -> Option<Vec<u8>> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string().into_bytes()),
        ValueRef::Real(f) => Some(f.to_string().into_bytes()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(bytes.to_vec()),
    }
}

fn run_query(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<RowSet> {
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let column_types: Vec<String> = stmt
        .columns()
        .iter()
        .map(|c| c.decl_type().unwrap_or_default().to_string())
        .collect();
    let column_count = column_names.len();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut raw_rows = Vec::new();
    while let Some(row) = rows.next()? {
        let mut raw = Vec::with_capacity(column_count);
        for i in 0..column_count {
            raw.push(raw_bytes(row.get_ref(i)?));
        }
        raw_rows.push(raw);
    }

    Ok(RowSet {
        column_names,
        column_types,
        rows: raw_rows,
    })
}

impl StoreDriver for SqliteDriver {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn ping(&self, timeout: Duration) -> Result<()> {
        let guard = acquire_lock_with_timeout(&self.conn, timeout)
            .map_err(|e| Error::StoreUnreachable(e.to_string()))?;
        let conn = open_connection(&guard)?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| Error::StoreUnreachable(e.to_string()))
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<RowSet> {
        let guard = acquire_lock(&self.conn);
        let conn = open_connection(&guard)?;
        run_query(conn, sql, params).map_err(|e| Error::execution("query", e))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecOutcome> {
        let guard = acquire_lock(&self.conn);
        let conn = open_connection(&guard)?;
        let rows_affected = conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(|e| Error::execution("execute", e))?;

        Ok(ExecOutcome {
            rows_affected,
            last_insert_id: conn.last_insert_rowid(),
        })
    }

    fn execute_repeated(
        &self,
        sql: &str,
        param_sets: &[Vec<Value>],
        mode: BatchMode,
    ) -> Result<Vec<ExecOutcome>> {
        let guard = acquire_lock(&self.conn);
        let conn = open_connection(&guard)?;

        if mode == BatchMode::Atomic {
            conn.execute("BEGIN IMMEDIATE", [])
                .map_err(|e| Error::execution("begin_transaction", e))?;
        }

        let mut outcomes = Vec::with_capacity(param_sets.len());
        let result = (|| -> std::result::Result<(), (usize, rusqlite::Error)> {
            let mut stmt = conn.prepare(sql).map_err(|e| (0, e))?;
            for (index, params) in param_sets.iter().enumerate() {
                let rows_affected = stmt
                    .execute(params_from_iter(params.iter()))
                    .map_err(|e| (index, e))?;
                outcomes.push(ExecOutcome {
                    rows_affected,
                    last_insert_id: conn.last_insert_rowid(),
                });
            }
            Ok(())
        })();

        match (mode, result) {
            (BatchMode::Atomic, Ok(())) => match conn.execute("COMMIT", []) {
                Ok(_) => Ok(outcomes),
                Err(e) => {
                    // A failed COMMIT (deferred constraints) leaves the
                    // transaction open on the shared connection.
                    let _ = conn.execute("ROLLBACK", []);
                    Err(Error::BatchFailed {
                        operation: "execute_repeated".to_string(),
                        index: param_sets.len(),
                        committed: Vec::new(),
                        cause: e.to_string(),
                    })
                },
            },
            (BatchMode::BestEffort, Ok(())) => Ok(outcomes),
            (BatchMode::Atomic, Err((index, e))) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(Error::BatchFailed {
                    operation: "execute_repeated".to_string(),
                    index,
                    committed: Vec::new(),
                    cause: e.to_string(),
                })
            },
            (BatchMode::BestEffort, Err((index, e))) => Err(Error::BatchFailed {
                operation: "execute_repeated".to_string(),
                index,
                committed: outcomes.iter().map(|o| o.last_insert_id).collect(),
                cause: e.to_string(),
            }),
        }
    }

    fn close(&self) -> Result<()> {
        let mut guard = acquire_lock(&self.conn);
        match guard.take() {
            Some(conn) => conn.close().map_err(|(conn, e)| {
                // Put it back so the handle stays usable after a failed close.
                *guard = Some(conn);
                Error::OperationFailed {
                    operation: "close".to_string(),
                    cause: e.to_string(),
                }
            }),
            None => Ok(()),
        }
    }
}
