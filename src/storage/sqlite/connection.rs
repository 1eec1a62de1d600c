//! Connection handling for the `SQLite` driver.
//!
//! Mutex acquisition with poison recovery, a bounded variant used by the
//! liveness probe, and pragma setup for new connections.

use crate::{Error, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

/// Default bound for lock acquisition and `busy_timeout` (5 seconds).
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Acquires a mutex, recovering the inner value if it was poisoned.
///
/// A panic inside an earlier critical section must not take the connection
/// down with it; the poison is logged and counted instead.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("recordkit_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Acquires a mutex, giving up after `timeout`.
///
/// `std::sync::Mutex` has no timed lock, so this spins on `try_lock` with a
/// short sleep.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the lock cannot be acquired within
/// the timeout.
pub fn acquire_lock_with_timeout<T>(
    mutex: &Mutex<T>,
    timeout: Duration,
) -> Result<MutexGuard<'_, T>> {
    let start = Instant::now();
    let sleep_duration = Duration::from_millis(10);

    loop {
        match mutex.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => {
                tracing::warn!("SQLite mutex was poisoned, recovering");
                metrics::counter!("recordkit_mutex_poison_recovery_total").increment(1);
                return Ok(poisoned.into_inner());
            },
            Err(TryLockError::WouldBlock) => {
                if start.elapsed() > timeout {
                    metrics::counter!("recordkit_mutex_timeout_total").increment(1);
                    return Err(Error::OperationFailed {
                        operation: "acquire_lock".to_string(),
                        cause: format!("Lock acquisition timed out after {timeout:?}"),
                    });
                }
                std::thread::sleep(sleep_duration);
            },
        }
    }
}

/// Applies connection pragmas.
///
/// - WAL journal (file databases; in-memory ones stay on `memory`)
/// - `NORMAL` synchronous
/// - `busy_timeout` so lock contention waits instead of failing at once
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if `busy_timeout` cannot be set.
pub fn configure_connection(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    // journal_mode answers with a row, so the result is ignored rather than
    // run through execute_batch.
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    conn.busy_timeout(busy_timeout)
        .map_err(|e| Error::OperationFailed {
            operation: "configure_connection".to_string(),
            cause: e.to_string(),
        })?;

    Ok(())
}
