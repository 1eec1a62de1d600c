//! `SQLite` implementation of the store driver.
//!
//! ## Module Structure
//!
//! - [`connection`]: lock acquisition and connection pragmas
//! - [`sql`]: statement builders with identifier checks
//! - [`metrics`]: per-operation metrics recording
//! - `driver`: [`SqliteDriver`] itself

mod connection;
mod driver;
mod metrics;
pub mod sql;

pub use connection::{
    DEFAULT_LOCK_TIMEOUT, acquire_lock, acquire_lock_with_timeout, configure_connection,
};
pub use driver::SqliteDriver;
pub use metrics::record_operation_metrics;
