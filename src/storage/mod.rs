//! Storage layer.
//!
//! - **Driver**: the [`StoreDriver`] capability every store implements
//! - **Decoder**: raw column bytes to typed values ([`decoder`])
//! - **`SQLite`**: the bundled driver ([`SqliteDriver`])

// Allow significant_drop_tightening - the connection guard is held for the
// whole statement on purpose.
#![allow(clippy::significant_drop_tightening)]

pub mod decoder;
pub mod sqlite;
pub mod traits;

pub use decoder::{ColumnKind, decode, decode_row, decode_rows};
pub use sqlite::{SqliteDriver, record_operation_metrics};
pub use traits::{BatchMode, ExecOutcome, RowSet, StoreDriver};
