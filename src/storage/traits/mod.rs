//! Storage traits.

mod driver;

pub use driver::{BatchMode, ExecOutcome, RowSet, StoreDriver};
