//! Record services.
//!
//! - [`RecordStore`]: generic CRUD over a [`StoreDriver`](crate::StoreDriver)
//! - [`InputDiffer`]: minimal update patches from partial payloads

mod input_differ;
mod record_store;

pub use input_differ::{InputDiffer, diff};
pub use record_store::{RecordStore, StoreSettings};
