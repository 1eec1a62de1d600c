//! Filter compilation.
//!
//! - [`compiler`]: [`FilterQuery`](crate::models::FilterQuery) to SQL predicate,
//!   inline or with bound placeholders
//! - [`identifier`]: checks for names spliced into SQL

pub mod compiler;
pub mod identifier;

pub use compiler::{BoundPredicate, CompileError, compile, compile_bound};
pub use identifier::is_identifier;
