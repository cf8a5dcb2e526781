//! Storage adapters.

pub mod memory;
pub mod sqlite;

pub use memory::{Fault, InMemoryLeadStore};
pub use sqlite::SqliteLeadStore;
