//! Counter store adapters.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::{cleanup_task, InMemoryCounterStore};
#[cfg(feature = "redis")]
pub use self::redis::RedisCounterStore;
