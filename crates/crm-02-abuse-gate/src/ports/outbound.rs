//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the abuse gate.
//!
//! Production: `RedisCounterStore` when several worker processes share one
//! limit, `InMemoryCounterStore` for a single process.
//! Testing: `InMemoryCounterStore` with a `ManualClock`.

use crate::domain::errors::CounterError;
use async_trait::async_trait;
use std::time::Duration;

/// Abstract interface for the rate-limit counter.
///
/// ## Atomicity Guarantee
///
/// Increment and read happen as one step per key: two concurrent callers on
/// the same key observe distinct counts.
#[async_trait]
pub trait RateCounterStore: Send + Sync {
    /// Count one attempt against `key` and report whether it is still within
    /// `limit`. The counter must expire no later than `ttl` from now.
    async fn increment_and_check(
        &self,
        key: &str,
        ttl: Duration,
        limit: u32,
    ) -> Result<bool, CounterError>;

    /// Backend name for logs.
    fn backend(&self) -> &'static str;
}
