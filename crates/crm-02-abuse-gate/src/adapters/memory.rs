//! In-process counter store.
//!
//! Counters live in a sharded map; each increment runs under the shard lock
//! for its key, which makes increment-and-read atomic per key. Limits are per
//! process: run a shared store when several workers serve the form.

use crate::domain::errors::CounterError;
use crate::ports::outbound::RateCounterStore;
use async_trait::async_trait;
use crm_types::{Clock, SystemClock};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Counter for one key
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    count: u64,
    /// Unix seconds after which the counter is void
    expires_at: i64,
}

/// Counter store backed by a `DashMap`.
pub struct InMemoryCounterStore {
    counters: DashMap<String, WindowCounter>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: DashMap::new(),
            clock,
        }
    }

    /// Drop expired counters. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.unix_seconds();
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.expires_at > now);
        let removed = before.saturating_sub(self.counters.len());
        if removed > 0 {
            debug!(removed, "Removed expired rate limit counters");
        }
        removed
    }

    /// Number of live counters
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }
}

#[async_trait]
impl RateCounterStore for InMemoryCounterStore {
    async fn increment_and_check(
        &self,
        key: &str,
        ttl: Duration,
        limit: u32,
    ) -> Result<bool, CounterError> {
        let now = self.clock.unix_seconds();
        let ttl_secs = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);

        let mut counter = self
            .counters
            .entry(key.to_string())
            .or_insert(WindowCounter {
                count: 0,
                expires_at: now.saturating_add(ttl_secs),
            });

        if counter.expires_at <= now {
            counter.count = 0;
            counter.expires_at = now.saturating_add(ttl_secs);
        }
        counter.count += 1;

        Ok(counter.count <= u64::from(limit))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Background task to evict expired counters
pub async fn cleanup_task(store: Arc<InMemoryCounterStore>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        store.cleanup();
    }
}
