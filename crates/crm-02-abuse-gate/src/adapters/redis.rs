//! Redis-backed counter store.
//!
//! `INCR` and `EXPIRE` are sent as one `MULTI`/`EXEC` pipeline, so all worker
//! processes pointed at the same Redis share one limit per client.

use crate::domain::errors::CounterError;
use crate::ports::outbound::RateCounterStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

/// Counter store on a shared Redis instance.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    key_prefix: String,
    op_timeout: Duration,
}

impl RedisCounterStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(
        url: &str,
        key_prefix: impl Into<String>,
        op_timeout: Duration,
    ) -> Result<Self, CounterError> {
        let client =
            redis::Client::open(url).map_err(|e| CounterError::Unavailable(e.to_string()))?;
        let conn = timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CounterError::Unavailable("connect timed out".into()))?
            .map_err(|e| CounterError::Unavailable(e.to_string()))?;

        info!(timeout_ms = op_timeout.as_millis() as u64, "Connected to Redis counter store");
        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
            op_timeout,
        })
    }

    fn full_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:rl:{}", self.key_prefix, key)
        }
    }
}

#[async_trait]
impl RateCounterStore for RedisCounterStore {
    async fn increment_and_check(
        &self,
        key: &str,
        ttl: Duration,
        limit: u32,
    ) -> Result<bool, CounterError> {
        let full_key = self.full_key(key);
        let ttl_secs = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .incr(&full_key, 1_i64)
            .expire(&full_key, ttl_secs)
            .ignore();

        let (count,): (i64,) = timeout(self.op_timeout, pipe.query_async(&mut conn))
            .await
            .map_err(|_| CounterError::Unavailable("redis operation timed out".into()))?
            .map_err(|e| CounterError::Backend(e.to_string()))?;

        Ok(count <= i64::from(limit))
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
