use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::Script;
use uuid::Uuid;

use tollgate_core::{QuotaKey, WindowKey};
use tollgate_state::error::StateError;
use tollgate_state::store::{
    BackendProbe, QuotaCounter, WindowCounter, WindowDecision, decision_from_count,
};

use crate::config::RedisConfig;
use crate::scripts;

/// Redis-backed counter store, the shared (primary) backend.
///
/// Uses a `deadpool-redis` connection pool and Lua scripts so that the
/// prune/count/insert sequence and the quota increment execute as single
/// atomic units server-side. Window entries are sorted sets that expire on
/// their own after one window length; quota entries expire 24 hours after
/// first use.
///
/// Every operation is bounded by the configured sub-second timeout; a
/// timeout is reported as [`StateError::Timeout`] and treated by the gate
/// exactly like a connection failure.
pub struct RedisCounterStore {
    pool: Pool,
    prefix: String,
    operation_timeout: Duration,
}

impl RedisCounterStore {
    /// Create a new `RedisCounterStore` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StateError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StateError::Connection(e.to_string()))?
            .map_err(|e| StateError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
            operation_timeout: config.operation_timeout,
        })
    }

    /// Build the full Redis key for a canonical key string.
    fn redis_key(&self, canonical: &str) -> String {
        format!("{}:{}", self.prefix, canonical)
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, StateError> {
        self.pool
            .get()
            .await
            .map_err(|e| StateError::Connection(e.to_string()))
    }

    fn now_ms() -> i64 {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl WindowCounter for RedisCounterStore {
    async fn check_and_record(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
    ) -> Result<WindowDecision, StateError> {
        let redis_key = self.redis_key(&key.canonical());
        let now_ms = Self::now_ms();
        let window_ms = millis(window);
        // Member uniqueness keeps simultaneous events from collapsing into
        // one sorted-set entry.
        let member = format!("{now_ms}-{}", Uuid::new_v4());

        let operation = async {
            let mut conn = self.conn().await?;
            let script = Script::new(scripts::WINDOW_CHECK_AND_RECORD);
            let count: i64 = script
                .key(&redis_key)
                .arg(now_ms)
                .arg(window_ms)
                .arg(&member)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| StateError::Backend(e.to_string()))?;
            Ok::<i64, StateError>(count)
        };

        let count = tokio::time::timeout(self.operation_timeout, operation)
            .await
            .map_err(|_| StateError::Timeout(self.operation_timeout))??;

        let count_before = u64::try_from(count).unwrap_or(0);
        Ok(decision_from_count(count_before, limit, window))
    }
}

#[async_trait]
impl QuotaCounter for RedisCounterStore {
    async fn increment_day(&self, key: &QuotaKey, ttl: Duration) -> Result<i64, StateError> {
        let redis_key = self.redis_key(&key.canonical());
        let ttl_ms = millis(ttl);

        let operation = async {
            let mut conn = self.conn().await?;
            let script = Script::new(scripts::QUOTA_INCREMENT);
            let value: i64 = script
                .key(&redis_key)
                .arg(ttl_ms)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| StateError::Backend(e.to_string()))?;
            Ok::<i64, StateError>(value)
        };

        tokio::time::timeout(self.operation_timeout, operation)
            .await
            .map_err(|_| StateError::Timeout(self.operation_timeout))?
    }
}

#[async_trait]
impl BackendProbe for RedisCounterStore {
    async fn probe(&self) -> Result<(), StateError> {
        let operation = async {
            let mut conn = self.conn().await?;
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| StateError::Backend(e.to_string()))?;
            Ok::<(), StateError>(())
        };

        tokio::time::timeout(self.operation_timeout, operation)
            .await
            .map_err(|_| StateError::Timeout(self.operation_timeout))?
    }
}
