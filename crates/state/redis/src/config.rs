use std::time::Duration;

/// Configuration for the Redis counter-store backend.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,

    /// Key prefix applied to every Redis key to avoid collisions.
    pub prefix: String,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,

    /// Timeout for one counting round trip. Kept sub-second so a stalled
    /// backend cannot stall the request path it protects.
    pub operation_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::from("tollgate"),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_millis(250),
        }
    }
}
