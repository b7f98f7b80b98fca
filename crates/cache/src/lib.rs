//! Per-worker recency cache.
//!
//! [`RecencyCache`] keeps the most recent records of each worker in a
//! sorted set scored by timestamp. Storage is pluggable through
//! [`CacheBackend`]: Redis in production, an in-memory sorted set in tests.

pub mod backend;
pub mod memory;
pub mod recency;
pub mod redis_backend;

pub use backend::CacheBackend;
pub use memory::MemoryCacheBackend;
pub use recency::{CacheLookup, RecencyCache, WriteOutcome};
pub use redis_backend::RedisCacheBackend;

/// Cache configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis connection string (default: `redis://localhost:6379`).
    pub redis_url: String,
    /// Upper bound on any single cache call (default: `250`).
    pub timeout_ms: u64,
}

impl CacheConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var            | Default                  |
    /// |--------------------|--------------------------|
    /// | `REDIS_URL`        | `redis://localhost:6379` |
    /// | `CACHE_TIMEOUT_MS` | `250`                    |
    pub fn from_env() -> Self {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());

        let timeout_ms: u64 = std::env::var("CACHE_TIMEOUT_MS")
            .unwrap_or_else(|_| "250".into())
            .parse()
            .expect("CACHE_TIMEOUT_MS must be a valid u64");

        Self {
            redis_url,
            timeout_ms,
        }
    }
}
