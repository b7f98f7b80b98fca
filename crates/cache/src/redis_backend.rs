//! Redis-backed [`CacheBackend`].
//!
//! Batches go through `MULTI/EXEC` pipelines so the insert and the trim
//! are applied together or not at all.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use vitals_core::error::CacheError;

use crate::backend::CacheBackend;

#[derive(Clone)]
pub struct RedisCacheBackend {
    conn: ConnectionManager,
}

impl RedisCacheBackend {
    /// Open a reconnecting connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(backend_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(backend_error)?;
        tracing::info!("Redis connection established");
        Ok(Self { conn })
    }
}

fn backend_error(err: redis::RedisError) -> CacheError {
    CacheError::Backend(err.to_string())
}

/// `ZREMRANGEBYRANK` stop index that keeps the top `keep` entries.
fn trim_stop(keep: usize) -> isize {
    -(keep as isize) - 1
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn add_and_trim(
        &self,
        key: &str,
        score: i64,
        member: &str,
        keep: usize,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .zadd(key, member, score)
            .ignore()
            .zremrangebyrank(key, 0, trim_stop(keep))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn replace(
        &self,
        key: &str,
        entries: &[(i64, String)],
        keep: usize,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .zadd_multiple(key, entries)
            .ignore()
            .zremrangebyrank(key, 0, trim_stop(keep))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn rev_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.zrevrange(key, start, stop)
            .await
            .map_err(backend_error)
    }

    async fn incr_field(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        conn.hincr(key, field, delta).await.map_err(backend_error)
    }

    async fn get_field(&self, key: &str, field: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.conn.clone();
        conn.hget(key, field).await.map_err(backend_error)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_stop_keeps_top_n() {
        assert_eq!(trim_stop(10), -11);
        assert_eq!(trim_stop(0), -1);
    }
}
