//! Production wiring shared by the API server and the worker.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use vitals_cache::{CacheConfig, RecencyCache, RedisCacheBackend};
use vitals_db::store::PgVitalStore;
use vitals_db::DbConfig;
use vitals_queue::{PgJobQueue, QueueConfig, VITALS_QUEUE};

/// Connected PostgreSQL store, Redis cache, and PostgreSQL job queue.
pub struct Backends {
    pub store: Arc<PgVitalStore>,
    pub cache: RecencyCache,
    pub queue: Arc<PgJobQueue>,
}

impl Backends {
    /// Connect every backend and apply pending migrations on the primary.
    pub async fn connect(
        db: &DbConfig,
        cache: &CacheConfig,
        queue: &QueueConfig,
    ) -> anyhow::Result<Self> {
        let pools = vitals_db::connect(db)
            .await
            .context("Failed to connect to database")?;

        for pool in pools.all() {
            vitals_db::health_check(pool)
                .await
                .context("Database health check failed")?;
        }
        tracing::info!("Database health check passed");

        vitals_db::run_migrations(pools.primary())
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations applied");

        let queue = Arc::new(
            PgJobQueue::new(pools.primary().clone(), VITALS_QUEUE)
                .with_stall_timeout(queue.stall_timeout),
        );
        let store = Arc::new(PgVitalStore::new(pools));

        let redis = RedisCacheBackend::connect(&cache.redis_url)
            .await
            .context("Failed to connect to Redis")?;
        let cache = RecencyCache::new(Arc::new(redis), Duration::from_millis(cache.timeout_ms));

        Ok(Self {
            store,
            cache,
            queue,
        })
    }
}
