use std::sync::Arc;

use vitals_cache::{CacheLookup, RecencyCache};
use vitals_core::error::StoreError;
use vitals_core::types::Timestamp;
use vitals_core::vitals::{VitalRecord, DEFAULT_LIMIT, DEFAULT_OFFSET};
use vitals_db::store::VitalStore;

/// Cache-first reads. Only a store failure reaches the caller.
pub struct ReadOrchestrator {
    store: Arc<dyn VitalStore>,
    cache: RecencyCache,
}

impl ReadOrchestrator {
    pub fn new(store: Arc<dyn VitalStore>, cache: RecencyCache) -> Self {
        Self { store, cache }
    }

    /// The worker's most recent records, newest first.
    ///
    /// A cache hit is returned as-is. On a miss or cache error the store is
    /// queried and its result written back to the cache best-effort.
    pub async fn get_recent_vitals(&self, worker_id: &str) -> Result<Vec<VitalRecord>, StoreError> {
        match self
            .cache
            .get_worker_vitals(worker_id, DEFAULT_LIMIT, DEFAULT_OFFSET)
            .await
        {
            CacheLookup::Hit(records) => return Ok(records),
            CacheLookup::Miss => {}
            CacheLookup::Error(e) => {
                tracing::warn!(worker_id, error = %e, "Cache unavailable, reading from store");
            }
        }

        let records = self
            .store
            .query_recent(worker_id, DEFAULT_LIMIT, DEFAULT_OFFSET)
            .await?;

        // Advisory; the outcome is logged by the cache.
        self.cache.set_worker_vitals(worker_id, &records).await;

        Ok(records)
    }

    /// Records in `[start, end]`, newest first. Not cached.
    pub async fn get_vitals_in_range(
        &self,
        worker_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<VitalRecord>, StoreError> {
        self.store.query_range(worker_id, start, end).await
    }
}
