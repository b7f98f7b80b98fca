//! Bounded per-worker recency cache.
//!
//! Nothing here returns an error to the caller. Writes report an advisory
//! [`WriteOutcome`], reads report a [`CacheLookup`], and every failure is
//! logged at the boundary where it happens.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use vitals_core::error::CacheError;
use vitals_core::vitals::{VitalRecord, MAX_PER_WORKER};

use crate::backend::CacheBackend;

/// Hash field holding the per-worker hit counter.
pub const HIT_COUNT_FIELD: &str = "cacheHitCount";

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// At least one record was cached for the requested window.
    Hit(Vec<VitalRecord>),
    /// Nothing cached for this worker (or for this window).
    Miss,
    /// The backend failed, timed out, or returned undecodable data.
    Error(CacheError),
}

/// Result of a cache write. Advisory only; callers log and move on.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Applied,
    /// Nothing to write.
    Skipped,
    Failed(CacheError),
}

pub fn vitals_key(worker_id: &str) -> String {
    format!("worker:{worker_id}:vitals")
}

pub fn stats_key(worker_id: &str) -> String {
    format!("worker:{worker_id}:stats")
}

/// Most recent [`MAX_PER_WORKER`] records per worker, scored by timestamp
/// in epoch milliseconds.
#[derive(Clone)]
pub struct RecencyCache {
    backend: Arc<dyn CacheBackend>,
    max_per_worker: usize,
    timeout: Duration,
}

impl RecencyCache {
    pub fn new(backend: Arc<dyn CacheBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            max_per_worker: MAX_PER_WORKER,
            timeout,
        }
    }

    /// Bound a backend call by the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    /// Insert one freshly persisted record and trim the worker's set.
    pub async fn add_worker_vital(&self, worker_id: &str, record: &VitalRecord) -> WriteOutcome {
        let outcome = match serde_json::to_string(record) {
            Ok(member) => self
                .bounded(self.backend.add_and_trim(
                    &vitals_key(worker_id),
                    record.score(),
                    &member,
                    self.max_per_worker,
                ))
                .await
                .map_or_else(WriteOutcome::Failed, |()| WriteOutcome::Applied),
            Err(e) => WriteOutcome::Failed(e.into()),
        };

        match &outcome {
            WriteOutcome::Failed(e) => {
                tracing::warn!(worker_id, error = %e, "Failed to add vital to cache");
            }
            _ => tracing::debug!(worker_id, record_id = %record.id, "Cached vital record"),
        }
        outcome
    }

    /// Read `limit` records starting at `offset`, newest first.
    ///
    /// An empty window is a [`CacheLookup::Miss`], so callers can never
    /// mistake "nothing cached" for "worker has no records".
    pub async fn get_worker_vitals(&self, worker_id: &str, limit: i64, offset: i64) -> CacheLookup {
        if limit <= 0 {
            return CacheLookup::Miss;
        }
        let start = isize::try_from(offset.max(0)).unwrap_or(isize::MAX);
        let len = isize::try_from(limit).unwrap_or(isize::MAX);
        let stop = start.saturating_add(len - 1);

        let members = match self
            .bounded(self.backend.rev_range(&vitals_key(worker_id), start, stop))
            .await
        {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(worker_id, error = %e, "Cache read failed");
                return CacheLookup::Error(e);
            }
        };

        if members.is_empty() {
            tracing::debug!(worker_id, "Cache miss");
            return CacheLookup::Miss;
        }

        let records: Result<Vec<VitalRecord>, _> = members
            .iter()
            .map(|member| serde_json::from_str::<VitalRecord>(member))
            .collect();
        let records = match records {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(worker_id, error = %e, "Cached vital record could not be decoded");
                return CacheLookup::Error(e.into());
            }
        };

        self.record_hit(worker_id);
        tracing::debug!(worker_id, count = records.len(), "Cache hit");
        CacheLookup::Hit(records)
    }

    /// Rebuild the worker's set from a store result.
    pub async fn set_worker_vitals(&self, worker_id: &str, records: &[VitalRecord]) -> WriteOutcome {
        if records.is_empty() {
            return WriteOutcome::Skipped;
        }

        let entries: Result<Vec<(i64, String)>, _> = records
            .iter()
            .map(|r| serde_json::to_string(r).map(|member| (r.score(), member)))
            .collect();

        let outcome = match entries {
            Ok(entries) => self
                .bounded(self.backend.replace(
                    &vitals_key(worker_id),
                    &entries,
                    self.max_per_worker,
                ))
                .await
                .map_or_else(WriteOutcome::Failed, |()| WriteOutcome::Applied),
            Err(e) => WriteOutcome::Failed(e.into()),
        };

        match &outcome {
            WriteOutcome::Failed(e) => {
                tracing::warn!(worker_id, error = %e, "Failed to repopulate cache");
            }
            _ => tracing::debug!(worker_id, count = records.len(), "Repopulated cache"),
        }
        outcome
    }

    /// Number of cache hits served for this worker. `None` if unknown.
    pub async fn hit_count(&self, worker_id: &str) -> Option<i64> {
        match self
            .bounded(self.backend.get_field(&stats_key(worker_id), HIT_COUNT_FIELD))
            .await
        {
            Ok(count) => Some(count.unwrap_or(0)),
            Err(e) => {
                tracing::debug!(worker_id, error = %e, "Hit counter unavailable");
                None
            }
        }
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.bounded(self.backend.ping()).await
    }

    /// Bump the hit counter in the background. Failures are ignored.
    fn record_hit(&self, worker_id: &str) {
        let backend = Arc::clone(&self.backend);
        let key = stats_key(worker_id);
        let timeout = self.timeout;
        let worker_id = worker_id.to_string();

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, backend.incr_field(&key, HIT_COUNT_FIELD, 1)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::debug!(worker_id = %worker_id, error = %e, "Failed to increment hit counter");
                }
                Err(_) => {
                    tracing::debug!(worker_id = %worker_id, "Hit counter update timed out");
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
