//! Durable store adapter for vital records.
//!
//! [`VitalStore`] is the contract the pipeline depends on. [`PgVitalStore`]
//! writes to the primary pool and spreads reads across the replicas;
//! [`MemoryVitalStore`](crate::memory::MemoryVitalStore) backs tests.

use async_trait::async_trait;
use vitals_core::error::StoreError;
use vitals_core::types::Timestamp;
use vitals_core::vitals::{VitalRecord, VitalSubmission};

use crate::repositories::VitalRepo;
use crate::{DbPool, ReplicaSet};

/// Create and query vital records.
#[async_trait]
pub trait VitalStore: Send + Sync {
    /// Persist a submission against the write target.
    async fn create(&self, input: &VitalSubmission) -> Result<VitalRecord, StoreError>;

    /// Records for `worker_id`, newest first.
    async fn query_recent(
        &self,
        worker_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VitalRecord>, StoreError>;

    /// Records with `start <= timestamp <= end`, newest first. An inverted
    /// range returns an empty list.
    async fn query_range(
        &self,
        worker_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<VitalRecord>, StoreError>;

    /// Whether the write target is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// PostgreSQL-backed store over a primary and its read replicas.
pub struct PgVitalStore {
    pools: ReplicaSet<DbPool>,
}

impl PgVitalStore {
    pub fn new(pools: ReplicaSet<DbPool>) -> Self {
        Self { pools }
    }

    /// The write pool. Also used for migrations and the job queue.
    pub fn primary(&self) -> &DbPool {
        self.pools.primary()
    }
}

#[async_trait]
impl VitalStore for PgVitalStore {
    async fn create(&self, input: &VitalSubmission) -> Result<VitalRecord, StoreError> {
        let row = VitalRepo::create(self.pools.primary(), input)
            .await
            .map_err(classify)?;
        Ok(row.into())
    }

    async fn query_recent(
        &self,
        worker_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VitalRecord>, StoreError> {
        let rows = VitalRepo::find_recent_by_worker(self.pools.read(), worker_id, limit, offset)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn query_range(
        &self,
        worker_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<VitalRecord>, StoreError> {
        let rows = VitalRepo::find_by_worker_in_range(self.pools.read(), worker_id, start, end)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(self.pools.primary())
            .await
            .map_err(classify)
    }
}

/// Map a driver error onto the store taxonomy.
///
/// SQLSTATE class `23` (integrity constraint violation) is a known,
/// non-retryable rejection. Class `08` (connection exception) and `57P`
/// (operator intervention, e.g. shutdown) count as connectivity failures.
pub fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
            if code.starts_with("23") {
                StoreError::Known {
                    code,
                    message: db_err.message().to_string(),
                }
            } else if code.starts_with("08") || code.starts_with("57P") {
                StoreError::Connectivity(err.to_string())
            } else {
                StoreError::Unknown(err.to_string())
            }
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Connectivity(err.to_string()),
        _ => StoreError::Unknown(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn pool_errors_are_connectivity() {
        assert_matches!(
            classify(sqlx::Error::PoolTimedOut),
            StoreError::Connectivity(_)
        );
        assert_matches!(classify(sqlx::Error::PoolClosed), StoreError::Connectivity(_));
    }

    #[test]
    fn io_errors_are_connectivity() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_matches!(classify(sqlx::Error::Io(io)), StoreError::Connectivity(_));
    }

    #[test]
    fn missing_rows_are_unknown() {
        let err = classify(sqlx::Error::RowNotFound);
        assert_matches!(err, StoreError::Unknown(_));
        assert!(err.is_retryable());
    }
}
