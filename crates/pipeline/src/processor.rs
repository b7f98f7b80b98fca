use std::sync::Arc;

use async_trait::async_trait;
use vitals_cache::{RecencyCache, WriteOutcome};
use vitals_core::vitals::{VitalRecord, VitalSubmission};
use vitals_db::store::VitalStore;
use vitals_queue::{Job, JobError, JobHandler};

/// Persists one queued submission, then caches the stored record.
///
/// Store failures fail the job (retryable unless the store rejected the
/// input). Cache failures never do.
pub struct RecordProcessor {
    store: Arc<dyn VitalStore>,
    cache: RecencyCache,
}

impl RecordProcessor {
    pub fn new(store: Arc<dyn VitalStore>, cache: RecencyCache) -> Self {
        Self { store, cache }
    }

    pub async fn process(&self, submission: &VitalSubmission) -> Result<VitalRecord, JobError> {
        let record = self.store.create(submission).await.map_err(|e| JobError {
            message: e.to_string(),
            retryable: e.is_retryable(),
        })?;

        tracing::info!(
            worker_id = %record.worker_id,
            record_id = %record.id,
            "Vital record persisted",
        );

        if let WriteOutcome::Failed(_) = self.cache.add_worker_vital(&record.worker_id, &record).await {
            tracing::debug!(record_id = %record.id, "Continuing without cache population");
        }

        Ok(record)
    }
}

#[async_trait]
impl JobHandler for RecordProcessor {
    async fn handle(&self, job: &Job) -> Result<(), JobError> {
        let submission: VitalSubmission = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobError::permanent(format!("Invalid job payload: {e}")))?;
        let submission = submission
            .normalize()
            .map_err(|e| JobError::permanent(e.to_string()))?;

        self.process(&submission).await.map(|_| ())
    }
}
