//! Service boundary used by the HTTP layer.

use std::sync::Arc;

use serde::Serialize;
use vitals_cache::RecencyCache;
use vitals_core::error::{CoreError, QueueError, StoreError};
use vitals_core::types::{JobId, Timestamp};
use vitals_core::vitals::{VitalRecord, VitalSubmission};
use vitals_db::models::status::JobState;
use vitals_db::store::VitalStore;
use vitals_queue::{JobCounts, JobInfo, JobOptions, JobQueue, VITAL_RECORD_JOB};

use crate::orchestrator::ReadOrchestrator;

/// Errors surfaced to callers of [`VitalsService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Acknowledgement for an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub worker_id: String,
    pub job_id: JobId,
}

/// Reachability of each backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub store: bool,
    pub cache: bool,
    pub queue: bool,
}

impl HealthReport {
    /// The service can ingest and serve reads. The cache is optional.
    pub fn is_healthy(&self) -> bool {
        self.store && self.queue
    }
}

pub struct VitalsService {
    store: Arc<dyn VitalStore>,
    cache: RecencyCache,
    queue: Arc<dyn JobQueue>,
    reads: ReadOrchestrator,
    job_options: JobOptions,
}

impl VitalsService {
    pub fn new(
        store: Arc<dyn VitalStore>,
        cache: RecencyCache,
        queue: Arc<dyn JobQueue>,
        job_options: JobOptions,
    ) -> Self {
        let reads = ReadOrchestrator::new(Arc::clone(&store), cache.clone());
        Self {
            store,
            cache,
            queue,
            reads,
            job_options,
        }
    }

    /// Validate a submission and enqueue it for persistence.
    ///
    /// Returns as soon as the job is queued; the eventual outcome of the
    /// job is not reported back.
    pub async fn submit(&self, submission: VitalSubmission) -> Result<SubmitReceipt, ServiceError> {
        let submission = submission.normalize()?;
        let payload = serde_json::to_value(&submission).map_err(QueueError::from)?;

        let job_id = match self
            .queue
            .add(VITAL_RECORD_JOB, payload, &self.job_options)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(worker_id = %submission.worker_id, error = %e, "Failed to enqueue vital record");
                return Err(e.into());
            }
        };

        tracing::info!(worker_id = %submission.worker_id, job_id, "Vital record queued");
        Ok(SubmitReceipt {
            worker_id: submission.worker_id,
            job_id,
        })
    }

    pub async fn fetch_recent(&self, worker_id: &str) -> Result<Vec<VitalRecord>, ServiceError> {
        Ok(self.reads.get_recent_vitals(worker_id).await?)
    }

    pub async fn fetch_range(
        &self,
        worker_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<VitalRecord>, ServiceError> {
        Ok(self.reads.get_vitals_in_range(worker_id, start, end).await?)
    }

    pub async fn job_status(&self, job_id: JobId) -> Result<JobInfo, ServiceError> {
        self.queue.job(job_id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            }
            .into()
        })
    }

    pub async fn queue_stats(&self) -> Result<JobCounts, ServiceError> {
        Ok(self.queue.counts().await?)
    }

    /// Delete every completed and failed job. Returns how many were removed.
    pub async fn clear_queue(&self) -> Result<u64, ServiceError> {
        let completed = self.queue.clean(JobState::Completed).await?;
        let failed = self.queue.clean(JobState::Failed).await?;
        tracing::info!(completed, failed, "Queue cleared");
        Ok(completed + failed)
    }

    /// Stop workers from claiming jobs. Submissions are still accepted.
    pub async fn pause_queue(&self) -> Result<(), ServiceError> {
        self.queue.pause().await?;
        tracing::info!("Queue paused");
        Ok(())
    }

    pub async fn resume_queue(&self) -> Result<(), ServiceError> {
        self.queue.resume().await?;
        tracing::info!("Queue resumed");
        Ok(())
    }

    pub async fn queue_paused(&self) -> Result<bool, ServiceError> {
        Ok(self.queue.is_paused().await?)
    }

    pub async fn health(&self) -> HealthReport {
        let (store, cache, queue) =
            futures::join!(self.store.ping(), self.cache.ping(), self.queue.counts());

        HealthReport {
            store: store.is_ok(),
            cache: cache.is_ok(),
            queue: queue.is_ok(),
        }
    }
}
