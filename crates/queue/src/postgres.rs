//! PostgreSQL-backed [`JobQueue`] over the `queue_jobs` table.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use vitals_core::error::QueueError;
use vitals_core::types::JobId;
use vitals_db::models::job::InsertJob;
use vitals_db::models::status::JobState;
use vitals_db::repositories::JobRepo;

use crate::job::{Job, JobCounts, JobError, JobInfo, JobOptions};
use crate::retry::{on_failure, FailureAction};
use crate::{JobQueue, DEFAULT_STALL_TIMEOUT, STALLED_REASON};

pub struct PgJobQueue {
    pool: PgPool,
    queue_name: String,
    stall_timeout: Duration,
}

impl PgJobQueue {
    pub fn new(pool: PgPool, queue_name: impl Into<String>) -> Self {
        Self {
            pool,
            queue_name: queue_name.into(),
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }

    /// Override how long a claimed job may stay `active` unreported.
    pub fn with_stall_timeout(mut self, stall_timeout: Duration) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    async fn recover_stalled(&self) -> Result<(), QueueError> {
        let recovered = JobRepo::recover_stalled(
            &self.pool,
            &self.queue_name,
            self.stall_timeout.as_millis() as i64,
            STALLED_REASON,
        )
        .await
        .map_err(unavailable)?;
        if recovered.is_empty() {
            return Ok(());
        }

        let failed = recovered
            .iter()
            .filter(|row| row.state_id == JobState::Failed.id())
            .count();
        tracing::warn!(
            queue = %self.queue_name,
            recovered = recovered.len(),
            failed,
            "Recovered stalled jobs",
        );

        if let Some(row) = recovered.iter().find(|row| row.state_id == JobState::Failed.id()) {
            JobRepo::prune(
                &self.pool,
                &self.queue_name,
                JobState::Failed,
                i64::from(row.remove_on_fail),
            )
            .await
            .map_err(unavailable)?;
        }
        Ok(())
    }
}

fn unavailable(err: sqlx::Error) -> QueueError {
    QueueError::Unavailable(err.to_string())
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn add(
        &self,
        name: &str,
        payload: serde_json::Value,
        options: &JobOptions,
    ) -> Result<JobId, QueueError> {
        let input = InsertJob {
            name: name.to_string(),
            payload,
            priority: options.priority.value(),
            max_attempts: options.attempts as i32,
            backoff_ms: options.backoff.as_millis() as i64,
            remove_on_complete: options.remove_on_complete as i32,
            remove_on_fail: options.remove_on_fail as i32,
        };
        let row = JobRepo::insert(&self.pool, &self.queue_name, &input)
            .await
            .map_err(unavailable)?;
        Ok(row.id)
    }

    async fn claim(&self) -> Result<Option<Job>, QueueError> {
        self.recover_stalled().await?;
        let row = JobRepo::claim_next(&self.pool, &self.queue_name)
            .await
            .map_err(unavailable)?;
        Ok(row.map(Job::from))
    }

    async fn complete(&self, job_id: JobId) -> Result<(), QueueError> {
        let row = JobRepo::complete(&self.pool, job_id)
            .await
            .map_err(unavailable)?
            .ok_or(QueueError::NotFound(job_id))?;

        JobRepo::prune(
            &self.pool,
            &self.queue_name,
            JobState::Completed,
            i64::from(row.remove_on_complete),
        )
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn fail(&self, job_id: JobId, error: &JobError) -> Result<JobState, QueueError> {
        let row = JobRepo::find_by_id(&self.pool, job_id)
            .await
            .map_err(unavailable)?
            .filter(|row| row.state_id == JobState::Active.id())
            .ok_or(QueueError::NotFound(job_id))?;

        let attempts_made = row.attempts_made + 1;
        let action = on_failure(
            attempts_made.max(0) as u32,
            row.max_attempts.max(0) as u32,
            Duration::from_millis(row.backoff_ms.max(0) as u64),
            error.retryable,
        );

        match action {
            FailureAction::Retry { delay } => {
                let moved = JobRepo::retry_later(
                    &self.pool,
                    job_id,
                    attempts_made,
                    delay.as_millis() as i64,
                    &error.message,
                )
                .await
                .map_err(unavailable)?;
                if !moved {
                    return Err(QueueError::NotFound(job_id));
                }
                Ok(JobState::Waiting)
            }
            FailureAction::Fail => {
                JobRepo::mark_failed(&self.pool, job_id, attempts_made, &error.message)
                    .await
                    .map_err(unavailable)?
                    .ok_or(QueueError::NotFound(job_id))?;
                JobRepo::prune(
                    &self.pool,
                    &self.queue_name,
                    JobState::Failed,
                    i64::from(row.remove_on_fail),
                )
                .await
                .map_err(unavailable)?;
                Ok(JobState::Failed)
            }
        }
    }

    async fn job(&self, job_id: JobId) -> Result<Option<JobInfo>, QueueError> {
        JobRepo::find_by_id(&self.pool, job_id)
            .await
            .map_err(unavailable)?
            .filter(|row| row.queue_name == self.queue_name)
            .map(JobInfo::try_from)
            .transpose()
    }

    async fn counts(&self) -> Result<JobCounts, QueueError> {
        let rows = JobRepo::count_by_state(&self.pool, &self.queue_name)
            .await
            .map_err(unavailable)?;

        let mut counts = JobCounts::default();
        for (state_id, count) in rows {
            if let Some(state) = JobState::from_id(state_id) {
                counts.add(state, count.max(0) as u64);
            }
        }
        Ok(counts)
    }

    async fn clean(&self, state: JobState) -> Result<u64, QueueError> {
        let removed = JobRepo::delete_in_state(&self.pool, &self.queue_name, state)
            .await
            .map_err(unavailable)?;
        tracing::info!(queue = %self.queue_name, state = state.as_str(), removed, "Queue cleaned");
        Ok(removed)
    }

    async fn pause(&self) -> Result<(), QueueError> {
        JobRepo::pause(&self.pool, &self.queue_name)
            .await
            .map_err(unavailable)?;
        tracing::info!(queue = %self.queue_name, "Queue paused");
        Ok(())
    }

    async fn resume(&self) -> Result<(), QueueError> {
        JobRepo::resume(&self.pool, &self.queue_name)
            .await
            .map_err(unavailable)?;
        tracing::info!(queue = %self.queue_name, "Queue resumed");
        Ok(())
    }

    async fn is_paused(&self) -> Result<bool, QueueError> {
        JobRepo::is_paused(&self.pool, &self.queue_name)
            .await
            .map_err(unavailable)
    }
}
