//! Queue consumer.
//!
//! Runs a fixed number of slots. Each slot claims one job at a time, hands
//! it to the [`JobHandler`], and reports the outcome back to the queue.
//! Cancellation is only observed between jobs, so in-flight jobs finish.
//! If the outcome cannot be reported, the job stays `active` until the
//! queue recovers it after its stall timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vitals_core::error::QueueError;
use vitals_db::models::status::JobState;

use crate::job::{Job, JobError};
use crate::JobQueue;

/// Processes one claimed job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), JobError>;
}

/// Worker pool settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    /// Idle wait between polls when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl WorkerConfig {
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `WORKER_CONCURRENCY`      | `4`     |
    /// | `WORKER_POLL_INTERVAL_MS` | `500`   |
    pub fn from_env() -> Self {
        let concurrency: usize = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_CONCURRENCY must be a valid usize");

        let poll_interval_ms: u64 = std::env::var("WORKER_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("WORKER_POLL_INTERVAL_MS must be a valid u64");

        Self {
            concurrency: concurrency.max(1),
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }
}

pub struct QueueWorker {
    queue: Arc<dyn JobQueue>,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
}

impl QueueWorker {
    pub fn new(queue: Arc<dyn JobQueue>, handler: Arc<dyn JobHandler>, config: WorkerConfig) -> Self {
        Self {
            queue,
            handler,
            config,
        }
    }

    /// Run every slot until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            concurrency = self.config.concurrency,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Queue worker started",
        );

        let slots = (0..self.config.concurrency.max(1)).map(|slot| self.run_slot(slot, cancel.clone()));
        futures::future::join_all(slots).await;

        tracing::info!("Queue worker stopped");
    }

    async fn run_slot(&self, slot: usize, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            match self.process_next().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => tracing::error!(slot, error = %e, "Queue poll failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Claim and process a single job. Returns `false` when nothing was
    /// claimable.
    pub async fn process_next(&self) -> Result<bool, QueueError> {
        let Some(job) = self.queue.claim().await? else {
            return Ok(false);
        };
        let attempt = job.attempts_made + 1;

        match self.handler.handle(&job).await {
            Ok(()) => {
                self.queue.complete(job.id).await?;
                tracing::debug!(job_id = job.id, attempt, "Job completed");
            }
            Err(e) => match self.queue.fail(job.id, &e).await? {
                JobState::Waiting => tracing::warn!(
                    job_id = job.id,
                    attempt,
                    max_attempts = job.max_attempts,
                    error = %e,
                    "Job failed, retry scheduled",
                ),
                _ => tracing::error!(
                    job_id = job.id,
                    attempt,
                    retryable = e.retryable,
                    error = %e,
                    "Job failed permanently",
                ),
            },
        }
        Ok(true)
    }

    /// Process jobs until none is claimable. Returns how many ran.
    pub async fn drain(&self) -> Result<usize, QueueError> {
        let mut processed = 0;
        while self.process_next().await? {
            processed += 1;
        }
        Ok(processed)
    }
}
