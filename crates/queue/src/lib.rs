//! Durable, retrying job queue.
//!
//! Producers call [`JobQueue::add`]; a [`QueueWorker`] claims jobs, runs a
//! [`JobHandler`], and reports the outcome back to the queue, which applies
//! the retry policy and retention limits.
//!
//! A claim is a lease: a job left `active` longer than the stall timeout
//! (its worker died, or the outcome never reached the queue) is recovered
//! on a later claim, with the lost run counted as an attempt.

use std::time::Duration;

use async_trait::async_trait;
use vitals_core::error::QueueError;
use vitals_core::types::JobId;
use vitals_db::models::status::JobState;

pub mod job;
pub mod memory;
pub mod postgres;
pub mod retry;
pub mod worker;

pub use job::{Job, JobCounts, JobError, JobInfo, JobOptions, Priority};
pub use memory::MemoryJobQueue;
pub use postgres::PgJobQueue;
pub use worker::{JobHandler, QueueWorker, WorkerConfig};

/// Queue backing the ingest write path.
pub const VITALS_QUEUE: &str = "vital-records-queue";

/// Job name for one ingest submission.
pub const VITAL_RECORD_JOB: &str = "vital-record";

/// How long a claimed job may stay `active` before it is recovered.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure reason recorded on recovered jobs.
pub const STALLED_REASON: &str = "job stalled: no outcome reported before the stall timeout";

/// A named, durable job queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job. Fails with [`QueueError::Unavailable`] when the
    /// backend cannot accept it.
    async fn add(
        &self,
        name: &str,
        payload: serde_json::Value,
        options: &JobOptions,
    ) -> Result<JobId, QueueError>;

    /// Move the next claimable job to `active` and return it.
    ///
    /// Stalled jobs are recovered first. Returns `None` while paused.
    async fn claim(&self) -> Result<Option<Job>, QueueError>;

    /// Mark an active job completed and prune old completed jobs.
    async fn complete(&self, job_id: JobId) -> Result<(), QueueError>;

    /// Record a failed attempt. Returns the state the job moved to:
    /// `Waiting` when a retry is scheduled, `Failed` when terminal.
    async fn fail(&self, job_id: JobId, error: &JobError) -> Result<JobState, QueueError>;

    async fn job(&self, job_id: JobId) -> Result<Option<JobInfo>, QueueError>;

    async fn counts(&self) -> Result<JobCounts, QueueError>;

    /// Delete every job in `state`. Returns how many were removed.
    async fn clean(&self, state: JobState) -> Result<u64, QueueError>;

    /// Stop handing out jobs. Jobs can still be added.
    async fn pause(&self) -> Result<(), QueueError>;

    async fn resume(&self) -> Result<(), QueueError>;

    async fn is_paused(&self) -> Result<bool, QueueError>;
}

/// Queue configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub options: JobOptions,
    pub stall_timeout: Duration,
}

impl QueueConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default |
    /// |------------------------|---------|
    /// | `QUEUE_ATTEMPTS`       | `3`     |
    /// | `QUEUE_BACKOFF_MS`     | `2000`  |
    /// | `QUEUE_KEEP_COMPLETED` | `100`   |
    /// | `QUEUE_KEEP_FAILED`    | `50`    |
    /// | `QUEUE_STALLED_MS`     | `30000` |
    pub fn from_env() -> Self {
        let attempts: u32 = std::env::var("QUEUE_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("QUEUE_ATTEMPTS must be a valid u32");

        let backoff_ms: u64 = std::env::var("QUEUE_BACKOFF_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("QUEUE_BACKOFF_MS must be a valid u64");

        let remove_on_complete: usize = std::env::var("QUEUE_KEEP_COMPLETED")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("QUEUE_KEEP_COMPLETED must be a valid usize");

        let remove_on_fail: usize = std::env::var("QUEUE_KEEP_FAILED")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("QUEUE_KEEP_FAILED must be a valid usize");

        let stalled_ms: u64 = std::env::var("QUEUE_STALLED_MS")
            .unwrap_or_else(|_| "30000".into())
            .parse()
            .expect("QUEUE_STALLED_MS must be a valid u64");

        Self {
            options: JobOptions {
                priority: Priority::Normal,
                attempts,
                backoff: Duration::from_millis(backoff_ms),
                remove_on_complete,
                remove_on_fail,
            },
            stall_timeout: Duration::from_millis(stalled_ms),
        }
    }
}
