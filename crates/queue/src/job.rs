//! Job options, claimed jobs, and introspection views.

use std::time::Duration;

use serde::Serialize;
use vitals_core::types::{JobId, Timestamp};
use vitals_db::models::job::JobRow;
use vitals_db::models::status::JobState;

/// Scheduling tier. Lower values are claimed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High = 0,
    Normal = 1,
    Low = 2,
}

impl Priority {
    pub fn value(self) -> i32 {
        self as i32
    }
}

/// Per-job delivery and retention settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    pub priority: Priority,
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff: Duration,
    /// Completed jobs kept for inspection.
    pub remove_on_complete: usize,
    /// Terminally failed jobs kept for inspection.
    pub remove_on_fail: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            priority: Priority::Normal,
            attempts: 3,
            backoff: Duration::from_millis(2000),
            remove_on_complete: 100,
            remove_on_fail: 50,
        }
    }
}

/// A claimed job handed to a [`JobHandler`](crate::worker::JobHandler).
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub payload: serde_json::Value,
    /// Attempts that finished before this one.
    pub attempts_made: u32,
    pub max_attempts: u32,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            name: row.name,
            payload: row.payload,
            attempts_made: row.attempts_made.max(0) as u32,
            max_attempts: row.max_attempts.max(0) as u32,
        }
    }
}

/// Failure reported by a job handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct JobError {
    pub message: String,
    /// Whether another attempt may succeed.
    pub retryable: bool,
}

impl JobError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Read-only view of a job's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub id: JobId,
    pub name: String,
    pub state: JobState,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub failed_reason: Option<String>,
    pub created_at: Timestamp,
    pub processed_on: Option<Timestamp>,
    pub finished_on: Option<Timestamp>,
}

impl TryFrom<JobRow> for JobInfo {
    type Error = vitals_core::error::QueueError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let state = JobState::from_id(row.state_id).ok_or_else(|| {
            vitals_core::error::QueueError::Unavailable(format!(
                "job {} has unknown state id {}",
                row.id, row.state_id
            ))
        })?;
        Ok(JobInfo {
            id: row.id,
            name: row.name,
            state,
            attempts_made: row.attempts_made.max(0) as u32,
            max_attempts: row.max_attempts.max(0) as u32,
            failed_reason: row.failed_reason,
            created_at: row.created_at,
            processed_on: row.processed_on,
            finished_on: row.finished_on,
        })
    }
}

/// Number of jobs in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
}

impl JobCounts {
    /// Add `count` jobs in `state`, keeping `total` in step.
    pub fn add(&mut self, state: JobState, count: u64) {
        match state {
            JobState::Waiting => self.waiting += count,
            JobState::Active => self.active += count,
            JobState::Completed => self.completed += count,
            JobState::Failed => self.failed += count,
        }
        self.total += count;
    }
}
