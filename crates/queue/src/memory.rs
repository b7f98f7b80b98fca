//! In-process [`JobQueue`] with the same state machine as the PostgreSQL
//! queue. Claims are serialized by a mutex.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use vitals_core::error::QueueError;
use vitals_core::types::{JobId, Timestamp};
use vitals_db::models::status::JobState;

use crate::job::{Job, JobCounts, JobError, JobInfo, JobOptions};
use crate::retry::{on_failure, FailureAction};
use crate::{JobQueue, DEFAULT_STALL_TIMEOUT, STALLED_REASON};

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    payload: serde_json::Value,
    options: JobOptions,
    state: JobState,
    attempts_made: u32,
    available_at: Instant,
    /// When the current run was claimed. Set while `active`.
    claimed_at: Option<Instant>,
    failed_reason: Option<String>,
    created_at: Timestamp,
    processed_on: Option<Timestamp>,
    finished_on: Option<Timestamp>,
    /// Order in which jobs reached a terminal state.
    finished_seq: u64,
}

#[derive(Default)]
struct State {
    next_id: JobId,
    finished_seq: u64,
    paused: bool,
    jobs: BTreeMap<JobId, Entry>,
}

pub struct MemoryJobQueue {
    state: Mutex<State>,
    unavailable: AtomicBool,
    stall_timeout: Duration,
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            unavailable: AtomicBool::new(false),
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }

    /// Override how long a claimed job may stay `active` unreported.
    pub fn with_stall_timeout(mut self, stall_timeout: Duration) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    /// Make every subsequent call fail with [`QueueError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, QueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("queue backend unreachable".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| QueueError::Unavailable("memory queue lock poisoned".to_string()))
    }
}

impl State {
    fn active_mut(&mut self, job_id: JobId) -> Result<&mut Entry, QueueError> {
        match self.jobs.get_mut(&job_id) {
            Some(entry) if entry.state == JobState::Active => Ok(entry),
            _ => Err(QueueError::NotFound(job_id)),
        }
    }

    fn finish(&mut self, job_id: JobId, state: JobState) {
        self.finished_seq += 1;
        let seq = self.finished_seq;
        if let Some(entry) = self.jobs.get_mut(&job_id) {
            entry.state = state;
            entry.finished_on = Some(Utc::now());
            entry.finished_seq = seq;
        }
    }

    /// Requeue or fail every active job whose claim is older than
    /// `stall_timeout`. Returns how many were recovered.
    fn recover_stalled(&mut self, now: Instant, stall_timeout: Duration) -> usize {
        let stalled: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|(_, e)| {
                e.state == JobState::Active
                    && e.claimed_at
                        .is_some_and(|at| now.saturating_duration_since(at) >= stall_timeout)
            })
            .map(|(id, _)| *id)
            .collect();

        for &id in &stalled {
            let Some(entry) = self.jobs.get_mut(&id) else {
                continue;
            };
            entry.attempts_made += 1;
            entry.claimed_at = None;
            entry.failed_reason = Some(STALLED_REASON.to_string());

            if entry.attempts_made >= entry.options.attempts {
                let keep = entry.options.remove_on_fail;
                self.finish(id, JobState::Failed);
                self.prune(JobState::Failed, keep);
            } else {
                entry.state = JobState::Waiting;
                entry.available_at = now;
            }
        }
        stalled.len()
    }

    /// Keep only the `keep` most recently finished jobs in `state`.
    fn prune(&mut self, state: JobState, keep: usize) {
        let mut finished: Vec<(u64, JobId)> = self
            .jobs
            .iter()
            .filter(|(_, e)| e.state == state)
            .map(|(id, e)| (e.finished_seq, *id))
            .collect();
        if finished.len() <= keep {
            return;
        }
        finished.sort_unstable_by(|a, b| b.cmp(a));
        for (_, id) in finished.into_iter().skip(keep) {
            self.jobs.remove(&id);
        }
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn add(
        &self,
        name: &str,
        payload: serde_json::Value,
        options: &JobOptions,
    ) -> Result<JobId, QueueError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let id = state.next_id;
        state.jobs.insert(
            id,
            Entry {
                name: name.to_string(),
                payload,
                options: options.clone(),
                state: JobState::Waiting,
                attempts_made: 0,
                available_at: Instant::now(),
                claimed_at: None,
                failed_reason: None,
                created_at: Utc::now(),
                processed_on: None,
                finished_on: None,
                finished_seq: 0,
            },
        );
        Ok(id)
    }

    async fn claim(&self) -> Result<Option<Job>, QueueError> {
        let mut state = self.lock()?;
        let now = Instant::now();

        let recovered = state.recover_stalled(now, self.stall_timeout);
        if recovered > 0 {
            tracing::warn!(recovered, "Recovered stalled jobs");
        }
        if state.paused {
            return Ok(None);
        }

        let next = state
            .jobs
            .iter()
            .filter(|(_, e)| e.state == JobState::Waiting && e.available_at <= now)
            .min_by_key(|(id, e)| (e.options.priority, **id))
            .map(|(id, _)| *id);

        let Some(id) = next else {
            return Ok(None);
        };
        let Some(entry) = state.jobs.get_mut(&id) else {
            return Ok(None);
        };
        entry.state = JobState::Active;
        entry.claimed_at = Some(now);
        entry.processed_on = Some(Utc::now());

        Ok(Some(Job {
            id,
            name: entry.name.clone(),
            payload: entry.payload.clone(),
            attempts_made: entry.attempts_made,
            max_attempts: entry.options.attempts,
        }))
    }

    async fn complete(&self, job_id: JobId) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        let entry = state.active_mut(job_id)?;
        entry.attempts_made += 1;
        let keep = entry.options.remove_on_complete;
        state.finish(job_id, JobState::Completed);
        state.prune(JobState::Completed, keep);
        Ok(())
    }

    async fn fail(&self, job_id: JobId, error: &JobError) -> Result<JobState, QueueError> {
        let mut state = self.lock()?;
        let entry = state.active_mut(job_id)?;
        entry.attempts_made += 1;
        entry.failed_reason = Some(error.message.clone());

        match on_failure(
            entry.attempts_made,
            entry.options.attempts,
            entry.options.backoff,
            error.retryable,
        ) {
            FailureAction::Retry { delay } => {
                entry.state = JobState::Waiting;
                let now = Instant::now();
                entry.available_at = now.checked_add(delay).unwrap_or(now);
                Ok(JobState::Waiting)
            }
            FailureAction::Fail => {
                let keep = entry.options.remove_on_fail;
                state.finish(job_id, JobState::Failed);
                state.prune(JobState::Failed, keep);
                Ok(JobState::Failed)
            }
        }
    }

    async fn job(&self, job_id: JobId) -> Result<Option<JobInfo>, QueueError> {
        let state = self.lock()?;
        Ok(state.jobs.get(&job_id).map(|e| JobInfo {
            id: job_id,
            name: e.name.clone(),
            state: e.state,
            attempts_made: e.attempts_made,
            max_attempts: e.options.attempts,
            failed_reason: e.failed_reason.clone(),
            created_at: e.created_at,
            processed_on: e.processed_on,
            finished_on: e.finished_on,
        }))
    }

    async fn counts(&self) -> Result<JobCounts, QueueError> {
        let state = self.lock()?;
        let mut counts = JobCounts::default();
        for entry in state.jobs.values() {
            counts.add(entry.state, 1);
        }
        Ok(counts)
    }

    async fn clean(&self, target: JobState) -> Result<u64, QueueError> {
        let mut state = self.lock()?;
        let before = state.jobs.len();
        state.jobs.retain(|_, e| e.state != target);
        Ok((before - state.jobs.len()) as u64)
    }

    async fn pause(&self) -> Result<(), QueueError> {
        self.lock()?.paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), QueueError> {
        self.lock()?.paused = false;
        Ok(())
    }

    async fn is_paused(&self) -> Result<bool, QueueError> {
        Ok(self.lock()?.paused)
    }
}
