//! In-memory [`VitalStore`] for tests and local runs without PostgreSQL.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use vitals_core::error::StoreError;
use vitals_core::types::Timestamp;
use vitals_core::vitals::{VitalRecord, VitalSubmission};

use crate::store::VitalStore;

#[derive(Default)]
pub struct MemoryVitalStore {
    records: Mutex<Vec<VitalRecord>>,
}

impl MemoryVitalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted records across all workers.
    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<VitalRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unknown("memory store lock poisoned".to_string()))
    }

    /// Records for one worker, newest first. Equal timestamps fall back to
    /// the record ID, highest first.
    fn by_worker_desc(&self, worker_id: &str) -> Result<Vec<VitalRecord>, StoreError> {
        let records = self.lock()?;
        let mut matching: Vec<VitalRecord> = records
            .iter()
            .rev()
            .filter(|r| r.worker_id == worker_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        Ok(matching)
    }
}

#[async_trait]
impl VitalStore for MemoryVitalStore {
    async fn create(&self, input: &VitalSubmission) -> Result<VitalRecord, StoreError> {
        let record = VitalRecord {
            id: Uuid::now_v7(),
            worker_id: input.worker_id.clone(),
            heart_rate: input.heart_rate,
            temperature: input.temperature,
            timestamp: input.timestamp.unwrap_or_else(Utc::now),
        };
        self.lock()?.push(record.clone());
        Ok(record)
    }

    async fn query_recent(
        &self,
        worker_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VitalRecord>, StoreError> {
        Ok(self
            .by_worker_desc(worker_id)?
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn query_range(
        &self,
        worker_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<VitalRecord>, StoreError> {
        Ok(self
            .by_worker_desc(worker_id)?
            .into_iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
