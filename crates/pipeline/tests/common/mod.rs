//! Shared harness: the full pipeline wired to in-memory backends.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vitals_cache::{MemoryCacheBackend, RecencyCache};
use vitals_core::error::StoreError;
use vitals_core::types::Timestamp;
use vitals_core::vitals::{VitalRecord, VitalSubmission};
use vitals_db::memory::MemoryVitalStore;
use vitals_db::store::VitalStore;
use vitals_queue::{JobOptions, MemoryJobQueue, QueueWorker, WorkerConfig};
use vitals_pipeline::{RecordProcessor, VitalsService};

/// [`MemoryVitalStore`] with failure injection and read counting.
pub struct TestStore {
    pub inner: MemoryVitalStore,
    failing_creates: AtomicUsize,
    failure: StoreError,
    pub reads: AtomicUsize,
}

impl TestStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryVitalStore::new(),
            failing_creates: AtomicUsize::new(0),
            failure: StoreError::Unknown("connection reset".into()),
            reads: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` creates with `failure`.
    pub fn fail_creates(mut self, count: usize, failure: StoreError) -> Self {
        self.failing_creates = AtomicUsize::new(count);
        self.failure = failure;
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VitalStore for TestStore {
    async fn create(&self, input: &VitalSubmission) -> Result<VitalRecord, StoreError> {
        let remaining = self
            .failing_creates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if remaining.is_ok() {
            return Err(self.failure.clone());
        }
        self.inner.create(input).await
    }

    async fn query_recent(
        &self,
        worker_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VitalRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.query_recent(worker_id, limit, offset).await
    }

    async fn query_range(
        &self,
        worker_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<VitalRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.query_range(worker_id, start, end).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

pub struct Harness {
    pub store: Arc<TestStore>,
    pub cache_backend: Arc<MemoryCacheBackend>,
    pub cache: RecencyCache,
    pub queue: Arc<MemoryJobQueue>,
    pub service: VitalsService,
    pub worker: QueueWorker,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(TestStore::new())
    }

    pub fn with_store(store: TestStore) -> Self {
        let store = Arc::new(store);
        let cache_backend = Arc::new(MemoryCacheBackend::new());
        let cache = RecencyCache::new(cache_backend.clone(), Duration::from_millis(250));
        let queue = Arc::new(MemoryJobQueue::new());

        let job_options = JobOptions {
            backoff: Duration::ZERO,
            ..JobOptions::default()
        };
        let service = VitalsService::new(store.clone(), cache.clone(), queue.clone(), job_options);
        let processor = Arc::new(RecordProcessor::new(store.clone(), cache.clone()));
        let worker = QueueWorker::new(queue.clone(), processor, WorkerConfig::default());

        Self {
            store,
            cache_backend,
            cache,
            queue,
            service,
            worker,
        }
    }

    /// Submit and fully process one reading.
    pub async fn ingest(&self, submission: VitalSubmission) {
        self.service.submit(submission).await.unwrap();
        self.worker.drain().await.unwrap();
    }
}

pub fn submission(worker_id: &str, heart_rate: f64, temperature: f64, at: Timestamp) -> VitalSubmission {
    VitalSubmission {
        worker_id: worker_id.to_string(),
        heart_rate,
        temperature,
        timestamp: Some(at),
    }
}
