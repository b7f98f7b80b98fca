//! Ingest and read paths for worker vitals.
//!
//! - [`RecordProcessor`]: queue consumer that persists a submission and
//!   then populates the recency cache.
//! - [`ReadOrchestrator`]: cache-first reads with store fallback.
//! - [`VitalsService`]: the boundary used by the HTTP layer.

pub mod backends;
pub mod orchestrator;
pub mod processor;
pub mod service;

pub use backends::Backends;
pub use orchestrator::ReadOrchestrator;
pub use processor::RecordProcessor;
pub use service::{HealthReport, ServiceError, SubmitReceipt, VitalsService};
