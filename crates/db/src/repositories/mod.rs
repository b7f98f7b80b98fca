//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Callers choose the pool, so the
//! same repository serves both the primary and the read replicas.

pub mod job_repo;
pub mod vital_repo;

pub use job_repo::JobRepo;
pub use vital_repo::VitalRepo;
