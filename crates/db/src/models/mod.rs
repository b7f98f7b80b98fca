//! Row types returned by the repositories.

pub mod job;
pub mod status;
pub mod vital;
