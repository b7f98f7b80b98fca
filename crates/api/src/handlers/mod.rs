pub mod queue;
pub mod vitals;
