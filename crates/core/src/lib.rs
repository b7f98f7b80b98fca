//! Domain types shared by every vitals crate.
//!
//! Has no internal dependencies: the store, cache, queue and HTTP layers all
//! build on the records, submissions and error enums defined here.

pub mod error;
pub mod types;
pub mod vitals;
