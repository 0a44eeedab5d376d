//! Market data store access layer
//!
//! All reads and writes against the four store tables go through these
//! modules; no other component touches the tables directly.

pub mod listings;
pub mod run_log;
pub mod specifications;
pub mod valuations;
