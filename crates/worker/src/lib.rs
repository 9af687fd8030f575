//! Magpie worker library.
//!
//! The worker is the backend half of the dataset lifecycle: it claims
//! queued requests from the shared database, runs the matching processor,
//! and performs the single terminal transition per request. Exposed as a
//! library so integration tests can drive the claim/process/reap loops
//! directly.

pub mod config;
pub mod heartbeat;
pub mod reaper;
pub mod runner;
