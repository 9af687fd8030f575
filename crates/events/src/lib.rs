//! Magpie lifecycle event infrastructure.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`LifecycleEvent`] — the canonical dataset event envelope.
//! - [`EventPersistence`] — background service that durably writes every
//!   event to the `events` table.
//!
//! The API server and the worker each run their own bus and persistence
//! task; the shared `events` table is the cross-process record.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, LifecycleEvent};
pub use persistence::EventPersistence;
