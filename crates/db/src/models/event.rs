//! Persisted lifecycle event payloads.

use magpie_core::types::Timestamp;

/// Insert payload for one event in the `events` table.
#[derive(Debug, Clone)]
pub struct InsertEvent {
    pub event_type: String,
    pub dataset_key: Option<String>,
    pub payload: serde_json::Value,
    pub occurred_at: Timestamp,
}
