//! Worker registry rows.

use serde::Serialize;
use sqlx::FromRow;

use magpie_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `workers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkerRow {
    pub id: DbId,
    pub name: String,
    pub status_id: StatusId,
    pub pool_size: i32,
    pub started_at: Timestamp,
    pub heartbeat_at: Timestamp,
}
