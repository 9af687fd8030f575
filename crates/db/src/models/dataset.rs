//! Dataset entity model and DTOs for the request/queue lifecycle.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use magpie_core::types::{DbId, Timestamp};

use super::status::{DatasetStatus, StatusId};

/// A row from the `datasets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dataset {
    pub id: DbId,
    pub key: String,
    pub datasource: String,
    pub board: Option<String>,
    pub label: String,
    pub pseudonymise: bool,
    pub is_private: bool,
    pub parameters: serde_json::Value,
    pub status_id: StatusId,
    pub attempts: i32,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub heartbeat_at: Option<Timestamp>,
    pub result_file: Option<String>,
    pub num_rows: Option<i64>,
    pub error_message: Option<String>,
    pub progress_percent: i16,
    pub progress_message: Option<String>,
    pub submitted_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Dataset {
    /// The lifecycle status as an enum, if the raw ID is a known state.
    pub fn status(&self) -> Option<DatasetStatus> {
        DatasetStatus::from_id(self.status_id)
    }

    /// The lifecycle status name shown to polling clients.
    pub fn status_name(&self) -> &'static str {
        self.status().map(DatasetStatus::name).unwrap_or("unknown")
    }
}

/// Insert payload for a validated submission.
///
/// Built by the submission handler after catalog validation; everything
/// here is immutable once the row exists.
#[derive(Debug)]
pub struct NewDataset {
    pub key: String,
    pub datasource: String,
    pub board: Option<String>,
    pub label: String,
    pub pseudonymise: bool,
    pub is_private: bool,
    pub parameters: serde_json::Value,
    pub submitted_at: Timestamp,
}

/// Query parameters for `GET /api/v1/datasets`.
#[derive(Debug, Deserialize)]
pub struct DatasetListQuery {
    /// Filter by status ID (e.g. 1 = queued, 4 = failed).
    pub status_id: Option<StatusId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Compact row for the queue status panel: queued and processing
/// datasets in dispatch order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueuedDatasetView {
    pub key: String,
    pub datasource: String,
    pub board: Option<String>,
    pub label: String,
    pub status_id: StatusId,
    pub attempts: i32,
    pub progress_percent: i16,
    pub submitted_at: Timestamp,
}
