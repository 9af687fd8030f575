//! Handler for the queue status panel.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use magpie_db::models::dataset::QueuedDatasetView;
use magpie_db::repositories::{DatasetRepo, WorkerRepo};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Assumed processing duration before any dataset has finished.
const DEFAULT_AVG_DURATION_SECS: f64 = 60.0;

/// Response for GET /queue.
#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub total_queued: i64,
    pub total_processing: i64,
    pub active_worker_slots: i64,
    pub estimated_wait_secs: Option<i64>,
    pub datasets: Vec<QueuedDatasetView>,
}

/// GET /api/v1/queue
///
/// Current queue state: counts, the queue in dispatch order, and an
/// estimated wait derived from recent average processing duration and
/// the number of online worker slots.
pub async fn get_queue_status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let datasets = DatasetRepo::list_queue(&state.pool).await?;
    let (total_queued, total_processing) = DatasetRepo::queue_counts(&state.pool).await?;
    let active_worker_slots = WorkerRepo::active_slots(&state.pool).await?;

    // Estimate wait: (queued datasets * avg duration) / online slots.
    let estimated_wait_secs = if total_queued > 0 {
        let avg = DatasetRepo::avg_duration_secs(&state.pool)
            .await?
            .unwrap_or(DEFAULT_AVG_DURATION_SECS);
        let slots = active_worker_slots.max(1) as f64;
        Some((total_queued as f64 * avg / slots).round() as i64)
    } else {
        None
    };

    let resp = QueueStatusResponse {
        total_queued,
        total_processing,
        active_worker_slots,
        estimated_wait_secs,
        datasets,
    };

    Ok(Json(DataResponse { data: resp }))
}
