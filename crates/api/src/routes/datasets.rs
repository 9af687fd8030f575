//! Route definitions for the `/datasets` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::datasets;
use crate::state::AppState;

/// Routes mounted at `/datasets`.
///
/// ```text
/// GET    /                -> list_datasets
/// POST   /                -> submit_dataset
/// GET    /{key}           -> get_dataset
/// GET    /{key}/status    -> get_status
/// GET    /{key}/results   -> get_results
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(datasets::list_datasets).post(datasets::submit_dataset),
        )
        .route("/{key}", get(datasets::get_dataset))
        .route("/{key}/status", get(datasets::get_status))
        .route("/{key}/results", get(datasets::get_results))
}
