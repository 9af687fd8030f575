//! Handler for the data-source catalog endpoint.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/datasources
///
/// The catalog as the submission form consumes it: per source, display
/// name and either `"*"` (unrestricted) or the enumerated boards with
/// their aggregate statistics. Includes the snapshot version so clients
/// can tell when the catalog changed under them.
pub async fn get_catalog(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let snapshot = state.catalog.snapshot();
    Ok(Json(DataResponse {
        data: snapshot.as_ref(),
    })
    .into_response())
}
