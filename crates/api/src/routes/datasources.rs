//! Route definitions for the `/datasources` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::datasources;
use crate::state::AppState;

/// Routes mounted at `/datasources`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(datasources::get_catalog))
}
