pub mod datasets;
pub mod datasources;
pub mod health;
pub mod queue;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /datasets                       list, submit (GET, POST multipart)
/// /datasets/{key}                 full record (GET)
/// /datasets/{key}/status          lifecycle status for polling (GET)
/// /datasets/{key}/results         page through results (GET)
///
/// /datasources                    catalog for the submission form (GET)
///
/// /queue                          queue counts and wait estimate (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/datasets", datasets::router())
        .nest("/datasources", datasources::router())
        .nest("/queue", queue::router())
}
