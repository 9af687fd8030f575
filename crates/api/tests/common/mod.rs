#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use magpie_api::config::ServerConfig;
use magpie_api::routes;
use magpie_api::state::AppState;
use magpie_core::catalog::SharedCatalog;
use magpie_db::models::catalog::{BOARDS_MODE_ANY, BOARDS_MODE_ENUMERATED};
use magpie_db::repositories::CatalogRepo;
use magpie_events::EventBus;

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "X-MAGPIE-TEST-BOUNDARY";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev
/// default) and the system temp directory as the data path.
pub fn test_config(data_path: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        data_path,
        catalog_refresh_secs: 300,
    }
}

/// Seed the catalog the tests run against:
///
/// - `twitter` — unrestricted boards (`*`)
/// - `forum-x` — enumerated boards `general` and `news`
pub async fn seed_catalog(pool: &PgPool) {
    CatalogRepo::upsert_datasource(pool, "twitter", "Twitter", BOARDS_MODE_ANY)
        .await
        .unwrap();
    CatalogRepo::upsert_datasource(pool, "forum-x", "Forum X", BOARDS_MODE_ENUMERATED)
        .await
        .unwrap();
    CatalogRepo::upsert_board_stats(pool, "forum-x", "general", 120, None, None)
        .await
        .unwrap();
    CatalogRepo::upsert_board_stats(pool, "forum-x", "news", 45, None, None)
        .await
        .unwrap();
}

/// Build the full application router with all middleware layers, using
/// the given database pool and the system temp dir as the data path.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack (CORS, request ID, timeout,
/// tracing, panic recovery) that production uses. The catalog snapshot
/// is loaded from the pool, so seed the catalog first.
pub async fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_data(pool, std::env::temp_dir()).await
}

/// Like [`build_test_app`] but with an explicit data path, for tests
/// that read result files.
pub async fn build_test_app_with_data(pool: PgPool, data_path: PathBuf) -> Router {
    let config = test_config(data_path);
    let sources = CatalogRepo::load_sources(&pool).await.unwrap();

    let state = AppState {
        pool,
        config: Arc::new(config),
        catalog: SharedCatalog::new(sources),
        event_bus: Arc::new(EventBus::default()),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, path: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Encode form fields as a `multipart/form-data` body using [`BOUNDARY`].
pub fn multipart_body(fields: &[(&str, &str)]) -> Body {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{name}\"\r\n\
             \r\n\
             {value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Body::from(body)
}

/// POST a multipart form to the app.
pub async fn post_form(app: Router, path: &str, fields: &[(&str, &str)]) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart_body(fields))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
