//! Integration tests for dataset submission: validation against the
//! catalog, key assignment, and the no-partial-state guarantee.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_form, seed_catalog};
use sqlx::PgPool;

/// Number of dataset rows currently in the database.
async fn dataset_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM datasets")
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Valid submissions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn unrestricted_source_submission_succeeds(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;

    let response = post_form(
        app,
        "/api/v1/datasets",
        &[
            ("datasource", "twitter"),
            ("label", ""),
            ("pseudonymise", "on"),
            ("make-private", ""),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["key"].as_str().unwrap().len(), 64);
    assert_eq!(data["status_id"], 1);
    assert_eq!(data["datasource"], "twitter");
    assert!(data["board"].is_null());
    assert_eq!(data["pseudonymise"], true);
    assert_eq!(data["is_private"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn repeated_submissions_yield_unique_keys(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;

    let first = body_json(
        post_form(
            app.clone(),
            "/api/v1/datasets",
            &[("datasource", "twitter")],
        )
        .await,
    )
    .await;
    let second = body_json(
        post_form(app, "/api/v1/datasets", &[("datasource", "twitter")]).await,
    )
    .await;

    let first_key = first["data"]["key"].as_str().unwrap();
    let second_key = second["data"]["key"].as_str().unwrap();
    assert_ne!(first_key, second_key);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn enumerated_source_accepts_listed_board(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;

    let response = post_form(
        app,
        "/api/v1/datasets",
        &[("datasource", "forum-x"), ("board", "general")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["board"], "general");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn blank_label_gets_generated_default(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;

    let response = post_form(
        app,
        "/api/v1/datasets",
        &[
            ("datasource", "forum-x"),
            ("board", "news"),
            ("label", "   "),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let label = json["data"]["label"].as_str().unwrap();
    assert!(
        label.starts_with("forum-x/news "),
        "expected generated label, got: {label}"
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn user_label_is_kept(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;

    let response = post_form(
        app,
        "/api/v1/datasets",
        &[("datasource", "twitter"), ("label", "my research corpus")],
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["label"], "my research corpus");
}

// ---------------------------------------------------------------------------
// Validation failures — rejected before anything is enqueued
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_datasource_is_rejected(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool.clone()).await;

    let response = post_form(
        app,
        "/api/v1/datasets",
        &[("datasource", "does-not-exist")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    assert_eq!(dataset_count(&pool).await, 0, "no partial state on rejection");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unlisted_board_is_rejected(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool.clone()).await;

    let response = post_form(
        app,
        "/api/v1/datasets",
        &[("datasource", "forum-x"), ("board", "off-topic")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    assert_eq!(dataset_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn enumerated_source_requires_a_board(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool.clone()).await;

    let response = post_form(app, "/api/v1/datasets", &[("datasource", "forum-x")]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(dataset_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn malformed_multipart_body_is_rejected(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool.clone()).await;

    // Declares a multipart boundary the body never uses.
    let request = axum::http::Request::builder()
        .method(axum::http::Method::POST)
        .uri("/api/v1/datasets")
        .header(
            axum::http::header::CONTENT_TYPE,
            "multipart/form-data; boundary=missing",
        )
        .body(axum::body::Body::from("this is not a multipart body"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(dataset_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_datasource_field_is_rejected(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool.clone()).await;

    let response = post_form(app, "/api/v1/datasets", &[("label", "no source")]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");

    assert_eq!(dataset_count(&pool).await, 0);
}

// ---------------------------------------------------------------------------
// Privacy flag
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn private_datasets_are_excluded_from_the_listing(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;

    let public = body_json(
        post_form(
            app.clone(),
            "/api/v1/datasets",
            &[("datasource", "twitter"), ("label", "public one")],
        )
        .await,
    )
    .await;
    let private = body_json(
        post_form(
            app.clone(),
            "/api/v1/datasets",
            &[
                ("datasource", "twitter"),
                ("label", "private one"),
                ("make-private", "on"),
            ],
        )
        .await,
    )
    .await;
    assert_eq!(private["data"]["is_private"], true);

    let listing = body_json(get(app.clone(), "/api/v1/datasets").await).await;
    let keys: Vec<&str> = listing["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["key"].as_str().unwrap())
        .collect();

    assert!(keys.contains(&public["data"]["key"].as_str().unwrap()));
    assert!(!keys.contains(&private["data"]["key"].as_str().unwrap()));

    // The private dataset is still reachable directly by its key.
    let direct = get(
        app,
        &format!("/api/v1/datasets/{}", private["data"]["key"].as_str().unwrap()),
    )
    .await;
    assert_eq!(direct.status(), StatusCode::OK);
}
