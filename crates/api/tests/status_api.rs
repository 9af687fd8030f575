//! Integration tests for status polling and result access.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_form, seed_catalog};
use sqlx::PgPool;

use magpie_db::repositories::DatasetRepo;

/// Submit a dataset for `twitter` and return its key.
async fn submit_one(app: axum::Router) -> String {
    let json = body_json(
        post_form(app, "/api/v1/datasets", &[("datasource", "twitter")]).await,
    )
    .await;
    json["data"]["key"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Unknown keys
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn polling_an_unknown_key_is_not_found(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;

    let response = get(app, "/api/v1/datasets/no-such-key/status").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Lifecycle states as seen by polling
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn fresh_submission_polls_as_queued(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;
    let key = submit_one(app.clone()).await;

    let json = body_json(get(app, &format!("/api/v1/datasets/{key}/status")).await).await;
    let data = &json["data"];

    assert_eq!(data["status"], "queued");
    assert!(data["results_url"].is_null());
    assert!(data["error"].is_null());
    assert_eq!(data["progress_percent"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn claimed_dataset_polls_as_processing(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool.clone()).await;
    let key = submit_one(app.clone()).await;

    let claimed = DatasetRepo::claim_next(&pool, "test-worker").await.unwrap();
    assert_eq!(claimed.unwrap().key, key);

    let json = body_json(get(app, &format!("/api/v1/datasets/{key}/status")).await).await;
    assert_eq!(json["data"]["status"], "processing");
    assert!(json["data"]["results_url"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn finished_dataset_reports_results_reference(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool.clone()).await;
    let key = submit_one(app.clone()).await;

    DatasetRepo::claim_next(&pool, "test-worker").await.unwrap();
    let published = DatasetRepo::finish(&pool, &key, &format!("{key}.ndjson"), 42)
        .await
        .unwrap();
    assert!(published);

    let json = body_json(get(app, &format!("/api/v1/datasets/{key}/status")).await).await;
    let data = &json["data"];

    assert_eq!(data["status"], "finished");
    assert_eq!(data["num_rows"], 42);
    assert_eq!(
        data["results_url"],
        format!("/api/v1/datasets/{key}/results")
    );
    assert_eq!(data["progress_percent"], 100);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_dataset_reports_the_retained_reason(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool.clone()).await;
    let key = submit_one(app.clone()).await;

    DatasetRepo::claim_next(&pool, "test-worker").await.unwrap();
    DatasetRepo::fail(&pool, &key, "upstream capture failed")
        .await
        .unwrap();

    let json = body_json(get(app, &format!("/api/v1/datasets/{key}/status")).await).await;
    let data = &json["data"];

    assert_eq!(data["status"], "failed");
    assert_eq!(data["error"], "upstream capture failed");
    assert!(data["results_url"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn polling_does_not_mutate_the_dataset(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;
    let key = submit_one(app.clone()).await;

    let first = body_json(get(app.clone(), &format!("/api/v1/datasets/{key}")).await).await;
    for _ in 0..3 {
        get(app.clone(), &format!("/api/v1/datasets/{key}/status")).await;
    }
    let second = body_json(get(app, &format!("/api/v1/datasets/{key}")).await).await;

    assert_eq!(first["data"]["updated_at"], second["data"]["updated_at"]);
    assert_eq!(first["data"]["status_id"], second["data"]["status_id"]);
}

// ---------------------------------------------------------------------------
// Results access
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn results_of_an_unfinished_dataset_conflict(pool: PgPool) {
    seed_catalog(&pool).await;
    let app = common::build_test_app(pool).await;
    let key = submit_one(app.clone()).await;

    let response = get(app, &format!("/api/v1/datasets/{key}/results")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn results_page_through_the_ndjson_file(pool: PgPool) {
    seed_catalog(&pool).await;
    let data_dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app_with_data(pool.clone(), data_dir.path().to_path_buf()).await;
    let key = submit_one(app.clone()).await;

    // Produce a result file the way the worker would.
    let file_name = format!("{key}.ndjson");
    let mut content = String::new();
    for i in 0..5 {
        content.push_str(&format!("{{\"post_id\":\"p{i}\",\"body\":\"item {i}\"}}\n"));
    }
    std::fs::write(data_dir.path().join(&file_name), content).unwrap();

    DatasetRepo::claim_next(&pool, "test-worker").await.unwrap();
    DatasetRepo::finish(&pool, &key, &file_name, 5).await.unwrap();

    // Full page.
    let json = body_json(get(app.clone(), &format!("/api/v1/datasets/{key}/results")).await).await;
    let data = &json["data"];
    assert_eq!(data["num_rows"], 5);
    assert_eq!(data["items"].as_array().unwrap().len(), 5);
    assert_eq!(data["items"][0]["post_id"], "p0");

    // Offset + limit.
    let json = body_json(
        get(
            app,
            &format!("/api/v1/datasets/{key}/results?offset=2&limit=2"),
        )
        .await,
    )
    .await;
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["post_id"], "p2");
    assert_eq!(items[1]["post_id"], "p3");
}
