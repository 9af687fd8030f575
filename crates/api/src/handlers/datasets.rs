//! Handlers for the `/datasets` resource: submission, polling, results.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufReadExt;

use magpie_core::error::CoreError;
use magpie_core::types::Timestamp;
use magpie_core::{hashing, naming};
use magpie_db::models::dataset::{Dataset, DatasetListQuery, NewDataset};
use magpie_db::models::status::DatasetStatus;
use magpie_db::repositories::DatasetRepo;
use magpie_events::bus::EVENT_DATASET_SUBMITTED;
use magpie_events::LifecycleEvent;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size for result listings.
const DEFAULT_RESULT_LIMIT: usize = 100;

/// Maximum page size for result listings.
const MAX_RESULT_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Form parsing
// ---------------------------------------------------------------------------

/// Fields accepted by the submission form.
#[derive(Debug, Default)]
struct SubmitForm {
    datasource: Option<String>,
    board: Option<String>,
    label: Option<String>,
    pseudonymise: bool,
    make_private: bool,
}

/// Interpret an HTML form value as a boolean. Checkboxes submit `on`;
/// programmatic clients tend to send `true` or `1`.
fn form_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// Drain a `multipart/form-data` body into a [`SubmitForm`].
///
/// Unknown fields are ignored so the form can grow without breaking old
/// clients; malformed bodies surface as 400 via [`AppError::Multipart`].
async fn parse_submit_form(mut multipart: Multipart) -> Result<SubmitForm, AppError> {
    let mut form = SubmitForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await?;

        match name.as_str() {
            "datasource" => form.datasource = Some(value),
            "board" => {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    form.board = Some(trimmed.to_string());
                }
            }
            "label" => form.label = Some(value),
            "pseudonymise" => form.pseudonymise = form_bool(&value),
            "make-private" => form.make_private = form_bool(&value),
            _ => {}
        }
    }

    Ok(form)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/datasets
///
/// Accept a dataset-creation request as `multipart/form-data` with
/// fields `datasource`, optional `board`, `label`, `pseudonymise`, and
/// `make-private`. The selection is validated against the current
/// catalog snapshot before anything is written; a valid request becomes
/// exactly one `queued` row and returns 201 with the created dataset.
pub async fn submit_dataset(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_submit_form(multipart).await?;

    let datasource = form
        .datasource
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing datasource field".to_string()))?
        .to_string();
    let board = form.board;

    // Validate against the catalog before touching the queue. The
    // snapshot is immutable, so the version that validated the request
    // is recorded alongside it.
    let catalog = state.catalog.snapshot();
    catalog.validate_selection(&datasource, board.as_deref())?;

    let submitted_at = Utc::now();
    let label = naming::effective_label(
        form.label.as_deref(),
        &datasource,
        board.as_deref(),
        submitted_at,
    );

    let parameters = serde_json::json!({
        "datasource": datasource,
        "board": board,
        "pseudonymise": form.pseudonymise,
        "make_private": form.make_private,
        "catalog_version": catalog.version,
    });
    let key = hashing::dataset_key(&parameters, submitted_at);

    let dataset = DatasetRepo::submit(
        &state.pool,
        &NewDataset {
            key,
            datasource,
            board,
            label,
            pseudonymise: form.pseudonymise,
            is_private: form.make_private,
            parameters,
            submitted_at,
        },
    )
    .await?;

    tracing::info!(
        dataset_key = %dataset.key,
        datasource = %dataset.datasource,
        board = ?dataset.board,
        "Dataset submitted",
    );

    state.event_bus.publish(
        LifecycleEvent::new(EVENT_DATASET_SUBMITTED)
            .for_dataset(&dataset.key)
            .with_payload(serde_json::json!({
                "datasource": dataset.datasource,
                "board": dataset.board,
            })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: dataset })))
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

/// GET /api/v1/datasets
///
/// Recent datasets, newest first, excluding private ones. Supports
/// optional `status_id`, `limit`, and `offset` query parameters.
pub async fn list_datasets(
    State(state): State<AppState>,
    Query(params): Query<DatasetListQuery>,
) -> AppResult<impl IntoResponse> {
    let datasets = DatasetRepo::list_recent(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: datasets }))
}

/// GET /api/v1/datasets/{key}
///
/// The full dataset record.
pub async fn get_dataset(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let dataset = find_dataset(&state, &key).await?;
    Ok(Json(DataResponse { data: dataset }))
}

// ---------------------------------------------------------------------------
// Status polling
// ---------------------------------------------------------------------------

/// Status payload for polling clients.
#[derive(Debug, Serialize)]
pub struct DatasetStatusResponse {
    pub key: String,
    /// `queued`, `processing`, `finished`, or `failed`.
    pub status: &'static str,
    pub progress_percent: i16,
    pub progress_message: Option<String>,
    pub submitted_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    /// Where to fetch results; present once `finished`.
    pub results_url: Option<String>,
    pub num_rows: Option<i64>,
    /// Retained failure reason; present once `failed`.
    pub error: Option<String>,
}

/// GET /api/v1/datasets/{key}/status
///
/// Current lifecycle status. A pure read: safe to poll repeatedly, no
/// state is mutated. Unknown keys return 404 — distinct from a known
/// dataset that simply has not finished yet.
pub async fn get_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let dataset = find_dataset(&state, &key).await?;

    let finished = dataset.status() == Some(DatasetStatus::Finished);
    let results_url = finished.then(|| format!("/api/v1/datasets/{}/results", dataset.key));

    let resp = DatasetStatusResponse {
        status: dataset.status_name(),
        progress_percent: dataset.progress_percent,
        progress_message: dataset.progress_message,
        submitted_at: dataset.submitted_at,
        completed_at: dataset.completed_at,
        results_url,
        num_rows: dataset.num_rows,
        error: dataset.error_message,
        key: dataset.key,
    };

    Ok(Json(DataResponse { data: resp }))
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/v1/datasets/{key}/results`.
#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    /// Number of result rows to skip. Defaults to 0.
    pub offset: Option<usize>,
    /// Maximum rows to return. Defaults to 100, capped at 1000.
    pub limit: Option<usize>,
}

/// One page of a dataset's result set.
#[derive(Debug, Serialize)]
pub struct ResultsPage {
    pub key: String,
    pub num_rows: i64,
    pub offset: usize,
    pub items: Vec<serde_json::Value>,
}

/// GET /api/v1/datasets/{key}/results
///
/// Page through the NDJSON result file of a finished dataset. Datasets
/// that are not `finished` yet return 409.
pub async fn get_results(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<ResultsQuery>,
) -> AppResult<impl IntoResponse> {
    let dataset = find_dataset(&state, &key).await?;

    if dataset.status() != Some(DatasetStatus::Finished) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Dataset {key} is not finished (status: {})",
            dataset.status_name()
        ))));
    }

    let result_file = dataset.result_file.as_deref().ok_or_else(|| {
        AppError::InternalError(format!("Finished dataset {key} has no result file"))
    })?;

    let offset = params.offset.unwrap_or(0);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RESULT_LIMIT)
        .clamp(1, MAX_RESULT_LIMIT);

    let path = state.config.data_path.join(result_file);
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        AppError::InternalError(format!(
            "Result file for dataset {key} is unavailable: {e}"
        ))
    })?;

    let mut lines = tokio::io::BufReader::new(file).lines();
    let mut items = Vec::with_capacity(limit.min(DEFAULT_RESULT_LIMIT));
    let mut index = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to read result file: {e}")))?
    {
        if index >= offset {
            if items.len() == limit {
                break;
            }
            let item = serde_json::from_str(&line).map_err(|e| {
                AppError::InternalError(format!("Corrupt result row at index {index}: {e}"))
            })?;
            items.push(item);
        }
        index += 1;
    }

    let resp = ResultsPage {
        key: dataset.key,
        num_rows: dataset.num_rows.unwrap_or(0),
        offset,
        items,
    };

    Ok(Json(DataResponse { data: resp }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a dataset by key or produce the standard 404.
async fn find_dataset(state: &AppState, key: &str) -> AppResult<Dataset> {
    DatasetRepo::find_by_key(&state.pool, key)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Dataset",
                key: key.to_string(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_bool_accepts_checkbox_and_programmatic_values() {
        for value in ["on", "true", "1", "yes", "ON", "True"] {
            assert!(form_bool(value), "{value} should parse as true");
        }
        for value in ["", "off", "false", "0", "no"] {
            assert!(!form_bool(value), "{value} should parse as false");
        }
    }
}
