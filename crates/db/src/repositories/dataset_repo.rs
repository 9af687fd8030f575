//! Repository for the `datasets` table — the durable queue.
//!
//! Status transitions use the `DatasetStatus` enum from `models::status`;
//! no magic numbers. Terminal transitions (`finish`, `fail`) are guarded
//! with `WHERE status_id = processing` so each one happens at most once:
//! a second writer observes zero rows affected instead of overwriting a
//! terminal state.

use sqlx::PgPool;

use magpie_core::types::Timestamp;

use crate::models::dataset::{Dataset, DatasetListQuery, NewDataset, QueuedDatasetView};
use crate::models::status::DatasetStatus;

/// Column list for `datasets` queries.
const COLUMNS: &str = "\
    id, key, datasource, board, label, pseudonymise, is_private, \
    parameters, status_id, attempts, claimed_by, claimed_at, heartbeat_at, \
    result_file, num_rows, error_message, \
    progress_percent, progress_message, \
    submitted_at, started_at, completed_at, created_at, updated_at";

/// Maximum page size for dataset listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for dataset listing.
const DEFAULT_LIMIT: i64 = 50;

/// How many recent finished datasets feed the average-duration estimate.
const AVG_DURATION_SAMPLE: i64 = 100;

/// Provides queue and lifecycle operations for dataset requests.
pub struct DatasetRepo;

impl DatasetRepo {
    // -----------------------------------------------------------------------
    // Submission side (API)
    // -----------------------------------------------------------------------

    /// Insert a validated submission as a single `queued` row.
    ///
    /// One INSERT, so a failure leaves no partial state behind.
    pub async fn submit(pool: &PgPool, input: &NewDataset) -> Result<Dataset, sqlx::Error> {
        let query = format!(
            "INSERT INTO datasets \
                 (key, datasource, board, label, pseudonymise, is_private, \
                  parameters, status_id, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dataset>(&query)
            .bind(&input.key)
            .bind(&input.datasource)
            .bind(&input.board)
            .bind(&input.label)
            .bind(input.pseudonymise)
            .bind(input.is_private)
            .bind(&input.parameters)
            .bind(DatasetStatus::Queued.id())
            .bind(input.submitted_at)
            .fetch_one(pool)
            .await
    }

    /// Find a dataset by its public key.
    pub async fn find_by_key(pool: &PgPool, key: &str) -> Result<Option<Dataset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM datasets WHERE key = $1");
        sqlx::query_as::<_, Dataset>(&query)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// List recent non-private datasets, newest first, with optional
    /// status filter and pagination.
    pub async fn list_recent(
        pool: &PgPool,
        params: &DatasetListQuery,
    ) -> Result<Vec<Dataset>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM datasets \
             WHERE NOT is_private \
               AND ($1::smallint IS NULL OR status_id = $1) \
             ORDER BY submitted_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Dataset>(&query)
            .bind(params.status_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Worker side
    // -----------------------------------------------------------------------

    /// Atomically claim the oldest queued dataset for a worker slot.
    ///
    /// Uses `SELECT ... FOR UPDATE SKIP LOCKED` so concurrent claimers
    /// (slots in one worker, or multiple worker processes) never receive
    /// the same row. Claiming moves the row to `processing`, records the
    /// owner, stamps the heartbeat, and increments `attempts`.
    pub async fn claim_next(
        pool: &PgPool,
        worker: &str,
    ) -> Result<Option<Dataset>, sqlx::Error> {
        let query = format!(
            "UPDATE datasets \
             SET status_id = $1, claimed_by = $2, claimed_at = NOW(), \
                 heartbeat_at = NOW(), started_at = COALESCE(started_at, NOW()), \
                 attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM datasets \
                 WHERE status_id = $3 \
                 ORDER BY submitted_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dataset>(&query)
            .bind(DatasetStatus::Processing.id())
            .bind(worker)
            .bind(DatasetStatus::Queued.id())
            .fetch_optional(pool)
            .await
    }

    /// Refresh the heartbeat on a claimed dataset.
    ///
    /// A no-op if the row has left `processing` (e.g. the reaper already
    /// requeued it after a long stall).
    pub async fn heartbeat(pool: &PgPool, key: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE datasets SET heartbeat_at = NOW(), updated_at = NOW() \
             WHERE key = $1 AND status_id = $2",
        )
        .bind(key)
        .bind(DatasetStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Update progress on a claimed dataset. Also refreshes the heartbeat
    /// since progress is proof of life.
    pub async fn update_progress(
        pool: &PgPool,
        key: &str,
        percent: i16,
        message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE datasets \
             SET progress_percent = $2, progress_message = $3, \
                 heartbeat_at = NOW(), updated_at = NOW() \
             WHERE key = $1 AND status_id = $4",
        )
        .bind(key)
        .bind(percent)
        .bind(message)
        .bind(DatasetStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Terminal transition: `processing -> finished`.
    ///
    /// Records the result file and row count. Returns `false` when the
    /// row was not in `processing` (already terminal, or requeued) — the
    /// caller must not treat its result as published in that case.
    pub async fn finish(
        pool: &PgPool,
        key: &str,
        result_file: &str,
        num_rows: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE datasets \
             SET status_id = $2, result_file = $3, num_rows = $4, \
                 progress_percent = 100, progress_message = NULL, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE key = $1 AND status_id = $5",
        )
        .bind(key)
        .bind(DatasetStatus::Finished.id())
        .bind(result_file)
        .bind(num_rows)
        .bind(DatasetStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Terminal transition: `processing -> failed`, retaining the reason.
    ///
    /// Returns `false` when the row was not in `processing`.
    pub async fn fail(pool: &PgPool, key: &str, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE datasets \
             SET status_id = $2, error_message = $3, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE key = $1 AND status_id = $4",
        )
        .bind(key)
        .bind(DatasetStatus::Failed.id())
        .bind(error)
        .bind(DatasetStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Reaper
    // -----------------------------------------------------------------------

    /// Requeue `processing` datasets whose heartbeat is older than
    /// `stale_before` and which still have claim attempts left.
    ///
    /// This is the durability contract: a request whose owning worker
    /// died goes back to `queued` rather than being lost. Returns the
    /// affected keys.
    pub async fn requeue_stale(
        pool: &PgPool,
        stale_before: Timestamp,
        max_attempts: i32,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "UPDATE datasets \
             SET status_id = $1, claimed_by = NULL, claimed_at = NULL, \
                 heartbeat_at = NULL, progress_percent = 0, \
                 progress_message = NULL, updated_at = NOW() \
             WHERE status_id = $2 AND heartbeat_at < $3 AND attempts < $4 \
             RETURNING key",
        )
        .bind(DatasetStatus::Queued.id())
        .bind(DatasetStatus::Processing.id())
        .bind(stale_before)
        .bind(max_attempts)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    /// Fail stale `processing` datasets that have exhausted their claim
    /// attempts, so nothing stays stuck in `processing` forever. Returns
    /// the affected keys.
    pub async fn fail_exhausted(
        pool: &PgPool,
        stale_before: Timestamp,
        max_attempts: i32,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "UPDATE datasets \
             SET status_id = $1, \
                 error_message = 'Worker lost contact and the retry limit was reached', \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE status_id = $2 AND heartbeat_at < $3 AND attempts >= $4 \
             RETURNING key",
        )
        .bind(DatasetStatus::Failed.id())
        .bind(DatasetStatus::Processing.id())
        .bind(stale_before)
        .bind(max_attempts)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    // -----------------------------------------------------------------------
    // Queue status
    // -----------------------------------------------------------------------

    /// Counts of queued and processing datasets.
    pub async fn queue_counts(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT \
                 COUNT(*) FILTER (WHERE status_id = $1), \
                 COUNT(*) FILTER (WHERE status_id = $2) \
             FROM datasets",
        )
        .bind(DatasetStatus::Queued.id())
        .bind(DatasetStatus::Processing.id())
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// The live queue in dispatch order: processing datasets first, then
    /// queued ones oldest-first.
    pub async fn list_queue(pool: &PgPool) -> Result<Vec<QueuedDatasetView>, sqlx::Error> {
        sqlx::query_as::<_, QueuedDatasetView>(
            "SELECT key, datasource, board, label, status_id, attempts, \
                    progress_percent, submitted_at \
             FROM datasets \
             WHERE status_id IN ($1, $2) \
             ORDER BY status_id DESC, submitted_at ASC",
        )
        .bind(DatasetStatus::Queued.id())
        .bind(DatasetStatus::Processing.id())
        .fetch_all(pool)
        .await
    }

    /// Average processing duration in seconds over the most recent
    /// finished datasets. `None` when nothing has finished yet.
    pub async fn avg_duration_secs(pool: &PgPool) -> Result<Option<f64>, sqlx::Error> {
        let row: (Option<f64>,) = sqlx::query_as(
            "SELECT AVG(EXTRACT(EPOCH FROM completed_at - started_at))::DOUBLE PRECISION \
             FROM ( \
                 SELECT completed_at, started_at FROM datasets \
                 WHERE status_id = $1 AND started_at IS NOT NULL \
                 ORDER BY completed_at DESC \
                 LIMIT $2 \
             ) recent",
        )
        .bind(DatasetStatus::Finished.id())
        .bind(AVG_DURATION_SAMPLE)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
