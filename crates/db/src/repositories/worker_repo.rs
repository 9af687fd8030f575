//! Repository for the `workers` registry table.

use sqlx::PgPool;

use magpie_core::types::{DbId, Timestamp};

use crate::models::status::WorkerStatus;
use crate::models::worker::WorkerRow;

/// Column list for `workers` queries.
const COLUMNS: &str = "id, name, status_id, pool_size, started_at, heartbeat_at";

/// Provides registration and heartbeat operations for worker processes.
pub struct WorkerRepo;

impl WorkerRepo {
    /// Register a worker at startup.
    ///
    /// Re-registering an existing name (worker restart) resets its status
    /// and heartbeat rather than creating a second row.
    pub async fn register(
        pool: &PgPool,
        name: &str,
        pool_size: i32,
    ) -> Result<WorkerRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO workers (name, status_id, pool_size) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO UPDATE \
                 SET status_id = EXCLUDED.status_id, \
                     pool_size = EXCLUDED.pool_size, \
                     started_at = NOW(), \
                     heartbeat_at = NOW(), \
                     updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkerRow>(&query)
            .bind(name)
            .bind(WorkerStatus::Idle.id())
            .bind(pool_size)
            .fetch_one(pool)
            .await
    }

    /// Refresh a worker's heartbeat and report whether it is busy.
    pub async fn heartbeat(pool: &PgPool, id: DbId, busy: bool) -> Result<(), sqlx::Error> {
        let status = if busy {
            WorkerStatus::Busy
        } else {
            WorkerStatus::Idle
        };
        sqlx::query(
            "UPDATE workers SET heartbeat_at = NOW(), status_id = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a worker offline (graceful shutdown).
    pub async fn mark_offline(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workers SET status_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(WorkerStatus::Offline.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark workers whose heartbeat is older than `stale_before` offline.
    /// Returns how many rows changed.
    pub async fn mark_stale_offline(
        pool: &PgPool,
        stale_before: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workers SET status_id = $1, updated_at = NOW() \
             WHERE status_id <> $1 AND heartbeat_at < $2",
        )
        .bind(WorkerStatus::Offline.id())
        .bind(stale_before)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Total claim slots across workers that are currently online.
    /// Feeds the queue wait estimate.
    pub async fn active_slots(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(pool_size), 0)::BIGINT FROM workers WHERE status_id <> $1",
        )
        .bind(WorkerStatus::Offline.id())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
