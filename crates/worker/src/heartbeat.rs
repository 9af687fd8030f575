//! Heartbeat loops: proof of life for the worker row and for claims.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use magpie_core::types::DbId;
use magpie_db::repositories::{DatasetRepo, WorkerRepo};
use magpie_db::DbPool;

/// Periodically refresh the worker registry row until cancelled.
///
/// `active` counts slots currently processing; the row is marked busy
/// whenever it is non-zero.
pub async fn worker_heartbeat(
    pool: DbPool,
    worker_id: DbId,
    active: Arc<AtomicUsize>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let busy = active.load(Ordering::SeqCst) > 0;
                if let Err(e) = WorkerRepo::heartbeat(&pool, worker_id, busy).await {
                    tracing::error!(worker_id, error = %e, "Worker heartbeat failed");
                }
            }
        }
    }
}

/// Periodically refresh the heartbeat on one claimed dataset until
/// cancelled. Spawned for the duration of each processor run.
pub async fn dataset_heartbeat(
    pool: DbPool,
    key: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; the claim already stamped a
    // heartbeat, so skip it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = DatasetRepo::heartbeat(&pool, &key).await {
                    tracing::error!(dataset_key = %key, error = %e, "Dataset heartbeat failed");
                }
            }
        }
    }
}
