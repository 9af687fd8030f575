//! Abandoned-claim recovery.
//!
//! A dataset in `processing` whose heartbeat has gone stale belongs to a
//! worker that died mid-task. The reaper puts such requests back in the
//! queue while they have claim attempts left, and fails them terminally
//! once the limit is reached, so no request is ever lost or stuck.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use magpie_db::repositories::{DatasetRepo, WorkerRepo};
use magpie_db::DbPool;
use magpie_events::bus::{EVENT_DATASET_FAILED, EVENT_DATASET_REQUEUED};
use magpie_events::{EventBus, LifecycleEvent};

use crate::config::WorkerConfig;

/// Run the reaper loop until cancelled.
pub async fn run(
    pool: DbPool,
    bus: Arc<EventBus>,
    config: Arc<WorkerConfig>,
    cancel: CancellationToken,
) {
    tracing::info!(
        claim_timeout_secs = config.claim_timeout_secs,
        interval_secs = config.reaper_interval_secs,
        max_attempts = config.max_attempts,
        "Reaper started",
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.reaper_interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reaper stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = sweep(&pool, &bus, &config).await {
                    tracing::error!(error = %e, "Reaper sweep failed");
                }
            }
        }
    }
}

/// One sweep: fail exhausted stale claims, requeue the rest, and mark
/// silent workers offline.
pub async fn sweep(
    pool: &DbPool,
    bus: &EventBus,
    config: &WorkerConfig,
) -> Result<(), sqlx::Error> {
    let stale_before = Utc::now() - chrono::Duration::seconds(config.claim_timeout_secs as i64);

    let failed = DatasetRepo::fail_exhausted(pool, stale_before, config.max_attempts).await?;
    for key in &failed {
        tracing::warn!(dataset_key = %key, "Stale dataset failed after exhausting attempts");
        bus.publish(
            LifecycleEvent::new(EVENT_DATASET_FAILED)
                .for_dataset(key)
                .with_payload(serde_json::json!({"reason": "claim attempts exhausted"})),
        );
    }

    let requeued = DatasetRepo::requeue_stale(pool, stale_before, config.max_attempts).await?;
    for key in &requeued {
        tracing::warn!(dataset_key = %key, "Stale dataset requeued");
        bus.publish(LifecycleEvent::new(EVENT_DATASET_REQUEUED).for_dataset(key));
    }

    let offline = WorkerRepo::mark_stale_offline(pool, stale_before).await?;
    if offline > 0 {
        tracing::warn!(offline, "Marked silent workers offline");
    }

    Ok(())
}
