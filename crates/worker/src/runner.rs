//! Claim slots: the loops that pull queued datasets and process them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use magpie_core::pseudonymise::Pseudonymiser;
use magpie_db::models::dataset::Dataset;
use magpie_db::repositories::DatasetRepo;
use magpie_db::DbPool;
use magpie_events::bus::{
    EVENT_DATASET_CLAIMED, EVENT_DATASET_FAILED, EVENT_DATASET_FINISHED,
};
use magpie_events::{EventBus, LifecycleEvent};
use magpie_pipeline::{ProcessContext, ProcessorRegistry};

use crate::config::WorkerConfig;
use crate::heartbeat;

/// Run one claim slot until cancelled.
///
/// Each slot claims at most one dataset at a time; the claim query's
/// `FOR UPDATE SKIP LOCKED` keeps slots (and other worker processes)
/// from ever receiving the same row. When the queue is empty the slot
/// sleeps for the poll interval.
pub async fn run_slot(
    pool: DbPool,
    registry: Arc<ProcessorRegistry>,
    bus: Arc<EventBus>,
    config: Arc<WorkerConfig>,
    active: Arc<AtomicUsize>,
    slot: usize,
    cancel: CancellationToken,
) {
    tracing::info!(slot, "Claim slot started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match DatasetRepo::claim_next(&pool, &config.name).await {
            Ok(Some(dataset)) => {
                active.fetch_add(1, Ordering::SeqCst);
                process_one(&pool, &registry, &bus, &config, dataset, slot).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
            Ok(None) => {
                // Queue empty; wait before polling again.
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(config.poll_interval_secs)) => {}
                }
            }
            Err(e) => {
                tracing::error!(slot, error = %e, "Failed to claim from queue");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(config.poll_interval_secs)) => {}
                }
            }
        }
    }

    tracing::info!(slot, "Claim slot stopped");
}

/// Process one claimed dataset to its terminal state.
///
/// Failures inside the processor fail the dataset with a retained
/// reason. Failures writing the terminal state itself are only logged:
/// the row stays in `processing` and the reaper will requeue it once the
/// heartbeat goes stale, which is the safe outcome when the database is
/// unreachable.
pub async fn process_one(
    pool: &DbPool,
    registry: &ProcessorRegistry,
    bus: &EventBus,
    config: &WorkerConfig,
    dataset: Dataset,
    slot: usize,
) {
    let processor = registry.resolve(&dataset.datasource);
    tracing::info!(
        slot,
        dataset_key = %dataset.key,
        datasource = %dataset.datasource,
        board = ?dataset.board,
        attempt = dataset.attempts,
        processor = processor.kind(),
        "Processing dataset",
    );

    bus.publish(
        LifecycleEvent::new(EVENT_DATASET_CLAIMED)
            .for_dataset(&dataset.key)
            .with_payload(serde_json::json!({
                "worker": config.name,
                "attempt": dataset.attempts,
            })),
    );

    // Keep the claim visibly alive while the processor runs.
    let hb_cancel = CancellationToken::new();
    let hb_task = tokio::spawn(heartbeat::dataset_heartbeat(
        pool.clone(),
        dataset.key.clone(),
        Duration::from_secs(config.heartbeat_interval_secs),
        hb_cancel.clone(),
    ));

    let pseudonymiser = dataset
        .pseudonymise
        .then(|| Pseudonymiser::new(&config.anonymisation_salt));

    let ctx = ProcessContext {
        pool,
        dataset: &dataset,
        data_path: &config.data_path,
        pseudonymiser: pseudonymiser.as_ref(),
        max_rows: config.max_result_rows,
    };
    let result = processor.process(ctx).await;

    hb_cancel.cancel();
    let _ = hb_task.await;

    match result {
        Ok(outcome) => {
            match DatasetRepo::finish(pool, &dataset.key, &outcome.result_file, outcome.num_rows)
                .await
            {
                Ok(true) => {
                    tracing::info!(
                        dataset_key = %dataset.key,
                        num_rows = outcome.num_rows,
                        result_file = %outcome.result_file,
                        "Dataset finished",
                    );
                    bus.publish(
                        LifecycleEvent::new(EVENT_DATASET_FINISHED)
                            .for_dataset(&dataset.key)
                            .with_payload(serde_json::json!({
                                "num_rows": outcome.num_rows,
                                "result_file": outcome.result_file,
                            })),
                    );
                }
                Ok(false) => {
                    // The claim was taken away (reaper requeue after a
                    // stall, or an operator intervened). The next owner
                    // republishes the result; ours is abandoned.
                    tracing::warn!(
                        dataset_key = %dataset.key,
                        "Dataset left processing before its result could be recorded",
                    );
                }
                Err(e) => {
                    tracing::error!(
                        dataset_key = %dataset.key,
                        error = %e,
                        "Failed to record finished dataset; leaving for the reaper",
                    );
                }
            }
        }
        Err(e) => {
            let reason = e.to_string();
            tracing::warn!(dataset_key = %dataset.key, error = %reason, "Processor failed");
            match DatasetRepo::fail(pool, &dataset.key, &reason).await {
                Ok(true) => {
                    bus.publish(
                        LifecycleEvent::new(EVENT_DATASET_FAILED)
                            .for_dataset(&dataset.key)
                            .with_payload(serde_json::json!({"error": reason})),
                    );
                }
                Ok(false) => {
                    tracing::warn!(
                        dataset_key = %dataset.key,
                        "Dataset left processing before its failure could be recorded",
                    );
                }
                Err(e) => {
                    tracing::error!(
                        dataset_key = %dataset.key,
                        error = %e,
                        "Failed to record failed dataset; leaving for the reaper",
                    );
                }
            }
        }
    }
}
