//! Background service that writes every published event to the database.

use tokio::sync::broadcast;

use magpie_db::models::event::InsertEvent;
use magpie_db::repositories::EventRepo;
use magpie_db::DbPool;

use crate::bus::LifecycleEvent;

/// Durable event capture.
///
/// Subscribes to the bus and appends each event to the `events` table.
/// Runs until the bus's sender side is dropped.
pub struct EventPersistence;

impl EventPersistence {
    /// Consume events from `rx` and persist them.
    ///
    /// Intended to be spawned via `tokio::spawn`. A failed insert is
    /// logged and skipped — event capture must never take down the
    /// process that publishes.
    pub async fn run(pool: DbPool, mut rx: broadcast::Receiver<LifecycleEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let insert = InsertEvent {
                        event_type: event.event_type.clone(),
                        dataset_key: event.dataset_key.clone(),
                        payload: event.payload.clone(),
                        occurred_at: event.timestamp,
                    };
                    if let Err(e) = EventRepo::insert(&pool, &insert).await {
                        tracing::error!(
                            event_type = %event.event_type,
                            error = %e,
                            "Failed to persist event",
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event persistence lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed; persistence stopping");
                    break;
                }
            }
        }
    }
}
