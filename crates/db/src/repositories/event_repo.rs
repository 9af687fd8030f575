//! Repository for the `events` table.

use sqlx::PgPool;

use crate::models::event::InsertEvent;

/// Durable store for lifecycle events.
pub struct EventRepo;

impl EventRepo {
    /// Append one event.
    pub async fn insert(pool: &PgPool, event: &InsertEvent) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO events (event_type, dataset_key, payload, occurred_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&event.event_type)
        .bind(&event.dataset_key)
        .bind(&event.payload)
        .bind(event.occurred_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
