use std::sync::Arc;

use magpie_core::catalog::SharedCatalog;
use magpie_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: magpie_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Versioned data-source catalog; refreshed in the background.
    pub catalog: SharedCatalog,
    /// Event bus for publishing lifecycle events.
    pub event_bus: Arc<EventBus>,
}
