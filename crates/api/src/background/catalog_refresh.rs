//! Periodic reload of the data-source catalog.
//!
//! The external collection/indexing process maintains the catalog
//! tables; this task picks up its changes by installing a fresh snapshot
//! on a fixed interval using `tokio::time::interval`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use magpie_core::catalog::SharedCatalog;
use magpie_db::repositories::CatalogRepo;
use magpie_db::DbPool;

/// Run the catalog refresh loop.
///
/// Installs a new snapshot generation every `refresh_secs`. Runs until
/// `cancel` is triggered. A failed reload keeps the previous snapshot —
/// a stale catalog beats no catalog.
pub async fn run(
    pool: DbPool,
    catalog: SharedCatalog,
    refresh_secs: u64,
    cancel: CancellationToken,
) {
    tracing::info!(refresh_secs, "Catalog refresh job started");

    let mut interval = tokio::time::interval(Duration::from_secs(refresh_secs));
    // The first tick fires immediately; the startup load already
    // produced a snapshot, so skip it.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Catalog refresh job stopping");
                break;
            }
            _ = interval.tick() => {
                match CatalogRepo::load_sources(&pool).await {
                    Ok(sources) => {
                        let count = sources.len();
                        let version = catalog.install(sources);
                        tracing::debug!(version, sources = count, "Catalog snapshot installed");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Catalog refresh failed; keeping previous snapshot");
                    }
                }
            }
        }
    }
}
