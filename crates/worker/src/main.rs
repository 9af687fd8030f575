use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magpie_db::repositories::WorkerRepo;
use magpie_events::EventBus;
use magpie_pipeline::ProcessorRegistry;
use magpie_worker::config::WorkerConfig;
use magpie_worker::{heartbeat, reaper, runner};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "magpie_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Arc::new(WorkerConfig::from_env());
    tracing::info!(
        worker = %config.name,
        pool_size = config.pool_size,
        data_path = %config.data_path.display(),
        "Loaded worker configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = magpie_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    magpie_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    magpie_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Data directory ---
    tokio::fs::create_dir_all(&config.data_path)
        .await
        .expect("Failed to create data directory");

    // --- Worker registration ---
    let worker_row = WorkerRepo::register(&pool, &config.name, config.pool_size as i32)
        .await
        .expect("Failed to register worker");
    tracing::info!(worker_id = worker_row.id, "Worker registered");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let persistence_handle = tokio::spawn(magpie_events::EventPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));

    // --- Processor registry ---
    let registry = Arc::new(ProcessorRegistry::standard());

    // --- Background loops ---
    let cancel = CancellationToken::new();
    let active = Arc::new(AtomicUsize::new(0));

    let mut slot_handles = Vec::with_capacity(config.pool_size);
    for slot in 0..config.pool_size {
        slot_handles.push(tokio::spawn(runner::run_slot(
            pool.clone(),
            Arc::clone(&registry),
            Arc::clone(&event_bus),
            Arc::clone(&config),
            Arc::clone(&active),
            slot,
            cancel.clone(),
        )));
    }

    let reaper_handle = tokio::spawn(reaper::run(
        pool.clone(),
        Arc::clone(&event_bus),
        Arc::clone(&config),
        cancel.clone(),
    ));

    let heartbeat_handle = tokio::spawn(heartbeat::worker_heartbeat(
        pool.clone(),
        worker_row.id,
        Arc::clone(&active),
        Duration::from_secs(config.heartbeat_interval_secs),
        cancel.clone(),
    ));

    tracing::info!("Worker running");

    // --- Shutdown ---
    shutdown_signal().await;
    tracing::info!("Shutting down; waiting for in-flight datasets");
    cancel.cancel();

    for handle in slot_handles {
        let _ = handle.await;
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), heartbeat_handle).await;

    if let Err(e) = WorkerRepo::mark_offline(&pool, worker_row.id).await {
        tracing::error!(error = %e, "Failed to mark worker offline");
    }

    // Drop the bus sender to close the broadcast channel and let the
    // persistence task drain.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
