use std::path::PathBuf;

/// Worker configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Unique worker name; claimed datasets record it as their owner
    /// (default: `magpie-worker-{pid}`).
    pub name: String,
    /// Number of concurrent claim slots (default: `2`).
    pub pool_size: usize,
    /// Seconds to sleep when the queue is empty (default: `5`).
    pub poll_interval_secs: u64,
    /// Seconds between heartbeats on the worker row and on claimed
    /// datasets (default: `15`).
    pub heartbeat_interval_secs: u64,
    /// Seconds without a heartbeat after which a claim is considered
    /// abandoned (default: `120`).
    pub claim_timeout_secs: u64,
    /// Seconds between reaper sweeps for abandoned claims (default: `30`).
    pub reaper_interval_secs: u64,
    /// Claim attempts before an abandoned request is failed for good
    /// (default: `3`).
    pub max_attempts: i32,
    /// Upper bound on rows per result file (default: `50000`).
    pub max_result_rows: i64,
    /// Directory result files are written into (default: `./data`).
    pub data_path: PathBuf,
    /// Salt for author pseudonymisation. Must match across workers.
    pub anonymisation_salt: String,
}

/// Fallback salt for development setups. Deployments must override it.
const DEV_SALT: &str = "magpie-dev-salt";

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `WORKER_NAME`             | `magpie-worker-{pid}`   |
    /// | `WORKER_POOL_SIZE`        | `2`                     |
    /// | `POLL_INTERVAL_SECS`      | `5`                     |
    /// | `HEARTBEAT_INTERVAL_SECS` | `15`                    |
    /// | `CLAIM_TIMEOUT_SECS`      | `120`                   |
    /// | `REAPER_INTERVAL_SECS`    | `30`                    |
    /// | `MAX_ATTEMPTS`            | `3`                     |
    /// | `MAX_RESULT_ROWS`         | `50000`                 |
    /// | `DATA_PATH`               | `./data`                |
    /// | `ANONYMISATION_SALT`      | (development fallback)  |
    pub fn from_env() -> Self {
        let name = std::env::var("WORKER_NAME")
            .unwrap_or_else(|_| format!("magpie-worker-{}", std::process::id()));

        let pool_size: usize = std::env::var("WORKER_POOL_SIZE")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("WORKER_POOL_SIZE must be a valid usize");

        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("POLL_INTERVAL_SECS must be a valid u64");

        let heartbeat_interval_secs: u64 = std::env::var("HEARTBEAT_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("HEARTBEAT_INTERVAL_SECS must be a valid u64");

        let claim_timeout_secs: u64 = std::env::var("CLAIM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("CLAIM_TIMEOUT_SECS must be a valid u64");

        let reaper_interval_secs: u64 = std::env::var("REAPER_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REAPER_INTERVAL_SECS must be a valid u64");

        let max_attempts: i32 = std::env::var("MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("MAX_ATTEMPTS must be a valid i32");

        let max_result_rows: i64 = std::env::var("MAX_RESULT_ROWS")
            .unwrap_or_else(|_| "50000".into())
            .parse()
            .expect("MAX_RESULT_ROWS must be a valid i64");

        let data_path =
            PathBuf::from(std::env::var("DATA_PATH").unwrap_or_else(|_| "./data".into()));

        let anonymisation_salt =
            std::env::var("ANONYMISATION_SALT").unwrap_or_else(|_| DEV_SALT.into());
        if anonymisation_salt == DEV_SALT {
            tracing::warn!("ANONYMISATION_SALT not set; using the development fallback");
        }

        Self {
            name,
            pool_size,
            poll_interval_secs,
            heartbeat_interval_secs,
            claim_timeout_secs,
            reaper_interval_secs,
            max_attempts,
            max_result_rows,
            data_path,
            anonymisation_salt,
        }
    }
}
