//! Processing pipeline: the seam between the queue and result artifacts.
//!
//! A [`Processor`] turns one claimed dataset request into a result file.
//! The [`ProcessorRegistry`] maps data sources to processors; deployments
//! can register specialised processors per source, with [`BoardSearch`]
//! as the standard fallback that selects captured posts and streams them
//! to NDJSON.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use magpie_core::pseudonymise::Pseudonymiser;
use magpie_db::models::dataset::Dataset;
use magpie_db::DbPool;

pub mod output;
pub mod search;

pub use search::BoardSearch;

// ---------------------------------------------------------------------------
// Processor contract
// ---------------------------------------------------------------------------

/// Everything a processor may use while producing a result set.
pub struct ProcessContext<'a> {
    pub pool: &'a DbPool,
    pub dataset: &'a Dataset,
    /// Directory result files are written into.
    pub data_path: &'a Path,
    /// Present when the dataset was submitted with the pseudonymise flag.
    pub pseudonymiser: Option<&'a Pseudonymiser>,
    /// Upper bound on result rows.
    pub max_rows: i64,
}

/// What a successful processor run produced.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Result file name, relative to the data path.
    pub result_file: String,
    pub num_rows: i64,
}

/// Errors surfaced by processors. All of them fail the dataset with the
/// error's display text as the retained reason.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error writing results: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// A pluggable dataset processor.
///
/// Implementations must be safe to run concurrently from multiple worker
/// slots; all per-run state lives in the [`ProcessContext`].
#[async_trait]
pub trait Processor: Send + Sync {
    /// Stable identifier, recorded in logs.
    fn kind(&self) -> &'static str;

    /// Produce the result set for one claimed dataset.
    async fn process(&self, ctx: ProcessContext<'_>) -> Result<ProcessOutcome, ProcessError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps data sources to processors.
pub struct ProcessorRegistry {
    by_datasource: HashMap<String, Arc<dyn Processor>>,
    fallback: Arc<dyn Processor>,
}

impl ProcessorRegistry {
    /// Create a registry with the given fallback processor.
    pub fn with_fallback(fallback: Arc<dyn Processor>) -> Self {
        Self {
            by_datasource: HashMap::new(),
            fallback,
        }
    }

    /// The standard registry: [`BoardSearch`] for every data source.
    pub fn standard() -> Self {
        Self::with_fallback(Arc::new(BoardSearch))
    }

    /// Register a specialised processor for one data source.
    pub fn register(&mut self, datasource: impl Into<String>, processor: Arc<dyn Processor>) {
        self.by_datasource.insert(datasource.into(), processor);
    }

    /// The processor responsible for a data source.
    pub fn resolve(&self, datasource: &str) -> Arc<dyn Processor> {
        self.by_datasource
            .get(datasource)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
