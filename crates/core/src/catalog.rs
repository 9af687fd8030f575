//! Data-source catalog: descriptors, snapshots, and selection validation.
//!
//! The catalog describes which data sources may be captured from and,
//! per source, which boards (sub-sections) exist. It is populated by an
//! external collection/indexing process and is read-only at request
//! time. Both the API server and the worker hold it as an immutable,
//! versioned [`CatalogSnapshot`] behind a [`SharedCatalog`] handle; a
//! background task swaps in fresh snapshots, so no request ever observes
//! a half-updated catalog.

use std::sync::{Arc, OnceLock, RwLock};

use chrono::Utc;
use regex::Regex;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum length of a board name accepted for unrestricted sources.
const MAX_BOARD_NAME_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Aggregate statistics for one enumerated board of a data source.
#[derive(Debug, Clone, Serialize)]
pub struct BoardInfo {
    pub name: String,
    /// Number of captured posts currently stored for this board.
    pub post_count: i64,
    pub first_post_at: Option<Timestamp>,
    pub last_post_at: Option<Timestamp>,
}

/// The boards a data source exposes.
///
/// Serializes as `"*"` for unrestricted sources and as an array of
/// [`BoardInfo`] for enumerated ones, matching the shape the submission
/// form consumes.
#[derive(Debug, Clone)]
pub enum BoardSet {
    /// Any board name is accepted (the source is not partitioned, or the
    /// partitioning is open-ended).
    Any,
    /// Only the enumerated boards are accepted.
    Boards(Vec<BoardInfo>),
}

impl Serialize for BoardSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BoardSet::Any => serializer.serialize_str("*"),
            BoardSet::Boards(boards) => {
                let mut seq = serializer.serialize_seq(Some(boards.len()))?;
                for board in boards {
                    seq.serialize_element(board)?;
                }
                seq.end()
            }
        }
    }
}

/// Descriptor for one supported data source.
#[derive(Debug, Clone, Serialize)]
pub struct DataSource {
    /// Stable identifier referenced by dataset requests (e.g. `"reddit"`).
    pub id: String,
    /// Human-readable name shown in the submission form.
    pub name: String,
    pub boards: BoardSet,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An immutable, versioned view of the catalog.
///
/// The version increments every time a fresh snapshot is installed, so
/// consumers can tell which catalog generation validated a request.
#[derive(Debug, Serialize)]
pub struct CatalogSnapshot {
    pub version: u64,
    pub loaded_at: Timestamp,
    pub sources: Vec<DataSource>,
}

impl CatalogSnapshot {
    /// Look up a data source by identifier.
    pub fn get(&self, datasource: &str) -> Option<&DataSource> {
        self.sources.iter().find(|s| s.id == datasource)
    }

    /// Validate a submission's datasource/board selection.
    ///
    /// Rules:
    /// - The data source must exist in this snapshot.
    /// - Sources with enumerated boards require one of the listed boards.
    /// - Unrestricted sources accept no board, or any well-formed name.
    pub fn validate_selection(
        &self,
        datasource: &str,
        board: Option<&str>,
    ) -> Result<(), CoreError> {
        let source = self.get(datasource).ok_or_else(|| {
            CoreError::Validation(format!("Unknown data source: {datasource}"))
        })?;

        match (&source.boards, board) {
            (BoardSet::Any, None) => Ok(()),
            (BoardSet::Any, Some(name)) => validate_board_name(name),
            (BoardSet::Boards(_), None) => Err(CoreError::Validation(format!(
                "Data source {datasource} requires a board selection"
            ))),
            (BoardSet::Boards(boards), Some(name)) => {
                if boards.iter().any(|b| b.name == name) {
                    Ok(())
                } else {
                    Err(CoreError::Validation(format!(
                        "Board {name} is not available for data source {datasource}"
                    )))
                }
            }
        }
    }
}

/// Validate the shape of a free-form board name (unrestricted sources).
///
/// Board names become part of stored parameters and file contents, so
/// only a conservative character set is accepted.
pub fn validate_board_name(name: &str) -> Result<(), CoreError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid regex"));

    if name.is_empty() {
        return Err(CoreError::Validation(
            "Board name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_BOARD_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Board name must not exceed {MAX_BOARD_NAME_LEN} characters"
        )));
    }
    if !pattern.is_match(name) {
        return Err(CoreError::Validation(format!(
            "Board name {name:?} may only contain alphanumeric, hyphen, or underscore characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Cheaply-cloneable handle to the current catalog snapshot.
///
/// `snapshot()` hands out an `Arc` to the current generation; `install()`
/// atomically replaces it with the next one. Readers holding an old
/// snapshot keep a consistent view until they drop it.
#[derive(Clone)]
pub struct SharedCatalog {
    inner: Arc<RwLock<Arc<CatalogSnapshot>>>,
}

impl SharedCatalog {
    /// Create a handle holding version 1 of the catalog.
    pub fn new(sources: Vec<DataSource>) -> Self {
        let snapshot = CatalogSnapshot {
            version: 1,
            loaded_at: Utc::now(),
            sources,
        };
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.inner.read().expect("catalog lock poisoned"))
    }

    /// Install a fresh set of sources as the next snapshot generation.
    ///
    /// Returns the new version number.
    pub fn install(&self, sources: Vec<DataSource>) -> u64 {
        let mut guard = self.inner.write().expect("catalog lock poisoned");
        let version = guard.version + 1;
        *guard = Arc::new(CatalogSnapshot {
            version,
            loaded_at: Utc::now(),
            sources,
        });
        version
    }
}
