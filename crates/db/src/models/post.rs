//! Captured post rows read by the board-search processor.

use serde::Serialize;
use sqlx::FromRow;

use magpie_core::types::{DbId, Timestamp};

/// A row from the `posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: DbId,
    pub datasource: String,
    pub board: Option<String>,
    pub thread_id: Option<String>,
    pub post_id: String,
    pub author: Option<String>,
    pub posted_at: Timestamp,
    pub subject: Option<String>,
    pub body: String,
}

/// Insert payload used by import tooling and test fixtures.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub datasource: String,
    pub board: Option<String>,
    pub thread_id: Option<String>,
    pub post_id: String,
    pub author: Option<String>,
    pub posted_at: Timestamp,
    pub subject: Option<String>,
    pub body: String,
}
