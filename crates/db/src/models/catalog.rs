//! Catalog rows as stored; the domain-facing shape lives in
//! `magpie_core::catalog`.

use serde::Serialize;
use sqlx::FromRow;

use magpie_core::types::Timestamp;

/// Board selection mode stored in `datasources.boards_mode`.
pub const BOARDS_MODE_ANY: &str = "any";
pub const BOARDS_MODE_ENUMERATED: &str = "enumerated";

/// A row from the `datasources` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DatasourceRow {
    pub id: String,
    pub name: String,
    pub boards_mode: String,
}

/// A row from the `boards` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BoardRow {
    pub datasource: String,
    pub name: String,
    pub post_count: i64,
    pub first_post_at: Option<Timestamp>,
    pub last_post_at: Option<Timestamp>,
}
