//! Repository for the data-source catalog tables.
//!
//! The catalog is maintained by the external collection/indexing process;
//! the application reads it into `magpie_core::catalog` snapshots. The
//! upsert methods exist for that process (and for test fixtures) — the
//! request path never writes here.

use sqlx::PgPool;

use magpie_core::catalog::{BoardInfo, BoardSet, DataSource};
use magpie_core::types::Timestamp;

use crate::models::catalog::{BoardRow, DatasourceRow, BOARDS_MODE_ANY};

/// Provides read and maintenance operations for the catalog tables.
pub struct CatalogRepo;

impl CatalogRepo {
    /// Load every data source with its enumerated boards, in display
    /// order, as domain descriptors ready for a catalog snapshot.
    pub async fn load_sources(pool: &PgPool) -> Result<Vec<DataSource>, sqlx::Error> {
        let sources = sqlx::query_as::<_, DatasourceRow>(
            "SELECT id, name, boards_mode FROM datasources ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await?;

        let boards = sqlx::query_as::<_, BoardRow>(
            "SELECT datasource, name, post_count, first_post_at, last_post_at \
             FROM boards \
             ORDER BY datasource ASC, name ASC",
        )
        .fetch_all(pool)
        .await?;

        let mut result = Vec::with_capacity(sources.len());
        for source in sources {
            let board_set = if source.boards_mode == BOARDS_MODE_ANY {
                BoardSet::Any
            } else {
                let listed = boards
                    .iter()
                    .filter(|b| b.datasource == source.id)
                    .map(|b| BoardInfo {
                        name: b.name.clone(),
                        post_count: b.post_count,
                        first_post_at: b.first_post_at,
                        last_post_at: b.last_post_at,
                    })
                    .collect();
                BoardSet::Boards(listed)
            };
            result.push(DataSource {
                id: source.id,
                name: source.name,
                boards: board_set,
            });
        }
        Ok(result)
    }

    /// Create or update a data source descriptor.
    pub async fn upsert_datasource(
        pool: &PgPool,
        id: &str,
        name: &str,
        boards_mode: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO datasources (id, name, boards_mode) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE \
                 SET name = EXCLUDED.name, \
                     boards_mode = EXCLUDED.boards_mode, \
                     updated_at = NOW()",
        )
        .bind(id)
        .bind(name)
        .bind(boards_mode)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Create or update one board's aggregate statistics.
    pub async fn upsert_board_stats(
        pool: &PgPool,
        datasource: &str,
        name: &str,
        post_count: i64,
        first_post_at: Option<Timestamp>,
        last_post_at: Option<Timestamp>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO boards (datasource, name, post_count, first_post_at, last_post_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (datasource, name) DO UPDATE \
                 SET post_count = EXCLUDED.post_count, \
                     first_post_at = EXCLUDED.first_post_at, \
                     last_post_at = EXCLUDED.last_post_at, \
                     updated_at = NOW()",
        )
        .bind(datasource)
        .bind(name)
        .bind(post_count)
        .bind(first_post_at)
        .bind(last_post_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
