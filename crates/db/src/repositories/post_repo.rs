//! Repository for the `posts` table.

use sqlx::PgPool;

use crate::models::post::{NewPost, Post};

/// Column list for `posts` queries.
const COLUMNS: &str = "\
    id, datasource, board, thread_id, post_id, author, \
    posted_at, subject, body";

/// Provides read access for processors and inserts for import tooling.
pub struct PostRepo;

impl PostRepo {
    /// Insert a captured post, skipping duplicates.
    ///
    /// Returns `None` when a post with the same `(datasource, post_id)`
    /// already exists, mirroring how bulk dump imports behave.
    pub async fn insert(pool: &PgPool, input: &NewPost) -> Result<Option<Post>, sqlx::Error> {
        let query = format!(
            "INSERT INTO posts \
                 (datasource, board, thread_id, post_id, author, posted_at, subject, body) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (datasource, post_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(&input.datasource)
            .bind(&input.board)
            .bind(&input.thread_id)
            .bind(&input.post_id)
            .bind(&input.author)
            .bind(input.posted_at)
            .bind(&input.subject)
            .bind(&input.body)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the posts matching a dataset's selection, oldest first.
    ///
    /// A `None` board matches the whole data source; `max_rows` caps the
    /// result set size.
    pub async fn for_selection(
        pool: &PgPool,
        datasource: &str,
        board: Option<&str>,
        max_rows: i64,
    ) -> Result<Vec<Post>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM posts \
             WHERE datasource = $1 \
               AND ($2::text IS NULL OR board = $2) \
             ORDER BY posted_at ASC, id ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(datasource)
            .bind(board)
            .bind(max_rows)
            .fetch_all(pool)
            .await
    }
}
