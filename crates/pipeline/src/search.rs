//! The standard processor: select a dataset's posts and stream them to
//! an NDJSON result file.

use async_trait::async_trait;

use magpie_core::pseudonymise::Pseudonymiser;
use magpie_core::types::Timestamp;
use magpie_db::models::post::Post;
use magpie_db::repositories::{DatasetRepo, PostRepo};
use serde::Serialize;

use crate::output::NdjsonWriter;
use crate::{ProcessContext, ProcessError, ProcessOutcome, Processor};

/// How many rows between progress updates on the dataset row.
const PROGRESS_EVERY: usize = 500;

/// One line of a board-search result file.
#[derive(Debug, Serialize)]
pub struct ResultItem {
    pub post_id: String,
    pub thread_id: Option<String>,
    pub board: Option<String>,
    pub author: Option<String>,
    pub posted_at: Timestamp,
    pub subject: Option<String>,
    pub body: String,
}

impl ResultItem {
    /// Build a result line from a captured post, applying
    /// pseudonymisation to the author field when requested.
    pub fn from_post(post: &Post, pseudonymiser: Option<&Pseudonymiser>) -> Self {
        let author = match (&post.author, pseudonymiser) {
            (Some(author), Some(p)) => Some(p.pseudonym(author)),
            (author, _) => author.clone(),
        };
        Self {
            post_id: post.post_id.clone(),
            thread_id: post.thread_id.clone(),
            board: post.board.clone(),
            author,
            posted_at: post.posted_at,
            subject: post.subject.clone(),
            body: post.body.clone(),
        }
    }
}

/// Selects the posts matching the dataset's datasource/board and writes
/// them oldest-first to `{key}.ndjson` under the data path.
pub struct BoardSearch;

#[async_trait]
impl Processor for BoardSearch {
    fn kind(&self) -> &'static str {
        "board-search"
    }

    async fn process(&self, ctx: ProcessContext<'_>) -> Result<ProcessOutcome, ProcessError> {
        let dataset = ctx.dataset;
        let posts = PostRepo::for_selection(
            ctx.pool,
            &dataset.datasource,
            dataset.board.as_deref(),
            ctx.max_rows,
        )
        .await?;

        tracing::debug!(
            dataset_key = %dataset.key,
            matched = posts.len(),
            "Board search selected posts",
        );

        let file_name = format!("{}.ndjson", dataset.key);
        let mut writer = NdjsonWriter::create(ctx.data_path, &file_name).await?;

        let total = posts.len();
        for (index, post) in posts.iter().enumerate() {
            let item = ResultItem::from_post(post, ctx.pseudonymiser);
            writer.write_row(&item).await?;

            let written = index + 1;
            if written % PROGRESS_EVERY == 0 {
                let percent = (written * 100 / total) as i16;
                DatasetRepo::update_progress(
                    ctx.pool,
                    &dataset.key,
                    percent,
                    Some(&format!("{written} of {total} items written")),
                )
                .await?;
            }
        }

        let num_rows = writer.finish().await?;
        Ok(ProcessOutcome {
            result_file: file_name,
            num_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(author: Option<&str>) -> Post {
        Post {
            id: 1,
            datasource: "forum-x".to_string(),
            board: Some("general".to_string()),
            thread_id: Some("t1".to_string()),
            post_id: "p1".to_string(),
            author: author.map(str::to_string),
            posted_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            subject: None,
            body: "hello".to_string(),
        }
    }

    #[test]
    fn author_kept_without_pseudonymiser() {
        let item = ResultItem::from_post(&post(Some("alice")), None);
        assert_eq!(item.author.as_deref(), Some("alice"));
    }

    #[test]
    fn author_replaced_with_pseudonym() {
        let p = Pseudonymiser::new("salt");
        let item = ResultItem::from_post(&post(Some("alice")), Some(&p));
        let author = item.author.unwrap();
        assert_ne!(author, "alice");
        assert_eq!(author, p.pseudonym("alice"));
    }

    #[test]
    fn missing_author_stays_missing() {
        let p = Pseudonymiser::new("salt");
        let item = ResultItem::from_post(&post(None), Some(&p));
        assert!(item.author.is_none());
    }
}
