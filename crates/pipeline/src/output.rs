//! NDJSON result file writer.
//!
//! Rows are streamed to `{name}.part` and the file is renamed into place
//! on [`NdjsonWriter::finish`], so a result file is only ever visible in
//! its complete form.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::ProcessError;

/// Suffix for in-progress result files.
const PART_SUFFIX: &str = ".part";

/// Streaming writer producing one JSON object per line.
pub struct NdjsonWriter {
    writer: BufWriter<File>,
    part_path: PathBuf,
    final_path: PathBuf,
    rows: i64,
}

impl NdjsonWriter {
    /// Open `{dir}/{file_name}{.part}` for writing, truncating any
    /// leftover partial file from a previous crashed attempt.
    pub async fn create(dir: &Path, file_name: &str) -> Result<Self, ProcessError> {
        let final_path = dir.join(file_name);
        let part_path = dir.join(format!("{file_name}{PART_SUFFIX}"));
        let file = File::create(&part_path).await?;
        Ok(Self {
            writer: BufWriter::new(file),
            part_path,
            final_path,
            rows: 0,
        })
    }

    /// Append one row.
    pub async fn write_row<T: Serialize>(&mut self, row: &T) -> Result<(), ProcessError> {
        let mut line = serde_json::to_vec(row)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.rows += 1;
        Ok(())
    }

    /// Number of rows written so far.
    pub fn rows(&self) -> i64 {
        self.rows
    }

    /// Flush, move the file into its final place, and return the row count.
    pub async fn finish(mut self) -> Result<i64, ProcessError> {
        self.writer.flush().await?;
        self.writer.into_inner().sync_all().await?;
        tokio::fs::rename(&self.part_path, &self.final_path).await?;
        Ok(self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        id: u32,
        body: &'static str,
    }

    #[tokio::test]
    async fn rows_stream_to_final_file_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = NdjsonWriter::create(dir.path(), "out.ndjson").await.unwrap();

        writer.write_row(&Row { id: 1, body: "first" }).await.unwrap();
        writer.write_row(&Row { id: 2, body: "second" }).await.unwrap();
        assert_eq!(writer.rows(), 2);

        // Only the partial file exists until finish.
        assert!(dir.path().join("out.ndjson.part").exists());
        assert!(!dir.path().join("out.ndjson").exists());

        let rows = writer.finish().await.unwrap();
        assert_eq!(rows, 2);
        assert!(!dir.path().join("out.ndjson.part").exists());

        let content = std::fs::read_to_string(dir.path().join("out.ndjson")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(first["body"], "first");
    }

    #[tokio::test]
    async fn empty_result_file_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let writer = NdjsonWriter::create(dir.path(), "empty.ndjson").await.unwrap();

        let rows = writer.finish().await.unwrap();
        assert_eq!(rows, 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("empty.ndjson")).unwrap(),
            ""
        );
    }
}
