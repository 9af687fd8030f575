//! Default dataset label generation.
//!
//! Submitted labels are free text and optional; when blank, a label is
//! derived from the selection and the submission time so every dataset
//! shows up with a readable name in result listings.

use crate::types::Timestamp;

/// Generate the default label for a dataset.
///
/// Convention: `{datasource}/{board} {date}` when a board was selected,
/// `{datasource} {date}` otherwise, with `date` in `YYYY-MM-DD HH:MM` UTC.
///
/// # Examples
///
/// ```
/// use chrono::TimeZone;
/// use magpie_core::naming::default_label;
///
/// let at = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
/// assert_eq!(default_label("reddit", Some("history"), at), "reddit/history 2024-03-01 12:30");
/// assert_eq!(default_label("twitter", None, at), "twitter 2024-03-01 12:30");
/// ```
pub fn default_label(datasource: &str, board: Option<&str>, submitted_at: Timestamp) -> String {
    let date = submitted_at.format("%Y-%m-%d %H:%M");
    match board {
        Some(board) => format!("{datasource}/{board} {date}"),
        None => format!("{datasource} {date}"),
    }
}

/// Pick the effective label for a submission: the user's label if it has
/// any non-whitespace content, the generated default otherwise.
pub fn effective_label(
    submitted: Option<&str>,
    datasource: &str,
    board: Option<&str>,
    submitted_at: Timestamp,
) -> String {
    match submitted.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => default_label(datasource, board, submitted_at),
    }
}
