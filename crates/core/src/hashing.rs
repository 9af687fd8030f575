//! SHA-256 digest utilities and dataset key generation.
//!
//! A dataset key is the public identifier clients use to poll for status.
//! It is derived from the canonical submission parameters and the
//! submission timestamp, so re-submitting the same parameters later
//! yields a different key.

use crate::types::Timestamp;
use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Derive the public key for a dataset from its canonical parameters and
/// submission time.
///
/// `parameters` must be the canonical JSON parameter object stored with
/// the dataset. `serde_json` serializes object keys in sorted order, so
/// the same logical parameters always hash identically.
pub fn dataset_key(parameters: &serde_json::Value, submitted_at: Timestamp) -> String {
    let canonical = format!("{parameters}:{}", submitted_at.timestamp_micros());
    sha256_hex(canonical.as_bytes())
}
