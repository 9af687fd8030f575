//! Author pseudonymisation for captured items.
//!
//! When a dataset is submitted with the `pseudonymise` flag, author
//! fields in the result set are replaced by a keyed hash so the same
//! author maps to the same pseudonym within a deployment, but the
//! original name cannot be recovered without the salt.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Keyed pseudonym generator.
///
/// The salt comes from deployment configuration and must be identical
/// across workers so pseudonyms stay stable between datasets.
#[derive(Clone)]
pub struct Pseudonymiser {
    salt: Vec<u8>,
}

impl Pseudonymiser {
    pub fn new(salt: &str) -> Self {
        Self {
            salt: salt.as_bytes().to_vec(),
        }
    }

    /// Map an author identifier to its pseudonym.
    ///
    /// Empty values stay empty: an absent author is not an identity to
    /// protect, and hashing it would make all absent authors look like
    /// one very active user.
    pub fn pseudonym(&self, value: &str) -> String {
        if value.is_empty() {
            return String::new();
        }
        let mut mac =
            HmacSha256::new_from_slice(&self.salt).expect("HMAC accepts keys of any length");
        mac.update(value.as_bytes());
        let digest = mac.finalize().into_bytes();
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}
