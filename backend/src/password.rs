use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

use crate::error::HashError;

/// Length of every digest produced by [`hash`]: Base64 of a 32-byte SHA-256 output.
pub const DIGEST_LEN: usize = 44;

/// hash
///
/// One-way, unsalted SHA-256 of the UTF-8 password bytes, Base64 encoded.
///
/// The output is deterministic because login re-hashes the submitted password and
/// compares digests for equality. Existing accounts depend on this exact format, so
/// switching to a salted scheme needs a migration of the stored digests first.
pub fn hash(plaintext: &str) -> Result<String, HashError> {
    if plaintext.is_empty() {
        return Err(HashError::InvalidInput);
    }

    let digest = Sha256::digest(plaintext.as_bytes());
    Ok(STANDARD.encode(digest))
}
