//! API key generation and hashing
//!
//! Raw keys are `lk_` followed by 64 hex characters (32 random bytes). Only
//! the SHA-256 digest is persisted, hex encoded, and used as the lookup key.
//! No salt: the raw key is already 256 bits of entropy.
//!
//! Keys are passed via the `X-API-Key` header.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Recognizable prefix on every raw key
pub const API_KEY_PREFIX: &str = "lk_";

/// Header carrying the raw key
pub const API_KEY_HEADER: &str = "x-api-key";

const KEY_BYTES: usize = 32;

/// A newly generated key: the raw value goes to the caller once, the digest to storage
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    pub raw: String,
    pub digest: String,
}

/// Deterministic digest of a raw key (lowercase hex SHA-256, 64 chars)
pub fn hash_api_key(raw_key: &str) -> String {
    hex::encode(Sha256::digest(raw_key.as_bytes()))
}

/// Generate a fresh high-entropy key and its digest
pub fn generate_api_key() -> GeneratedApiKey {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);

    let raw = format!("{}{}", API_KEY_PREFIX, hex::encode(bytes));
    let digest = hash_api_key(&raw);
    GeneratedApiKey { raw, digest }
}

/// Extract the raw key from the header value, ignoring blanks
pub fn extract_api_key(header: Option<&str>) -> Option<&str> {
    header.map(str::trim).filter(|h| !h.is_empty())
}
