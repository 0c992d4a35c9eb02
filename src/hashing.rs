//! Canonical serialization and hashing.
//!
//! Every digest in the ledger is the lowercase hex SHA-256 of a compact JSON
//! encoding. Field order comes from the struct declaration of the record being
//! hashed, never from map iteration, so two nodes hashing the same content
//! always agree.

use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex SHA-256 digest (64 lowercase characters).
pub type Sha256Hex = String;

/// Root of a tree with no leaves: SHA-256 of the empty byte string.
pub const EMPTY_ROOT: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Compact JSON encoding of `record`.
pub fn canonical_bytes<T: Serialize + ?Sized>(record: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

pub fn sha256_hex(bytes: &[u8]) -> Sha256Hex {
    hex::encode(Sha256::digest(bytes))
}

/// Digest of the canonical encoding of `record`.
pub fn hash_record<T: Serialize + ?Sized>(record: &T) -> Result<Sha256Hex> {
    Ok(sha256_hex(&canonical_bytes(record)?))
}

/// Interior Merkle node: hash of the two child digests concatenated as text.
pub fn hash_pair(left: &str, right: &str) -> Sha256Hex {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}

/// True when the first `difficulty` hex characters of `digest` are all `'0'`.
pub fn meets_difficulty(digest: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    digest.len() >= difficulty && digest.bytes().take(difficulty).all(|c| c == b'0')
}
