//! Hashing primitives for MedChain
//!
//! Everything that ends up in a digest goes through [`canonical_string`], so
//! two values with the same logical content hash identically no matter how
//! (or on which node) their fields were populated.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hex encoded SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Raw SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Rebuilds `value` with every object's keys in ascending order.
///
/// serde_json keeps insertion order when the `preserve_order` feature is
/// unified in by another crate, so the ordering is enforced here rather than
/// relying on the default `BTreeMap` backing.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Compact, key-sorted JSON text of `value`.
pub fn canonical_string(value: Value) -> String {
    canonicalize(value).to_string()
}

/// SHA-256 over the canonical text of `value`.
pub fn canonical_hash(value: Value) -> String {
    sha256_hex(canonical_string(value).as_bytes())
}
