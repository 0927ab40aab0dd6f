//! Canonical keys for structural equality
//!
//! Provides [`CanonicalKey`], a 32-byte Blake3 digest of a value's canonical
//! JSON encoding. Two structurally equal values always produce the same key,
//! regardless of map insertion order.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte canonical digest (Blake3)
///
/// Cheap to copy and compare; used to deduplicate constraints and formatter
/// options without deep comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalKey([u8; 32]);

impl CanonicalKey {
    /// Wrap raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Digest arbitrary bytes
    #[inline]
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Digest the canonical JSON form of a serializable value
    ///
    /// Maps are re-encoded with sorted keys before hashing, so the result
    /// does not depend on field or insertion order.
    ///
    /// # Errors
    /// Returns error if the value cannot be represented as JSON
    pub fn of_serializable<T>(value: &T) -> Result<Self, HashError>
    where
        T: serde::Serialize,
    {
        let json = serde_json::to_value(value)?;
        Ok(Self::of_bytes(canonical_json(&json).as_bytes()))
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for CanonicalKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for CanonicalKey {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(HashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Encode JSON with object keys sorted at every level
#[must_use]
pub fn canonical_json(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();

            let parts: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    let encoded_key = Value::String(key.clone()).to_string();
                    format!("{}:{}", encoded_key, canonical_json(&map[key]))
                })
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<_> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        scalar => scalar.to_string(),
    }
}

/// Errors related to canonical keys
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Wrong digest length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Value could not be encoded as JSON
    #[error("encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}
