//! Content fingerprints for UDF modules.
//!
//! Nodes and clients compare module content by digest instead of by bytes.
//! The digest is pinned to SHA-256: changing it breaks convergence checks
//! between clients and nodes built from different versions.
//!
//! # Rust Learning Note
//!
//! ## Newtype over a fixed-size array
//!
//! ```rust
//! pub struct ContentHash([u8; 32]);
//! ```
//!
//! A `[u8; 32]` is `Copy`, lives on the stack, and compares with `==`.
//! Wrapping it in a newtype means a hash can't be confused with any other
//! 32-byte value (a node key, a nonce) at compile time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of a content hash in bytes.
pub const HASH_LEN: usize = 32;

/// SHA-256 digest of a module's content.
///
/// # Example
/// ```
/// use udf_common::ContentHash;
///
/// let hash = ContentHash::of(b"function avg(...) end");
/// let parsed: ContentHash = hash.to_hex().parse().unwrap();
/// assert_eq!(hash, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Computes the fingerprint of `content`.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Returns the lower-case hex rendering used on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns true if `content` hashes to this value.
    pub fn matches(&self, content: &[u8]) -> bool {
        Self::of(content) == *self
    }
}

/// Error returned when parsing a hex hash fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid content hash '{input}': {reason}")]
pub struct ParseHashError {
    input: String,
    reason: String,
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseHashError {
            input: s.to_string(),
            reason: e.to_string(),
        })?;

        let bytes: [u8; HASH_LEN] = bytes.try_into().map_err(|v: Vec<u8>| ParseHashError {
            input: s.to_string(),
            reason: format!("expected {} bytes, got {}", HASH_LEN, v.len()),
        })?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
