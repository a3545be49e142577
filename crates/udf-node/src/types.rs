//! Data types for the reference node.
//!
//! # Rust Learning Note
//!
//! Stored content is kept as [`bytes::Bytes`]: cloning it only bumps a
//! reference count, so handing the same module to the HTTP response and
//! to every replication worker never copies the payload.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use udf_common::{ContentHash, ModuleListing, UdfLanguage};

/// A module as held by one node.
#[derive(Debug, Clone)]
pub struct StoredModule {
    pub language: UdfLanguage,
    pub content: Bytes,
    /// Fingerprint of `content`, computed on write.
    pub hash: ContentHash,
    /// When this node last wrote the entry.
    pub updated_at: DateTime<Utc>,
}

impl StoredModule {
    /// Builds an entry and fingerprints its content.
    pub fn new(language: UdfLanguage, content: Bytes) -> Self {
        let hash = ContentHash::of(&content);
        Self {
            language,
            content,
            hash,
            updated_at: Utc::now(),
        }
    }

    pub fn listing(&self, name: &str) -> ModuleListing {
        ModuleListing {
            name: name.to_string(),
            language: self.language,
            hash: self.hash,
        }
    }
}

/// A peer node this node replicates writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub id: String,
    /// Base URL, e.g. `http://10.0.0.2:3000`.
    pub address: String,
}
