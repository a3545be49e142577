//! In-memory module storage for a node.
//!
//! # Rust Learning Note
//!
//! This module demonstrates **concurrent data structures** in Rust.
//!
//! ```rust,ignore
//! struct ModuleStore {
//!     modules: Arc<DashMap<String, StoredModule>>,
//! }
//!
//! fn get(&self, name: &str) -> Option<StoredModule> {
//!     self.modules.get(name).map(|entry| entry.clone())
//! }
//! // No manual locking needed!
//! ```
//!
//! `DashMap` shards its locks internally, and every method here takes
//! `&self`: this is **interior mutability**, so the store can be shared by
//! all request handlers and the test harness at once.
//!
//! A `Ref` returned by `DashMap::get` holds a shard lock, so entries are
//! cloned out before returning rather than handing the guard to callers.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tracing::info;
use udf_common::{ContentHash, ModuleListing, UdfLanguage};

use crate::types::StoredModule;

/// Thread-safe in-memory module storage.
#[derive(Clone, Default)]
pub struct ModuleStore {
    modules: Arc<DashMap<String, StoredModule>>,
}

impl ModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a module, replacing any module of the same name.
    pub fn put(&self, name: &str, language: UdfLanguage, content: Bytes) -> ContentHash {
        let module = StoredModule::new(language, content);
        let hash = module.hash;

        if self.modules.insert(name.to_string(), module).is_some() {
            info!(module = name, %hash, "Replaced UDF module");
        } else {
            info!(module = name, %hash, "Stored new UDF module");
        }

        hash
    }

    /// Returns a copy of the stored entry.
    pub fn get(&self, name: &str) -> Option<StoredModule> {
        self.modules.get(name).map(|entry| entry.clone())
    }

    /// Returns the fingerprint of a stored module.
    pub fn hash_of(&self, name: &str) -> Option<ContentHash> {
        self.modules.get(name).map(|entry| entry.hash)
    }

    /// Lists every module, sorted by name.
    pub fn list(&self) -> Vec<ModuleListing> {
        let mut listings: Vec<ModuleListing> = self
            .modules
            .iter()
            .map(|entry| entry.value().listing(entry.key()))
            .collect();
        listings.sort_by(|a, b| a.name.cmp(&b.name));
        listings
    }

    /// Removes a module, returning it if it was present.
    pub fn remove(&self, name: &str) -> Option<StoredModule> {
        let removed = self.modules.remove(name).map(|(_, module)| module);
        if removed.is_some() {
            info!(module = name, "Removed UDF module");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.modules.len()
    }
}
