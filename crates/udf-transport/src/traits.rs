//! The transport contract.
//!
//! # Rust Learning Note
//!
//! This module defines a **trait-based seam** between the registry core
//! and whatever actually talks to the cluster.
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait Transport: Send + Sync {
//!     async fn submit_module(&self, ...) -> TransportResult<()>;
//! }
//! ```
//!
//! 1. **Thread Safety**: `Send + Sync` lets one transport be shared by
//!    concurrent operations behind an `Arc<dyn Transport>`.
//! 2. **Async**: `async_trait` boxes the returned futures so the trait
//!    stays object safe.
//! 3. **Swappable**: tests use [`crate::MemoryCluster`], the CLI uses
//!    [`crate::HttpTransport`]; the core never knows which.

use std::time::Duration;

use async_trait::async_trait;
use udf_common::{ContentHash, ModuleListing, NodeId, UdfLanguage};

use crate::error::TransportResult;

/// Wire access to a UDF-capable cluster.
///
/// Cluster-wide calls (`submit_module`, `remove_module`, `list_modules`,
/// `fetch_module`) may be served by any node. `fetch_module_hash_on_node`
/// asks one specific node what it currently holds, which is what the
/// convergence check needs.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stores a module cluster-wide, replacing any module of the same name.
    async fn submit_module(
        &self,
        name: &str,
        language: UdfLanguage,
        content: &[u8],
        timeout: Duration,
    ) -> TransportResult<()>;

    /// Removes a module. Fails with `NotFound` when no such module exists.
    async fn remove_module(&self, name: &str, timeout: Duration) -> TransportResult<()>;

    /// Lists every registered module in one round trip.
    async fn list_modules(&self, timeout: Duration) -> TransportResult<Vec<ModuleListing>>;

    /// Fetches the stored content of a module.
    async fn fetch_module(
        &self,
        name: &str,
        language: UdfLanguage,
        timeout: Duration,
    ) -> TransportResult<Vec<u8>>;

    /// Returns the nodes currently considered part of the cluster.
    async fn list_cluster_nodes(&self) -> TransportResult<Vec<NodeId>>;

    /// Returns the hash a single node reports for `name`.
    ///
    /// `NotFound` means the node does not (yet) hold the module.
    async fn fetch_module_hash_on_node(
        &self,
        node: &NodeId,
        name: &str,
        timeout: Duration,
    ) -> TransportResult<ContentHash>;
}
