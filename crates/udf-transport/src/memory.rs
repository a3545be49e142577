//! In-memory simulated cluster.
//!
//! # Rust Learning Note
//!
//! This module demonstrates **concurrent data structures** in Rust.
//!
//! ```rust,ignore
//! struct ClusterState {
//!     catalog: DashMap<String, StoredModule>,
//!     nodes: DashMap<NodeId, SimNode>,
//! }
//! ```
//!
//! `DashMap` shards its locks, so `&self` methods can mutate it from many
//! tasks at once. The one rule to remember: never hold a map guard across
//! an `.await`. Every method here copies what it needs out of the map
//! first, then sleeps.
//!
//! ## What is simulated
//!
//! - An authoritative catalog (what the cluster as a whole has accepted)
//! - Per-node replicas that become visible after a per-node delay, or
//!   never for a stalled node
//! - Nodes joining and leaving at runtime
//! - The whole cluster becoming unreachable, or rejecting submissions

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, trace};
use udf_common::{ContentHash, ModuleListing, NodeId, UdfLanguage};

use crate::error::{TransportError, TransportResult};
use crate::traits::Transport;

/// How a simulated node acknowledges writes and answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeBehavior {
    /// Delay before a write becomes visible on this node; `None` = never.
    pub propagation_delay: Option<Duration>,
    /// Time this node takes to answer a hash query.
    pub query_latency: Duration,
}

impl NodeBehavior {
    /// Writes are visible immediately.
    pub fn immediate() -> Self {
        Self {
            propagation_delay: Some(Duration::ZERO),
            query_latency: Duration::ZERO,
        }
    }

    /// Writes become visible after `delay`.
    pub fn delayed(delay: Duration) -> Self {
        Self {
            propagation_delay: Some(delay),
            query_latency: Duration::ZERO,
        }
    }

    /// Writes never become visible.
    pub fn stalled() -> Self {
        Self {
            propagation_delay: None,
            query_latency: Duration::ZERO,
        }
    }

    pub fn with_query_latency(mut self, latency: Duration) -> Self {
        self.query_latency = latency;
        self
    }

    fn visible_from(&self, now: Instant) -> Option<Instant> {
        self.propagation_delay.map(|delay| now + delay)
    }
}

impl Default for NodeBehavior {
    fn default() -> Self {
        Self::immediate()
    }
}

#[derive(Debug, Clone)]
struct StoredModule {
    language: UdfLanguage,
    content: Arc<Vec<u8>>,
    hash: ContentHash,
}

#[derive(Debug, Clone, Copy)]
struct Replica {
    hash: ContentHash,
    visible_at: Option<Instant>,
}

impl Replica {
    fn is_visible(&self, now: Instant) -> bool {
        self.visible_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
struct SimNode {
    behavior: NodeBehavior,
    replicas: HashMap<String, Replica>,
}

#[derive(Debug, Default)]
struct ClusterState {
    catalog: DashMap<String, StoredModule>,
    nodes: DashMap<NodeId, SimNode>,
    unreachable: AtomicBool,
    rejection: RwLock<Option<String>>,
    submit_calls: AtomicUsize,
    total_calls: AtomicUsize,
}

/// A simulated multi-node cluster implementing [`Transport`].
///
/// Clones share the same cluster, so a test can keep a handle for
/// manipulation while the registry owns another behind `Arc<dyn Transport>`.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use udf_transport::{MemoryCluster, NodeBehavior};
///
/// let cluster = MemoryCluster::new();
/// cluster.add_node("node-1", NodeBehavior::immediate());
/// cluster.add_node("node-2", NodeBehavior::delayed(Duration::from_millis(200)));
/// assert_eq!(cluster.node_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    state: Arc<ClusterState>,
}

impl MemoryCluster {
    /// Creates an empty cluster with no nodes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cluster of `count` nodes named `node-1..=node-count`, all
    /// acknowledging immediately.
    pub fn with_nodes(count: usize) -> Self {
        let cluster = Self::new();
        for i in 1..=count {
            cluster.add_node(format!("node-{}", i), NodeBehavior::immediate());
        }
        cluster
    }

    /// Adds (or replaces) a node. A joining node receives the current
    /// catalog after its own propagation delay.
    pub fn add_node(&self, id: impl Into<NodeId>, behavior: NodeBehavior) {
        let id = id.into();
        let now = Instant::now();
        let visible_at = behavior.visible_from(now);

        let replicas = self
            .state
            .catalog
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    Replica {
                        hash: entry.value().hash,
                        visible_at,
                    },
                )
            })
            .collect();

        debug!(node = %id, "Simulated node joined");
        self.state.nodes.insert(id, SimNode { behavior, replicas });
    }

    /// Removes a node from the cluster.
    pub fn remove_node(&self, id: &NodeId) -> bool {
        let removed = self.state.nodes.remove(id).is_some();
        if removed {
            debug!(node = %id, "Simulated node left");
        }
        removed
    }

    /// Changes a node's behaviour. Replicas not yet visible are re-timed
    /// from now, so releasing a stalled node lets it catch up.
    pub fn set_behavior(&self, id: &NodeId, behavior: NodeBehavior) {
        if let Some(mut node) = self.state.nodes.get_mut(id) {
            let now = Instant::now();
            node.behavior = behavior;
            for replica in node.replicas.values_mut() {
                if !replica.is_visible(now) {
                    replica.visible_at = behavior.visible_from(now);
                }
            }
        }
    }

    /// Makes every call fail with `Unreachable` while set.
    pub fn set_reachable(&self, reachable: bool) {
        self.state.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Makes submissions fail with a server error while set.
    pub fn reject_submissions(&self, reason: Option<String>) {
        if let Ok(mut rejection) = self.state.rejection.write() {
            *rejection = reason;
        }
    }

    pub fn node_count(&self) -> usize {
        self.state.nodes.len()
    }

    /// Number of modules in the authoritative catalog.
    pub fn module_count(&self) -> usize {
        self.state.catalog.len()
    }

    /// Number of `submit_module` calls received.
    pub fn submit_calls(&self) -> usize {
        self.state.submit_calls.load(Ordering::SeqCst)
    }

    /// Number of calls of any kind received.
    pub fn total_calls(&self) -> usize {
        self.state.total_calls.load(Ordering::SeqCst)
    }

    /// Returns true if `node` currently exposes `name` with `hash`.
    pub fn node_has(&self, node: &NodeId, name: &str, hash: &ContentHash) -> bool {
        let now = Instant::now();
        self.state
            .nodes
            .get(node)
            .and_then(|n| n.replicas.get(name).copied())
            .is_some_and(|r| r.is_visible(now) && r.hash == *hash)
    }

    fn begin_call(&self) -> TransportResult<()> {
        self.state.total_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::unreachable("simulated cluster is unreachable"));
        }
        Ok(())
    }

    fn current_rejection(&self) -> Option<String> {
        self.state
            .rejection
            .read()
            .ok()
            .and_then(|rejection| rejection.clone())
    }
}

#[async_trait]
impl Transport for MemoryCluster {
    async fn submit_module(
        &self,
        name: &str,
        language: UdfLanguage,
        content: &[u8],
        _timeout: Duration,
    ) -> TransportResult<()> {
        self.state.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_call()?;

        if let Some(reason) = self.current_rejection() {
            return Err(TransportError::Server(reason));
        }

        let hash = ContentHash::of(content);
        self.state.catalog.insert(
            name.to_string(),
            StoredModule {
                language,
                content: Arc::new(content.to_vec()),
                hash,
            },
        );

        let now = Instant::now();
        for mut node in self.state.nodes.iter_mut() {
            let visible_at = node.behavior.visible_from(now);
            node.replicas
                .insert(name.to_string(), Replica { hash, visible_at });
        }

        trace!(module = name, %hash, "Simulated submit accepted");
        Ok(())
    }

    async fn remove_module(&self, name: &str, _timeout: Duration) -> TransportResult<()> {
        self.begin_call()?;

        if self.state.catalog.remove(name).is_none() {
            return Err(TransportError::NotFound(name.to_string()));
        }
        for mut node in self.state.nodes.iter_mut() {
            node.replicas.remove(name);
        }

        trace!(module = name, "Simulated remove accepted");
        Ok(())
    }

    async fn list_modules(&self, _timeout: Duration) -> TransportResult<Vec<ModuleListing>> {
        self.begin_call()?;

        Ok(self
            .state
            .catalog
            .iter()
            .map(|entry| ModuleListing {
                name: entry.key().clone(),
                language: entry.value().language,
                hash: entry.value().hash,
            })
            .collect())
    }

    async fn fetch_module(
        &self,
        name: &str,
        language: UdfLanguage,
        _timeout: Duration,
    ) -> TransportResult<Vec<u8>> {
        self.begin_call()?;

        match self.state.catalog.get(name) {
            Some(stored) if stored.language == language => Ok(stored.content.to_vec()),
            _ => Err(TransportError::NotFound(name.to_string())),
        }
    }

    async fn list_cluster_nodes(&self) -> TransportResult<Vec<NodeId>> {
        self.begin_call()?;

        let mut nodes: Vec<NodeId> = self
            .state
            .nodes
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        nodes.sort();
        Ok(nodes)
    }

    async fn fetch_module_hash_on_node(
        &self,
        node: &NodeId,
        name: &str,
        timeout: Duration,
    ) -> TransportResult<ContentHash> {
        self.begin_call()?;

        let latency = self
            .state
            .nodes
            .get(node)
            .map(|n| n.behavior.query_latency)
            .ok_or_else(|| TransportError::unreachable(format!("node {} is not in the cluster", node)))?;

        // Guard dropped above; safe to sleep
        if latency > timeout {
            tokio::time::sleep(timeout).await;
            return Err(TransportError::Timeout(timeout));
        }
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let now = Instant::now();
        let replica = self
            .state
            .nodes
            .get(node)
            .ok_or_else(|| TransportError::unreachable(format!("node {} left the cluster", node)))?
            .replicas
            .get(name)
            .copied();

        match replica {
            Some(replica) if replica.is_visible(now) => Ok(replica.hash),
            _ => Err(TransportError::NotFound(name.to_string())),
        }
    }
}
