//! Waiting for a submitted module to be visible on every node.
//!
//! # Rust Learning Note
//!
//! This module demonstrates **deadline-bounded polling** on tokio:
//!
//! ```rust,ignore
//! let round = poll_pending_nodes(...);
//! match tokio::time::timeout_at(deadline, round).await {
//!     Ok(reports) => { /* record satisfied nodes */ }
//!     Err(_) => { /* deadline hit: the round future is dropped */ }
//! }
//! tokio::time::sleep(interval).await; // yields, never busy-waits
//! ```
//!
//! Dropping a future cancels it, so a per-node request still in flight
//! when the deadline fires does not outlive the wait.
//!
//! ## Node set
//!
//! The node list is re-read at the start of every poll round:
//!
//! - a node that joins mid-wait must also report the expected hash
//! - a node that leaves mid-wait is no longer required
//! - a node that has reported the expected hash once stays satisfied
//!
//! Only the very first listing is mandatory. If a later listing fails the
//! previously observed node set is kept.
//!
//! Two puts of the same name racing each other may each observe the
//! other's hash and report convergence for content that was replaced.
//! The server is the source of truth; no client-side lock prevents this.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use udf_common::{ContentHash, Error, NodeId, Result};
use udf_transport::{Transport, TransportError};

use crate::translate::{translate, Operation};

/// Timing of a convergence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceConfig {
    /// Total time allowed before `ConvergenceTimeout`.
    pub timeout: Duration,
    /// Delay after the first poll round.
    pub poll_interval: Duration,
    /// Upper bound for the doubling poll delay.
    pub max_poll_interval: Duration,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(50),
            max_poll_interval: Duration::from_millis(500),
        }
    }
}

/// Outcome of a successful wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converged {
    /// Nodes that reported the expected hash, sorted.
    pub nodes: Vec<NodeId>,
    pub elapsed: Duration,
}

/// Per-wait bookkeeping. Only the waiter touches it.
#[derive(Debug)]
struct ConvergenceState {
    target_name: String,
    target_hash: ContentHash,
    /// Nodes from the latest successful listing that have not yet matched.
    nodes_pending: BTreeSet<NodeId>,
    /// Nodes that have reported the expected hash at least once.
    satisfied: HashSet<NodeId>,
    deadline: Instant,
}

impl ConvergenceState {
    fn new(target_name: &str, target_hash: ContentHash, deadline: Instant) -> Self {
        Self {
            target_name: target_name.to_string(),
            target_hash,
            nodes_pending: BTreeSet::new(),
            satisfied: HashSet::new(),
            deadline,
        }
    }

    /// Replaces the required node set with a fresh listing.
    fn observe_nodes(&mut self, nodes: Vec<NodeId>) {
        let current: HashSet<NodeId> = nodes.into_iter().collect();
        self.satisfied.retain(|node| current.contains(node));
        self.nodes_pending = current
            .into_iter()
            .filter(|node| !self.satisfied.contains(node))
            .collect();
    }

    fn record(&mut self, node: NodeId, reported: &std::result::Result<ContentHash, TransportError>) {
        match reported {
            Ok(hash) if *hash == self.target_hash => {
                trace!(module = %self.target_name, node = %node, "Node reports expected hash");
                self.nodes_pending.remove(&node);
                self.satisfied.insert(node);
            }
            Ok(hash) => {
                trace!(module = %self.target_name, node = %node, hash = %hash, "Node reports a different hash");
            }
            Err(e) => {
                trace!(module = %self.target_name, node = %node, "Node not yet satisfied: {}", e);
            }
        }
    }

    fn is_converged(&self) -> bool {
        self.nodes_pending.is_empty()
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn converged_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.satisfied.iter().cloned().collect();
        nodes.sort();
        nodes
    }
}

/// Polls cluster nodes until each reports the expected hash for a module.
pub struct ConvergenceWaiter<'a> {
    transport: &'a dyn Transport,
    config: ConvergenceConfig,
}

impl<'a> ConvergenceWaiter<'a> {
    pub fn new(transport: &'a dyn Transport, config: ConvergenceConfig) -> Self {
        Self { transport, config }
    }

    /// Waits until every known node reports `expected` for `name`.
    ///
    /// Fails with `ClusterUnreachable` if the node list cannot be obtained
    /// at the start, and with `ConvergenceTimeout` (listing the nodes still
    /// pending) if the deadline elapses first.
    pub async fn wait(&self, name: &str, expected: ContentHash) -> Result<Converged> {
        let started = Instant::now();
        let mut state = ConvergenceState::new(name, expected, started + self.config.timeout);
        let mut interval = self.config.poll_interval;

        self.first_listing(&mut state).await?;

        loop {
            let remaining = state.remaining();
            if remaining.is_zero() {
                break;
            }

            let round = self.poll_pending(&state, remaining);
            match tokio::time::timeout_at(state.deadline, round).await {
                Ok(reports) => {
                    for (node, reported) in reports {
                        state.record(node, &reported);
                    }
                }
                Err(_) => break,
            }

            if state.is_converged() {
                let converged = Converged {
                    nodes: state.converged_nodes(),
                    elapsed: started.elapsed(),
                };
                info!(
                    module = %name,
                    hash = %expected,
                    nodes = converged.nodes.len(),
                    "UDF module converged in {:?}",
                    converged.elapsed
                );
                return Ok(converged);
            }

            let remaining = state.remaining();
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(interval.min(remaining)).await;
            interval = interval.saturating_mul(2).min(self.config.max_poll_interval);

            self.refresh_listing(&mut state).await;
        }

        let pending: Vec<NodeId> = state.nodes_pending.iter().cloned().collect();
        warn!(
            module = %name,
            hash = %expected,
            "UDF module did not converge within {:?}; pending nodes: {:?}",
            self.config.timeout,
            pending
        );
        Err(Error::convergence_timeout(name, self.config.timeout, pending))
    }

    async fn first_listing(&self, state: &mut ConvergenceState) -> Result<()> {
        let nodes = match tokio::time::timeout_at(state.deadline, self.transport.list_cluster_nodes()).await {
            Ok(Ok(nodes)) => nodes,
            Ok(Err(e)) => return Err(translate(Operation::ListNodes, None, e)),
            Err(_) => {
                return Err(Error::cluster_unreachable(
                    "timed out listing cluster nodes",
                ))
            }
        };

        if nodes.is_empty() {
            return Err(Error::cluster_unreachable("cluster reports no nodes"));
        }

        debug!(module = %state.target_name, nodes = nodes.len(), "Waiting for convergence");
        state.observe_nodes(nodes);
        Ok(())
    }

    async fn refresh_listing(&self, state: &mut ConvergenceState) {
        match tokio::time::timeout_at(state.deadline, self.transport.list_cluster_nodes()).await {
            Ok(Ok(nodes)) if !nodes.is_empty() => state.observe_nodes(nodes),
            Ok(Ok(_)) => debug!("Node listing returned no nodes; keeping previous node set"),
            Ok(Err(e)) => debug!("Node listing failed, keeping previous node set: {}", e),
            Err(_) => trace!("Deadline reached while listing nodes"),
        }
    }

    /// Queries every pending node concurrently.
    async fn poll_pending(
        &self,
        state: &ConvergenceState,
        remaining: Duration,
    ) -> Vec<(NodeId, std::result::Result<ContentHash, TransportError>)> {
        let name = state.target_name.as_str();
        let queries = state.nodes_pending.iter().map(|node| async move {
            let reported = self
                .transport
                .fetch_module_hash_on_node(node, name, remaining)
                .await;
            (node.clone(), reported)
        });
        join_all(queries).await
    }
}
