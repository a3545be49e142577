//! Asynchronous replication of client writes to peer nodes.
//!
//! # Rust Learning Note
//!
//! Each peer gets its own worker task fed through an unbounded `mpsc`
//! channel:
//!
//! ```text
//! put handler ──send(op)──► [peer node-2 queue] ──► worker ──PUT──► node-2
//!             └─send(op)──► [peer node-3 queue] ──► worker ──PUT──► node-3
//! ```
//!
//! - The handler never waits for peers; it answers the client as soon as
//!   the local store is updated.
//! - One worker per peer applies operations in the order they were
//!   accepted, so a remove cannot overtake the put it follows.
//! - When the last `Replicator` clone is dropped the channels close and
//!   the workers exit.
//!
//! Replica writes received from peers are stored without being forwarded
//! again.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use udf_common::UdfLanguage;
use udf_transport::wire::replica_path;

use crate::types::PeerConfig;

const REPLICA_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// A write to apply on a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaOp {
    Put {
        name: String,
        language: UdfLanguage,
        content: Bytes,
    },
    Remove {
        name: String,
    },
}

impl ReplicaOp {
    fn name(&self) -> &str {
        match self {
            ReplicaOp::Put { name, .. } | ReplicaOp::Remove { name } => name,
        }
    }
}

/// Handle for queueing operations to every peer.
#[derive(Clone, Default)]
pub struct Replicator {
    peers: Vec<(String, mpsc::UnboundedSender<ReplicaOp>)>,
}

impl Replicator {
    /// A replicator with no peers.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Spawns one worker per peer. Must be called inside a tokio runtime.
    ///
    /// `delay` is slept before each operation is sent, to make propagation
    /// lag observable.
    pub fn start(peers: &[PeerConfig], delay: Option<Duration>) -> Self {
        let client: Client<HttpConnector, Full<Bytes>> =
            Client::builder(TokioExecutor::new()).build_http();

        let peers = peers
            .iter()
            .map(|peer| {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(peer_worker(client.clone(), peer.clone(), delay, rx));
                (peer.id.clone(), tx)
            })
            .collect();

        Self { peers }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Queues `op` for every peer.
    pub fn replicate(&self, op: ReplicaOp) {
        for (peer, tx) in &self.peers {
            if tx.send(op.clone()).is_err() {
                warn!(peer = %peer, module = op.name(), "Replication worker has stopped");
            }
        }
    }
}

async fn peer_worker(
    client: Client<HttpConnector, Full<Bytes>>,
    peer: PeerConfig,
    delay: Option<Duration>,
    mut rx: mpsc::UnboundedReceiver<ReplicaOp>,
) {
    debug!(peer = %peer.id, "Replication worker started");

    while let Some(op) = rx.recv().await {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut attempt = 1;
        loop {
            match send_op(&client, &peer, &op).await {
                Ok(()) => {
                    debug!(peer = %peer.id, module = op.name(), "Replicated");
                    break;
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    debug!(peer = %peer.id, module = op.name(), attempt, "Replication failed, retrying: {}", e);
                    tokio::time::sleep(RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(peer = %peer.id, module = op.name(), "Replication failed: {}", e);
                    break;
                }
            }
        }
    }

    debug!(peer = %peer.id, "Replication worker stopped");
}

async fn send_op(
    client: &Client<HttpConnector, Full<Bytes>>,
    peer: &PeerConfig,
    op: &ReplicaOp,
) -> Result<(), String> {
    let base = peer.address.trim_end_matches('/');

    let req = match op {
        ReplicaOp::Put {
            name,
            language,
            content,
        } => Request::builder()
            .method(Method::PUT)
            .uri(format!("{}{}?language={}", base, replica_path(name), language.code()))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(Full::new(content.clone())),
        ReplicaOp::Remove { name } => Request::builder()
            .method(Method::DELETE)
            .uri(format!("{}{}", base, replica_path(name)))
            .body(Full::new(Bytes::new())),
    }
    .map_err(|e| format!("Failed to build request: {}", e))?;

    let exchange = async {
        let resp = client
            .request(req)
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        let status = resp.status();
        // Drain the body so the connection can be reused
        let _ = resp.into_body().collect().await;
        Ok::<_, String>(status)
    };

    let status = tokio::time::timeout(REPLICA_TIMEOUT, exchange)
        .await
        .map_err(|_| format!("Timed out after {:?}", REPLICA_TIMEOUT))??;

    if status.is_success() {
        Ok(())
    } else {
        Err(format!("Peer answered {}", status))
    }
}
