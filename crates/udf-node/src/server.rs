//! Node server: listener, router and lifecycle.
//!
//! # Rust Learning Note
//!
//! Binding and serving are separate steps:
//!
//! ```rust,ignore
//! let server = NodeServer::bind(options).await?;   // port known now
//! let address = server.address();                   // share with peers
//! let handle = server.with_peers(peers).spawn();    // start serving
//! handle.shutdown().await?;                         // graceful stop
//! ```
//!
//! Binding first lets a node listen on port 0 and still tell other nodes
//! where to find it, which is how tests start whole clusters on
//! ephemeral ports.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;
use udf_common::NodeId;
use udf_transport::wire::NodeDescriptor;

use crate::api::{create_router, NodeState};
use crate::config::NodeOptions;
use crate::replication::Replicator;
use crate::storage::ModuleStore;
use crate::types::PeerConfig;

/// Errors from starting or running a node.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A bound, not yet serving, node.
pub struct NodeServer {
    options: NodeOptions,
    listener: TcpListener,
    local_addr: SocketAddr,
    store: ModuleStore,
}

impl NodeServer {
    /// Binds the listener described by `options`.
    pub async fn bind(options: NodeOptions) -> Result<Self, NodeError> {
        let address = format!("{}:{}", options.host, options.port);
        info!(node = %options.id, "Binding to TCP: {}", address);

        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| NodeError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| NodeError::Bind { address, source })?;

        Ok(Self {
            options,
            listener,
            local_addr,
            store: ModuleStore::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL clients and peers should use for this node.
    pub fn address(&self) -> String {
        if let Some(address) = &self.options.advertise_address {
            return address.trim_end_matches('/').to_string();
        }

        let host = match self.options.host.as_str() {
            "0.0.0.0" | "::" | "" => "127.0.0.1".to_string(),
            host => host.to_string(),
        };
        format!("http://{}:{}", host, self.local_addr.port())
    }

    pub fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            id: NodeId::new(self.options.id.clone()),
            address: self.address(),
        }
    }

    pub fn store(&self) -> &ModuleStore {
        &self.store
    }

    /// Replaces the configured peers.
    pub fn with_peers(mut self, peers: Vec<PeerConfig>) -> Self {
        self.options.peers = peers;
        self
    }

    /// Serves until the process is stopped.
    pub async fn run(self) -> Result<(), NodeError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes, then drains in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), NodeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let descriptor = self.descriptor();
        let peers: Vec<NodeDescriptor> = self
            .options
            .peers
            .iter()
            .map(|peer| NodeDescriptor {
                id: NodeId::new(peer.id.clone()),
                address: peer.address.trim_end_matches('/').to_string(),
            })
            .collect();

        let replicator = Replicator::start(&self.options.peers, self.options.replication_delay);

        info!(
            node = %descriptor.id,
            peers = peers.len(),
            "UDF node listening on {} (advertised as {})",
            self.local_addr,
            descriptor.address
        );

        let state = Arc::new(NodeState {
            node: descriptor,
            peers,
            store: self.store,
            replicator,
            max_module_size: self.options.max_module_size,
        });

        axum::serve(self.listener, create_router(state))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!(node = %self.options.id, "UDF node stopped");
        Ok(())
    }

    /// Serves on a background task.
    pub fn spawn(self) -> NodeHandle {
        let descriptor = self.descriptor();
        let store = self.store.clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(self.run_until(async move {
            let _ = shutdown_rx.await;
        }));

        NodeHandle {
            descriptor,
            store,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// A node serving on a background task.
pub struct NodeHandle {
    descriptor: NodeDescriptor,
    store: ModuleStore,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), NodeError>>,
}

impl NodeHandle {
    pub fn id(&self) -> &NodeId {
        &self.descriptor.id
    }

    pub fn address(&self) -> &str {
        &self.descriptor.address
    }

    pub fn store(&self) -> &ModuleStore {
        &self.store
    }

    /// Stops accepting connections and waits for the server task.
    pub async fn shutdown(self) -> Result<(), NodeError> {
        let _ = self.shutdown.send(());
        self.task
            .await
            .map_err(|e| NodeError::Serve(std::io::Error::other(e.to_string())))?
    }
}
