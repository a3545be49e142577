//! Local multi-node clusters for end-to-end tests

use std::sync::Arc;
use std::time::Duration;

use udf_client::{Session, SessionDefaults};
use udf_common::NodeId;
use udf_node::{NodeHandle, NodeOptions, NodeServer, PeerConfig};
use udf_transport::{HttpTransport, HttpTransportConfig};

/// Shape of a test cluster
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub nodes: usize,
    /// Lag each node adds before forwarding a write to its peers
    pub replication_delay: Option<Duration>,
    pub max_module_size: u64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            nodes: 3,
            replication_delay: None,
            max_module_size: 1_048_576,
        }
    }
}

/// Fully meshed nodes serving on ephemeral localhost ports
pub struct TestCluster {
    nodes: Vec<NodeHandle>,
}

impl TestCluster {
    /// Binds every node first so each one can be told where its peers are
    pub async fn start(options: ClusterOptions) -> Self {
        let mut servers = Vec::with_capacity(options.nodes);
        for i in 1..=options.nodes {
            let node_options = NodeOptions {
                host: "127.0.0.1".to_string(),
                port: 0,
                max_module_size: options.max_module_size,
                replication_delay: options.replication_delay,
                ..NodeOptions::new(format!("node-{}", i))
            };
            let server = NodeServer::bind(node_options)
                .await
                .expect("Failed to bind test node");
            servers.push(server);
        }

        let members: Vec<PeerConfig> = servers
            .iter()
            .map(|server| {
                let descriptor = server.descriptor();
                PeerConfig {
                    id: descriptor.id.as_str().to_string(),
                    address: descriptor.address,
                }
            })
            .collect();

        let nodes = servers
            .into_iter()
            .enumerate()
            .map(|(i, server)| {
                let peers = members
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, peer)| peer.clone())
                    .collect();
                server.with_peers(peers).spawn()
            })
            .collect();

        Self { nodes }
    }

    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> &NodeHandle {
        self.nodes
            .iter()
            .find(|node| node.id() == &NodeId::from(id))
            .unwrap_or_else(|| panic!("No node named {}", id))
    }

    /// Base URLs of every node
    pub fn seeds(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.address().to_string()).collect()
    }

    /// A transport seeded with every node
    pub fn transport(&self) -> HttpTransport {
        HttpTransport::new(HttpTransportConfig::new(self.seeds()))
    }

    /// A transport seeded with a single node
    pub fn transport_via(&self, id: &str) -> HttpTransport {
        HttpTransport::new(HttpTransportConfig::new(vec![self.node(id).address().to_string()]))
    }

    pub async fn connect(&self, defaults: SessionDefaults) -> Session {
        Session::connect(Arc::new(self.transport()), defaults)
            .await
            .expect("Failed to connect to test cluster")
    }

    pub async fn shutdown(self) {
        for node in self.nodes {
            let id = node.id().clone();
            if let Err(e) = node.shutdown().await {
                eprintln!("Node {} did not shut down cleanly: {}", id, e);
            }
        }
    }
}
