//! Node configuration loaded from YAML.
//!
//! ```yaml
//! node:
//!   id: node-1
//!   port: 3000
//!   max_module_size: 1048576
//!   replication_delay: 200ms
//!   peers:
//!     - id: node-2
//!       address: http://127.0.0.1:3001
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::types::PeerConfig;

/// Top-level node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node: NodeOptions,
}

/// Options for a single node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOptions {
    pub id: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL advertised to clients; derived from host and port when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise_address: Option<String>,
    #[serde(default = "default_max_module_size")]
    pub max_module_size: u64,
    /// Artificial lag before each replication request
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "udf_common::duration_serde::option"
    )]
    pub replication_delay: Option<Duration>,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl NodeOptions {
    /// Options for a node with default settings and no peers.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: default_host(),
            port: default_port(),
            advertise_address: None,
            max_module_size: default_max_module_size(),
            replication_delay: None,
            peers: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: NodeConfig = serde_yaml::from_str(content)
            .context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let node = &self.node;

        if node.id.is_empty() {
            return Err(anyhow!("node.id cannot be empty"));
        }

        if node.max_module_size == 0 {
            return Err(anyhow!("node.max_module_size must be greater than 0"));
        }

        match node.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(anyhow!("Invalid log level: {}, must be one of: trace, debug, info, warn, error", node.log_level)),
        }

        // Check for duplicate IDs
        let mut ids = HashSet::new();
        ids.insert(node.id.as_str());
        for peer in &node.peers {
            if !ids.insert(peer.id.as_str()) {
                return Err(anyhow!("Duplicate node ID: {}", peer.id));
            }
            if !peer.address.starts_with("http://") {
                return Err(anyhow!("Peer {} address must be an http:// URL, got: {}", peer.id, peer.address));
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_module_size() -> u64 {
    1_048_576
}

fn default_log_level() -> String {
    "info".to_string()
}
