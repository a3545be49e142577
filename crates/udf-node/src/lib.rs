//! # UDF Node
//!
//! A storage node for UDF modules, used to host a local cluster for the
//! registry client and its end-to-end tests.
//!
//! This crate provides:
//! - In-memory module storage (thread-safe with DashMap)
//! - HTTP API for writing, reading, listing and fingerprinting modules
//! - Asynchronous replication of writes to peer nodes
//! - Standalone server executable

pub mod api;
pub mod config;
pub mod replication;
pub mod server;
pub mod storage;
pub mod types;

// Re-export commonly used items
pub use config::{NodeConfig, NodeOptions};
pub use server::{NodeError, NodeHandle, NodeServer};
pub use storage::ModuleStore;
pub use types::{PeerConfig, StoredModule};
