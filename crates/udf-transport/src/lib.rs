//! # UDF Transport
//! 
//! The transport contract the registry core calls into, plus two
//! implementations of it.
//! 
//! This crate provides:
//! - The [`Transport`] trait (cluster-wide module operations and per-node
//!   hash queries)
//! - [`TransportError`], the low-level failure signals the core translates
//! - [`MemoryCluster`], a simulated multi-node cluster with controllable
//!   propagation delays
//! - [`HttpTransport`], a hyper client for the `udf-node` REST API
//! - [`wire`], request/response bodies shared with `udf-node`

pub mod error;
pub mod http;
pub mod memory;
pub mod traits;
pub mod wire;

// Re-export commonly used items
pub use error::{TransportError, TransportResult};
pub use http::{HttpTransport, HttpTransportConfig};
pub use memory::{MemoryCluster, NodeBehavior};
pub use traits::Transport;
