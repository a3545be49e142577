//! # UDF Client
//!
//! Client-side registry for user-defined function modules on a clustered
//! key-value store.
//!
//! This crate provides:
//! - [`ModuleRegistry`]: put, remove, list and get of UDF modules
//! - [`ModuleBlobReader`]: size-capped reading of UDF source files
//! - [`ConvergenceWaiter`]: polling until every node holds a module
//! - [`translate`]: transport failures mapped to the error taxonomy
//! - [`Session`]: the explicit connection handle every operation takes
//! - [`ClientConfig`]: YAML configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use udf_client::{InfoPolicy, ModuleRegistry, Session, SessionDefaults};
//! use udf_common::UdfLanguage;
//! use udf_transport::MemoryCluster;
//!
//! let session = Session::connect(Arc::new(MemoryCluster::with_nodes(3)), SessionDefaults::default()).await?;
//! let registry = ModuleRegistry::new();
//! registry.put(&session, "udf/avg.lua", UdfLanguage::Lua, &InfoPolicy::default()).await?;
//! let content = registry.get(&session, "avg.lua", UdfLanguage::Lua, &InfoPolicy::default()).await?;
//! ```

pub mod blob;
pub mod config;
pub mod convergence;
pub mod policy;
pub mod registry;
pub mod session;
pub mod translate;

// Re-export commonly used items
pub use blob::{ModuleBlobReader, DEFAULT_MAX_MODULE_SIZE};
pub use config::ClientConfig;
pub use convergence::{Converged, ConvergenceConfig, ConvergenceWaiter};
pub use policy::InfoPolicy;
pub use registry::{ModuleRegistry, RegistrationRequest};
pub use session::{Session, SessionDefaults};
