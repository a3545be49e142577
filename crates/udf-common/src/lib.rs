//! # UDF Common
//! 
//! Common types, fingerprints, and the error taxonomy shared across the
//! UDF module registry workspace.
//! 
//! This crate provides the foundational abstractions that the client core,
//! the transports, and the reference node all build upon.

pub mod duration_serde;
pub mod errors;
pub mod fingerprint;
pub mod types;

// Re-export commonly used items
pub use errors::{Error, ErrorContext, ErrorKind, Result, ResultExt};
pub use fingerprint::ContentHash;
pub use types::{ModuleListing, ModuleName, NodeId, UdfFileSummary, UdfLanguage, UdfModule};
