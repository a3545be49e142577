//! REST bodies and paths shared by [`crate::HttpTransport`] and `udf-node`.

use serde::{Deserialize, Serialize};
use udf_common::{ContentHash, NodeId};

/// Prefix of every API route.
pub const API_PREFIX: &str = "/api/v1";

/// A cluster member as advertised by `GET /api/v1/cluster/nodes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: NodeId,
    /// Base URL, e.g. `http://10.0.0.2:3000`.
    pub address: String,
}

/// Body of `GET /api/v1/udf/{name}/hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashResponse {
    pub hash: ContentHash,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query string accepted by the put and get routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<u32>,
}

/// Path of a module resource.
pub fn module_path(name: &str) -> String {
    format!("{}/udf/{}", API_PREFIX, encode_segment(name))
}

/// Path of a module's hash on the answering node.
pub fn module_hash_path(name: &str) -> String {
    format!("{}/hash", module_path(name))
}

/// Path used for node-to-node replication of a module.
pub fn replica_path(name: &str) -> String {
    format!("{}/internal/replica/{}", API_PREFIX, encode_segment(name))
}

/// Percent-encodes a single path segment.
///
/// Module names are validated not to contain `/`, but may contain spaces
/// or other characters that are not valid in a URI path.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
