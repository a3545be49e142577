//! HTTP API handlers using axum.
//!
//! # Rust Learning Note
//!
//! This module demonstrates **axum** extractors over a shared node state.
//!
//! ```rust,ignore
//! async fn put_handler(
//!     State(state): State<Arc<NodeState>>,
//!     Path(name): Path<String>,
//!     Query(query): Query<LanguageQuery>,
//!     body: Bytes,
//! ) -> Result<StatusCode, ApiError> {
//!     // ... store and replicate
//!     Ok(StatusCode::NO_CONTENT)
//! }
//! ```
//!
//! 1. **Extractors**: `Path` percent-decodes the module name, `Query`
//!    parses `?language=0`, and `Bytes` takes the raw body untouched.
//! 2. **Errors as values**: handlers return `ApiError`, which implements
//!    `IntoResponse`, so `?` turns a failure into an HTTP status.
//!
//! ## Routes
//!
//! | Method | Path | Answer |
//! |--------|------|--------|
//! | PUT | `/api/v1/udf/:name?language=` | 204 |
//! | DELETE | `/api/v1/udf/:name` | 204, 404 |
//! | GET | `/api/v1/udf` | JSON listing |
//! | GET | `/api/v1/udf/:name?language=` | raw content, 404 |
//! | GET | `/api/v1/udf/:name/hash` | `{ "hash": .. }`, 404 |
//! | GET | `/api/v1/cluster/nodes` | `[{ id, address }]` |
//! | GET | `/api/v1/health` | `OK` |
//! | PUT, DELETE | `/api/v1/internal/replica/:name` | 204 |

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use tracing::{debug, error, info};
use udf_common::{ModuleListing, ModuleName, UdfLanguage};
use udf_transport::wire::{ErrorResponse, HashResponse, LanguageQuery, NodeDescriptor};

use crate::replication::{ReplicaOp, Replicator};
use crate::storage::ModuleStore;

/// State shared by every handler.
pub struct NodeState {
    /// This node as advertised to clients.
    pub node: NodeDescriptor,
    /// Other members of the cluster.
    pub peers: Vec<NodeDescriptor>,
    pub store: ModuleStore,
    pub replicator: Replicator,
    pub max_module_size: u64,
}

impl NodeState {
    /// Every cluster member, this node first.
    fn cluster_nodes(&self) -> Vec<NodeDescriptor> {
        std::iter::once(self.node.clone())
            .chain(self.peers.iter().cloned())
            .collect()
    }
}

/// Creates the API router.
pub fn create_router(state: Arc<NodeState>) -> Router {
    // Let oversized bodies reach the handler check instead of axum's 2 MB default
    let body_limit = usize::try_from(state.max_module_size)
        .unwrap_or(usize::MAX)
        .saturating_add(1);

    Router::new()
        .route("/api/v1/udf", get(list_handler))
        .route(
            "/api/v1/udf/:name",
            put(put_handler).get(get_handler).delete(remove_handler),
        )
        .route("/api/v1/udf/:name/hash", get(hash_handler))
        .route(
            "/api/v1/internal/replica/:name",
            put(replica_put_handler).delete(replica_remove_handler),
        )
        .route("/api/v1/cluster/nodes", get(nodes_handler))
        .route("/api/v1/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Checks name, language and size shared by client and replica writes.
fn validate_write(
    state: &NodeState,
    name: &str,
    query: &LanguageQuery,
    body: &Bytes,
) -> Result<UdfLanguage, ApiError> {
    ModuleName::new(name).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let language = query.language.map(UdfLanguage::from).unwrap_or_default();
    if !language.is_supported() {
        return Err(ApiError::UnsupportedLanguage(format!(
            "Unsupported UDF language: {}",
            language
        )));
    }

    if body.len() as u64 > state.max_module_size {
        return Err(ApiError::PayloadTooLarge(format!(
            "UDF module {} is {} bytes, exceeding the {} byte limit",
            name,
            body.len(),
            state.max_module_size
        )));
    }

    Ok(language)
}

/// Stores a module from a client and replicates it to peers.
async fn put_handler(
    State(state): State<Arc<NodeState>>,
    Path(name): Path<String>,
    Query(query): Query<LanguageQuery>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let language = validate_write(&state, &name, &query, &body)?;

    let hash = state.store.put(&name, language, body.clone());
    info!(module = %name, %hash, peers = state.replicator.peer_count(), "Accepted UDF module");

    state.replicator.replicate(ReplicaOp::Put {
        name,
        language,
        content: body,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Removes a module and replicates the removal to peers.
async fn remove_handler(
    State(state): State<Arc<NodeState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .remove(&name)
        .ok_or_else(|| ApiError::NotFound(format!("UDF module {} not found", name)))?;

    state.replicator.replicate(ReplicaOp::Remove { name });

    Ok(StatusCode::NO_CONTENT)
}

/// Lists all modules held by this node.
async fn list_handler(State(state): State<Arc<NodeState>>) -> Json<Vec<ModuleListing>> {
    let listings = state.store.list();
    debug!("Listing {} UDF modules", listings.len());
    Json(listings)
}

/// Returns the raw content of a module.
async fn get_handler(
    State(state): State<Arc<NodeState>>,
    Path(name): Path<String>,
    Query(query): Query<LanguageQuery>,
) -> Result<Response, ApiError> {
    let language = query.language.map(UdfLanguage::from).unwrap_or_default();

    let module = state
        .store
        .get(&name)
        .filter(|module| module.language == language)
        .ok_or_else(|| ApiError::NotFound(format!("UDF module {} not found", name)))?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        module.content,
    )
        .into_response())
}

/// Returns the fingerprint this node holds for a module.
async fn hash_handler(
    State(state): State<Arc<NodeState>>,
    Path(name): Path<String>,
) -> Result<Json<HashResponse>, ApiError> {
    let hash = state
        .store
        .hash_of(&name)
        .ok_or_else(|| ApiError::NotFound(format!("UDF module {} not found", name)))?;

    Ok(Json(HashResponse { hash }))
}

/// Stores a module received from a peer. Not replicated further.
async fn replica_put_handler(
    State(state): State<Arc<NodeState>>,
    Path(name): Path<String>,
    Query(query): Query<LanguageQuery>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let language = validate_write(&state, &name, &query, &body)?;
    state.store.put(&name, language, body);
    Ok(StatusCode::NO_CONTENT)
}

/// Removes a module on behalf of a peer. Absence is not an error.
async fn replica_remove_handler(
    State(state): State<Arc<NodeState>>,
    Path(name): Path<String>,
) -> StatusCode {
    state.store.remove(&name);
    StatusCode::NO_CONTENT
}

async fn nodes_handler(State(state): State<Arc<NodeState>>) -> Json<Vec<NodeDescriptor>> {
    Json(state.cluster_nodes())
}

async fn health_handler() -> &'static str {
    "OK"
}

/// API error type.
///
/// # Rust Learning Note
///
/// Implementing `IntoResponse` lets handlers use `?`: any `ApiError`
/// becomes a status code plus a JSON `{ "error": ... }` body.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    PayloadTooLarge(String),
    UnsupportedLanguage(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::UnsupportedLanguage(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
        };

        // 404s are routine while clients poll for convergence
        if status == StatusCode::NOT_FOUND {
            debug!("API error: {} - {}", status, message);
        } else {
            error!("API error: {} - {}", status, message);
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
