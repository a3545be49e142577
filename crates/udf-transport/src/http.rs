//! HTTP transport for `udf-node` clusters.
//!
//! # Rust Learning Note
//!
//! This module demonstrates an **HTTP client in Rust** using hyper.
//!
//! ```rust,ignore
//! let resp = client.request(req).await?;
//! let bytes = resp.into_body().collect().await?.to_bytes();
//! let result: Vec<ModuleListing> = serde_json::from_slice(&bytes)?;
//! ```
//!
//! ## Cluster-wide vs per-node requests
//!
//! - Cluster-wide calls go to the first seed that answers. Seeds that are
//!   unreachable or time out are skipped; any other answer (including an
//!   error status) is final.
//! - Per-node hash queries go to the address each node advertised in
//!   `GET /api/v1/cluster/nodes`, cached in a `DashMap`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use http_body_util::{BodyExt, Full};
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, trace};
use udf_common::{ContentHash, ModuleListing, NodeId, UdfLanguage};

use crate::error::{TransportError, TransportResult};
use crate::traits::Transport;
use crate::wire::{
    module_hash_path, module_path, ErrorResponse, HashResponse, NodeDescriptor, API_PREFIX,
};

const OCTET_STREAM: &str = "application/octet-stream";

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URLs of nodes to contact for cluster-wide requests.
    pub seeds: Vec<String>,
    /// Timeout for node discovery (`list_cluster_nodes`).
    pub discovery_timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(seeds: Vec<String>) -> Self {
        Self {
            seeds,
            discovery_timeout: Duration::from_secs(1),
        }
    }
}

/// [`Transport`] over the `udf-node` REST API.
pub struct HttpTransport {
    seeds: Vec<String>,
    discovery_timeout: Duration,
    /// Hyper HTTP client (reusable, pooled connections).
    client: Client<HttpConnector, Full<Bytes>>,
    /// Node addresses learned from discovery.
    node_addresses: DashMap<NodeId, String>,
}

impl HttpTransport {
    /// Creates a transport; no connection is made until the first request.
    pub fn new(config: HttpTransportConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();

        Self {
            seeds: config.seeds.iter().map(|s| normalize_base(s)).collect(),
            discovery_timeout: config.discovery_timeout,
            client,
            node_addresses: DashMap::new(),
        }
    }

    /// Returns the normalized seed URLs.
    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    /// Sends one request and reads the whole response body.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Bytes,
        content_type: Option<&str>,
        timeout: Duration,
    ) -> TransportResult<(StatusCode, Bytes)> {
        let uri: Uri = url
            .parse()
            .map_err(|e| TransportError::InvalidRequest(format!("Invalid URI {}: {}", url, e)))?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        let req = builder
            .body(Full::new(body))
            .map_err(|e| TransportError::InvalidRequest(format!("Failed to build request: {}", e)))?;

        trace!("{} {}", method, url);

        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| TransportError::unreachable(format!("{}: {}", url, e)))?;

            let status = resp.status();
            let bytes = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| TransportError::Protocol(format!("Failed to read response: {}", e)))?
                .to_bytes();

            Ok::<_, TransportError>((status, bytes))
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }

    /// Sends a cluster-wide request to the first seed that answers.
    async fn cluster_request(
        &self,
        method: Method,
        path: &str,
        body: Bytes,
        content_type: Option<&str>,
        timeout: Duration,
    ) -> TransportResult<(StatusCode, Bytes)> {
        let mut last_error = TransportError::unreachable("no seed nodes configured");

        for seed in &self.seeds {
            let url = format!("{}{}", seed, path);
            match self
                .execute(method.clone(), &url, body.clone(), content_type, timeout)
                .await
            {
                Ok(answer) => return Ok(answer),
                Err(e) if e.is_retryable_elsewhere() => {
                    debug!("Seed {} did not answer: {}", seed, e);
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }

    /// Replaces the cached addresses with `nodes`.
    ///
    /// Listed nodes are written before unlisted ones are dropped, so a
    /// concurrent lookup of a listed node never sees a missing entry.
    fn refresh_addresses(&self, nodes: &[NodeDescriptor]) {
        for node in nodes {
            self.node_addresses
                .insert(node.id.clone(), normalize_base(&node.address));
        }
        let listed: HashSet<&NodeId> = nodes.iter().map(|node| &node.id).collect();
        self.node_addresses.retain(|id, _| listed.contains(id));
    }

    async fn node_address(&self, node: &NodeId) -> TransportResult<String> {
        if let Some(address) = self.node_addresses.get(node) {
            return Ok(address.clone());
        }

        self.list_cluster_nodes().await?;

        self.node_addresses
            .get(node)
            .map(|address| address.clone())
            .ok_or_else(|| TransportError::unreachable(format!("node {} is not in the cluster", node)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit_module(
        &self,
        name: &str,
        language: UdfLanguage,
        content: &[u8],
        timeout: Duration,
    ) -> TransportResult<()> {
        let path = format!("{}?language={}", module_path(name), language.code());
        let (status, body) = self
            .cluster_request(
                Method::PUT,
                &path,
                Bytes::copy_from_slice(content),
                Some(OCTET_STREAM),
                timeout,
            )
            .await?;

        expect_success(status, &body).map(|_| ())
    }

    async fn remove_module(&self, name: &str, timeout: Duration) -> TransportResult<()> {
        let (status, body) = self
            .cluster_request(Method::DELETE, &module_path(name), Bytes::new(), None, timeout)
            .await?;

        expect_success(status, &body).map(|_| ())
    }

    async fn list_modules(&self, timeout: Duration) -> TransportResult<Vec<ModuleListing>> {
        let path = format!("{}/udf", API_PREFIX);
        let (status, body) = self
            .cluster_request(Method::GET, &path, Bytes::new(), None, timeout)
            .await?;

        decode_json(&expect_success(status, &body)?)
    }

    async fn fetch_module(
        &self,
        name: &str,
        language: UdfLanguage,
        timeout: Duration,
    ) -> TransportResult<Vec<u8>> {
        let path = format!("{}?language={}", module_path(name), language.code());
        let (status, body) = self
            .cluster_request(Method::GET, &path, Bytes::new(), None, timeout)
            .await?;

        Ok(expect_success(status, &body)?.to_vec())
    }

    async fn list_cluster_nodes(&self) -> TransportResult<Vec<NodeId>> {
        let path = format!("{}/cluster/nodes", API_PREFIX);
        let (status, body) = self
            .cluster_request(Method::GET, &path, Bytes::new(), None, self.discovery_timeout)
            .await?;

        let nodes: Vec<NodeDescriptor> = decode_json(&expect_success(status, &body)?)?;

        self.refresh_addresses(&nodes);

        debug!("Discovered {} cluster nodes", nodes.len());
        Ok(nodes.into_iter().map(|node| node.id).collect())
    }

    async fn fetch_module_hash_on_node(
        &self,
        node: &NodeId,
        name: &str,
        timeout: Duration,
    ) -> TransportResult<ContentHash> {
        let address = self.node_address(node).await?;
        let url = format!("{}{}", address, module_hash_path(name));

        let (status, body) = self
            .execute(Method::GET, &url, Bytes::new(), None, timeout)
            .await?;

        let response: HashResponse = decode_json(&expect_success(status, &body)?)?;
        Ok(response.hash)
    }
}

/// Strips trailing slashes so paths can be appended directly.
fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

fn expect_success(status: StatusCode, body: &Bytes) -> TransportResult<Bytes> {
    if status.is_success() {
        Ok(body.clone())
    } else {
        Err(status_error(status, body))
    }
}

/// Maps a non-success status to a transport error.
fn status_error(status: StatusCode, body: &[u8]) -> TransportError {
    let message = serde_json::from_slice::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());

    match status {
        StatusCode::NOT_FOUND => TransportError::NotFound(message),
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNSUPPORTED_MEDIA_TYPE => TransportError::InvalidRequest(message),
        other => TransportError::Server(format!("{}: {}", other, message)),
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> TransportResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| TransportError::Protocol(format!("Failed to parse JSON: {}", e)))
}
