//! Test Scenario 3: Failure Reporting
//!
//! Each failure the cluster or the client can produce must surface as the
//! matching error kind, attributed to the module involved.

use std::sync::Arc;
use std::time::Duration;

use e2e_tests::assertions::{assert_failed_with, assert_on_all_nodes};
use e2e_tests::{defaults_with_deadline, init_logging, write_udf, ClusterOptions, TestCluster};
use tempfile::TempDir;
use udf_client::{InfoPolicy, ModuleRegistry, Session, SessionDefaults};
use udf_common::{ErrorKind, UdfLanguage};
use udf_transport::{HttpTransport, HttpTransportConfig};

/// A localhost URL nobody listens on
fn dead_seed() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn test_unknown_module() {
    init_logging();
    let cluster = TestCluster::start(ClusterOptions::default()).await;
    let session = cluster.connect(SessionDefaults::default()).await;
    let registry = ModuleRegistry::new();
    let policy = InfoPolicy::default();

    assert_failed_with(
        registry.remove(&session, "ghost.lua", &policy).await,
        ErrorKind::ModuleNotFound,
        "ghost.lua",
    )
    .unwrap();
    assert_failed_with(
        registry.get(&session, "ghost.lua", UdfLanguage::Lua, &policy).await,
        ErrorKind::ModuleNotFound,
        "ghost.lua",
    )
    .unwrap();

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_node_rejects_oversized_module() {
    init_logging();
    // The nodes accept less than the client allows
    let cluster = TestCluster::start(ClusterOptions {
        max_module_size: 16,
        ..ClusterOptions::default()
    })
    .await;
    let session = cluster.connect(SessionDefaults::default()).await;
    let registry = ModuleRegistry::new();

    let result = registry
        .put_bytes(&session, "big.lua", UdfLanguage::Lua, vec![b'x'; 64], &InfoPolicy::default())
        .await;
    assert_failed_with(result, ErrorKind::RegistrationFailed, "big.lua").unwrap();
    assert!(cluster.nodes().iter().all(|node| node.store().count() == 0));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_client_rejects_oversized_file_before_sending() {
    init_logging();
    let cluster = TestCluster::start(ClusterOptions::default()).await;
    let defaults = SessionDefaults {
        max_module_size: 8,
        ..SessionDefaults::default()
    };
    let session = cluster.connect(defaults).await;
    let dir = TempDir::new().unwrap();
    let path = write_udf(&dir, "big.lua", b"return 'way past the cap'");

    let result = ModuleRegistry::new()
        .put(&session, &path, UdfLanguage::Lua, &InfoPolicy::default())
        .await;
    assert_failed_with(result, ErrorKind::ModuleTooLarge, "big.lua").unwrap();
    assert!(cluster.nodes().iter().all(|node| node.store().count() == 0));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_invalid_names_and_policies() {
    init_logging();
    let cluster = TestCluster::start(ClusterOptions::default()).await;
    let session = cluster.connect(SessionDefaults::default()).await;
    let registry = ModuleRegistry::new();

    assert_failed_with(
        registry.remove(&session, "../avg.lua", &InfoPolicy::default()).await,
        ErrorKind::InvalidArgument,
        "../avg.lua",
    )
    .unwrap();
    assert_failed_with(
        registry
            .get(&session, "avg.lua", UdfLanguage::Lua, &InfoPolicy::with_timeout_ms(0))
            .await,
        ErrorKind::InvalidArgument,
        "avg.lua",
    )
    .unwrap();

    let err = registry
        .get(&session, "avg.lua", UdfLanguage::Unknown(7), &InfoPolicy::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedLanguage);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_dead_seed_is_skipped() {
    init_logging();
    let cluster = TestCluster::start(ClusterOptions::default()).await;

    let mut seeds = vec![dead_seed()];
    seeds.extend(cluster.seeds());
    let transport = HttpTransport::new(HttpTransportConfig::new(seeds));
    let session = Session::connect(Arc::new(transport), defaults_with_deadline(Duration::from_secs(3)))
        .await
        .unwrap();

    ModuleRegistry::new()
        .put_bytes(&session, "avg.lua", UdfLanguage::Lua, b"return 1".to_vec(), &InfoPolicy::default())
        .await
        .unwrap();
    assert_on_all_nodes(&cluster, "avg.lua", b"return 1").unwrap();

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_single_seed_discovers_cluster() {
    init_logging();
    let cluster = TestCluster::start(ClusterOptions::default()).await;

    let transport = cluster.transport_via("node-3");
    let session = Session::connect(Arc::new(transport), defaults_with_deadline(Duration::from_secs(3)))
        .await
        .unwrap();

    ModuleRegistry::new()
        .put_bytes(&session, "avg.lua", UdfLanguage::Lua, b"return 3".to_vec(), &InfoPolicy::default())
        .await
        .unwrap();
    assert_on_all_nodes(&cluster, "avg.lua", b"return 3").unwrap();

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_stopped_cluster_is_unreachable() {
    init_logging();
    let transport = HttpTransport::new(HttpTransportConfig::new(vec![dead_seed()]));

    let err = Session::connect(Arc::new(transport), SessionDefaults::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClusterUnreachable);
}

#[tokio::test]
async fn test_cluster_lost_mid_session() {
    init_logging();
    let cluster = TestCluster::start(ClusterOptions::default()).await;
    let session = cluster.connect(SessionDefaults::default()).await;
    cluster.shutdown().await;

    let err = ModuleRegistry::new()
        .list(&session, &InfoPolicy::with_timeout_ms(500))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClusterUnreachable);
}
