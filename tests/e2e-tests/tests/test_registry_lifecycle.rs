//! Test Scenario 1: Module Lifecycle
//!
//! Registers, lists, fetches and removes UDF modules on a three-node
//! cluster over HTTP, checking each node's store along the way.

use std::time::{Duration, Instant};

use e2e_tests::assertions::{assert_absent_everywhere, assert_failed_with, assert_on_all_nodes};
use e2e_tests::{defaults_with_deadline, init_logging, write_udf, ClusterOptions, TestCluster};
use tempfile::TempDir;
use udf_client::{InfoPolicy, ModuleRegistry};
use udf_common::{ContentHash, ErrorKind, UdfLanguage};

const AVG: &[u8] = b"function avg(rec, bin)\n  return rec[bin]\nend\n";

/// Poll until no node stores `name`, for removals that replicate in the background
async fn wait_until_absent(cluster: &TestCluster, name: &str, timeout: Duration) -> Result<(), String> {
    let started = Instant::now();
    loop {
        match assert_absent_everywhere(cluster, name) {
            Ok(()) => return Ok(()),
            Err(e) if started.elapsed() >= timeout => return Err(e),
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
}

#[tokio::test]
async fn test_put_list_get_remove() {
    println!("\n========================================");
    println!("TEST: UDF Module Lifecycle");
    println!("========================================\n");
    init_logging();

    // Step 1: Start the cluster
    println!("Step 1: Starting three-node cluster...");
    let cluster = TestCluster::start(ClusterOptions::default()).await;
    let session = cluster.connect(defaults_with_deadline(Duration::from_secs(3))).await;
    let registry = ModuleRegistry::new();
    let policy = InfoPolicy::default();
    let dir = TempDir::new().unwrap();
    let path = write_udf(&dir, "udfs/avg.lua", AVG);
    println!("✓ Cluster running at {:?}\n", cluster.seeds());

    // Step 2: Register the module
    println!("Step 2: Registering avg.lua...");
    registry
        .put(&session, &path, UdfLanguage::Lua, &policy)
        .await
        .expect("put should converge on a healthy cluster");
    assert_on_all_nodes(&cluster, "avg.lua", AVG).unwrap();
    assert_eq!(registry.converged(), 1);
    println!("✓ avg.lua present on every node\n");

    // Step 3: List
    println!("Step 3: Listing modules...");
    let modules = registry.list(&session, &policy).await.unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name.as_str(), "avg.lua");
    assert_eq!(modules[0].language, UdfLanguage::Lua);
    assert_eq!(modules[0].content_hash, ContentHash::of(AVG));
    println!("✓ Listing reports avg.lua\n");

    // Step 4: Fetch
    println!("Step 4: Fetching avg.lua...");
    let content = registry
        .get(&session, "avg.lua", UdfLanguage::Lua, &policy)
        .await
        .unwrap();
    assert_eq!(content, AVG);
    println!("✓ Content matches byte for byte\n");

    // Step 5: Remove
    println!("Step 5: Removing avg.lua...");
    registry.remove(&session, "avg.lua", &policy).await.unwrap();
    assert_failed_with(
        registry.get(&session, "avg.lua", UdfLanguage::Lua, &policy).await,
        ErrorKind::ModuleNotFound,
        "avg.lua",
    )
    .unwrap();
    wait_until_absent(&cluster, "avg.lua", Duration::from_secs(3))
        .await
        .unwrap();
    assert!(registry.list(&session, &policy).await.unwrap().is_empty());
    println!("✓ avg.lua removed from every node\n");

    session.close();
    cluster.shutdown().await;
}

#[tokio::test]
async fn test_binary_content_round_trip() {
    init_logging();
    let cluster = TestCluster::start(ClusterOptions::default()).await;
    let session = cluster.connect(defaults_with_deadline(Duration::from_secs(3))).await;
    let registry = ModuleRegistry::new();

    // Every byte value, including NUL and invalid UTF-8 sequences
    let content: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    registry
        .put_bytes(&session, "blob.lua", UdfLanguage::Lua, content.clone(), &InfoPolicy::default())
        .await
        .unwrap();

    assert_on_all_nodes(&cluster, "blob.lua", &content).unwrap();
    let fetched = registry
        .get(&session, "blob.lua", UdfLanguage::Lua, &InfoPolicy::default())
        .await
        .unwrap();
    assert_eq!(fetched, content);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_same_basename_overwrites_on_every_node() {
    init_logging();
    let cluster = TestCluster::start(ClusterOptions::default()).await;
    let session = cluster.connect(defaults_with_deadline(Duration::from_secs(3))).await;
    let registry = ModuleRegistry::new();
    let dir = TempDir::new().unwrap();

    let first = write_udf(&dir, "v1/avg.lua", b"return 1");
    let second = write_udf(&dir, "v2/avg.lua", b"return 2");

    registry
        .put(&session, &first, UdfLanguage::Lua, &InfoPolicy::default())
        .await
        .unwrap();
    registry
        .put(&session, &second, UdfLanguage::Lua, &InfoPolicy::default())
        .await
        .unwrap();

    assert_on_all_nodes(&cluster, "avg.lua", b"return 2").unwrap();
    let modules = registry.list(&session, &InfoPolicy::default()).await.unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].content_hash, ContentHash::of(b"return 2"));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_list_many_modules() {
    init_logging();
    let cluster = TestCluster::start(ClusterOptions::default()).await;
    let session = cluster.connect(defaults_with_deadline(Duration::from_secs(3))).await;
    let registry = ModuleRegistry::new();

    for i in 0..5 {
        registry
            .put_bytes(
                &session,
                &format!("m{}.lua", i),
                UdfLanguage::Lua,
                format!("return {}", i).into_bytes(),
                &InfoPolicy::default(),
            )
            .await
            .unwrap();
    }

    let mut names: Vec<String> = registry
        .list(&session, &InfoPolicy::default())
        .await
        .unwrap()
        .into_iter()
        .map(|summary| summary.name.as_str().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["m0.lua", "m1.lua", "m2.lua", "m3.lua", "m4.lua"]);

    cluster.shutdown().await;
}
