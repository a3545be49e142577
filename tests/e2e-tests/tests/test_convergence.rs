//! Test Scenario 2: Convergence Over Real Replication
//!
//! Nodes forward writes to their peers after a configurable lag. A put must
//! not return before every node holds the new content, and must report the
//! lagging nodes when the deadline passes first.

use std::time::{Duration, Instant};

use e2e_tests::assertions::{assert_failed_with, assert_on_all_nodes};
use e2e_tests::{defaults_with_deadline, init_logging, ClusterOptions, TestCluster};
use futures::future::join_all;
use udf_client::{InfoPolicy, ModuleRegistry};
use udf_common::{ContentHash, Error, ErrorKind, NodeId, UdfLanguage};

const CONTENT: &[u8] = b"function sum(stream) return stream : reduce(add) end";

fn lagging_cluster(delay_ms: u64) -> ClusterOptions {
    ClusterOptions {
        replication_delay: Some(Duration::from_millis(delay_ms)),
        ..ClusterOptions::default()
    }
}

#[tokio::test]
async fn test_put_waits_for_replication() {
    println!("\n========================================");
    println!("TEST: Put Waits For Replication");
    println!("========================================\n");
    init_logging();

    // Step 1: Start a cluster whose replication lags by 300ms
    println!("Step 1: Starting cluster with 300ms replication lag...");
    let cluster = TestCluster::start(lagging_cluster(300)).await;
    let session = cluster.connect(defaults_with_deadline(Duration::from_secs(3))).await;
    let registry = ModuleRegistry::new();

    // Step 2: Put and time it
    println!("Step 2: Registering sum.lua...");
    let started = Instant::now();
    registry
        .put_bytes(&session, "sum.lua", UdfLanguage::Lua, CONTENT.to_vec(), &InfoPolicy::default())
        .await
        .expect("put should converge within the deadline");
    let elapsed = started.elapsed();
    println!("✓ Converged after {:?}\n", elapsed);

    // Step 3: The put returned only once the peers caught up
    println!("Step 3: Checking every node...");
    assert!(elapsed >= Duration::from_millis(290), "returned after {:?}", elapsed);
    assert_on_all_nodes(&cluster, "sum.lua", CONTENT).unwrap();
    println!("✓ sum.lua present on every node\n");

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_put_times_out_when_replication_lags() {
    println!("\n========================================");
    println!("TEST: Convergence Timeout");
    println!("========================================\n");
    init_logging();

    // Step 1: Replication slower than the convergence deadline
    println!("Step 1: Starting cluster with 1500ms replication lag...");
    let cluster = TestCluster::start(lagging_cluster(1500)).await;
    let session = cluster.connect(defaults_with_deadline(Duration::from_millis(300))).await;
    let registry = ModuleRegistry::new();

    // Step 2: Put must fail with the lagging nodes listed
    println!("Step 2: Registering sum.lua with a 300ms deadline...");
    let err = registry
        .put_bytes(&session, "sum.lua", UdfLanguage::Lua, CONTENT.to_vec(), &InfoPolicy::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConvergenceTimeout);
    assert_eq!(err.context().module.as_deref(), Some("sum.lua"));

    match &err {
        Error::ConvergenceTimeout { module, pending, .. } => {
            assert_eq!(module, "sum.lua");
            assert_eq!(pending, &vec![NodeId::from("node-2"), NodeId::from("node-3")]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    println!("✓ Timed out with node-2 and node-3 pending\n");

    // Step 3: The write is not rolled back
    println!("Step 3: Checking the submission stands...");
    let hash = ContentHash::of(CONTENT);
    assert_eq!(cluster.node("node-1").store().hash_of("sum.lua"), Some(hash));
    let content = registry
        .get(&session, "sum.lua", UdfLanguage::Lua, &InfoPolicy::default())
        .await
        .unwrap();
    assert_eq!(content, CONTENT);
    println!("✓ node-1 serves sum.lua\n");

    // Step 4: Replication eventually completes on its own
    println!("Step 4: Waiting for late replication...");
    let started = Instant::now();
    while assert_on_all_nodes(&cluster, "sum.lua", CONTENT).is_err() {
        assert!(started.elapsed() < Duration::from_secs(5), "replication never completed");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    println!("✓ Every node caught up\n");

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_puts_all_converge() {
    init_logging();
    let cluster = TestCluster::start(lagging_cluster(100)).await;
    let session = cluster.connect(defaults_with_deadline(Duration::from_secs(3))).await;
    let registry = ModuleRegistry::new();
    let policy = InfoPolicy::default();

    let contents: Vec<(String, Vec<u8>)> = (0..4)
        .map(|i| (format!("f{}.lua", i), format!("return {}", i).into_bytes()))
        .collect();

    let puts = contents.iter().map(|(name, content)| {
        registry.put_bytes(&session, name, UdfLanguage::Lua, content.clone(), &policy)
    });
    for result in join_all(puts).await {
        result.unwrap();
    }

    assert_eq!(registry.converged(), 4);
    assert_eq!(registry.in_flight(), 0);
    for (name, content) in &contents {
        assert_on_all_nodes(&cluster, name, content).unwrap();
    }

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_remove_returns_before_peers_catch_up() {
    init_logging();
    let cluster = TestCluster::start(lagging_cluster(500)).await;
    let session = cluster.connect(defaults_with_deadline(Duration::from_secs(3))).await;
    let registry = ModuleRegistry::new();

    registry
        .put_bytes(&session, "sum.lua", UdfLanguage::Lua, CONTENT.to_vec(), &InfoPolicy::default())
        .await
        .unwrap();

    registry
        .remove(&session, "sum.lua", &InfoPolicy::default())
        .await
        .unwrap();

    // The node that took the delete answers at once; peers are still lagging
    assert!(cluster.node("node-1").store().get("sum.lua").is_none());
    assert!(cluster.node("node-2").store().get("sum.lua").is_some());
    assert_failed_with(
        registry.get(&session, "sum.lua", UdfLanguage::Lua, &InfoPolicy::default()).await,
        ErrorKind::ModuleNotFound,
        "sum.lua",
    )
    .unwrap();

    cluster.shutdown().await;
}
