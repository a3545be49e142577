//! Custom assertions for E2E tests

use udf_common::{ContentHash, ErrorKind, Result};

use crate::cluster::TestCluster;

/// Assert that every node stores `name` with exactly `content`
pub fn assert_on_all_nodes(cluster: &TestCluster, name: &str, content: &[u8]) -> std::result::Result<(), String> {
    let expected = ContentHash::of(content);

    for node in cluster.nodes() {
        match node.store().hash_of(name) {
            Some(hash) if hash == expected => {}
            Some(hash) => {
                return Err(format!(
                    "Node {} holds {} with hash {}, expected {}",
                    node.id(),
                    name,
                    hash,
                    expected
                ))
            }
            None => return Err(format!("Node {} does not hold {}", node.id(), name)),
        }
    }

    Ok(())
}

/// Assert that no node stores `name`
pub fn assert_absent_everywhere(cluster: &TestCluster, name: &str) -> std::result::Result<(), String> {
    let holders: Vec<String> = cluster
        .nodes()
        .iter()
        .filter(|node| node.store().get(name).is_some())
        .map(|node| node.id().to_string())
        .collect();

    if holders.is_empty() {
        Ok(())
    } else {
        Err(format!("{} is still stored on {:?}", name, holders))
    }
}

/// Assert that `result` failed with `kind`, attributed to `module`
pub fn assert_failed_with<T: std::fmt::Debug>(
    result: Result<T>,
    kind: ErrorKind,
    module: &str,
) -> std::result::Result<(), String> {
    match result {
        Ok(value) => Err(format!("Expected {} but succeeded with {:?}", kind, value)),
        Err(e) if e.kind() != kind => Err(format!("Expected {} but got {}: {}", kind, e.kind(), e)),
        Err(e) if e.context().module.as_deref() != Some(module) => Err(format!(
            "Expected error context for {} but got {:?}",
            module,
            e.context()
        )),
        Err(_) => Ok(()),
    }
}
