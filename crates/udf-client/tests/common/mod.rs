//! Shared helpers for registry integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use udf_client::{ConvergenceConfig, Session, SessionDefaults};
use udf_transport::MemoryCluster;

/// Session defaults with a short convergence deadline and fast polling
pub fn fast_defaults(convergence_timeout: Duration) -> SessionDefaults {
    SessionDefaults {
        convergence: ConvergenceConfig {
            timeout: convergence_timeout,
            poll_interval: Duration::from_millis(10),
            max_poll_interval: Duration::from_millis(50),
        },
        ..SessionDefaults::default()
    }
}

/// Opens a session on `cluster` (which stays usable for inspection)
pub async fn connect(cluster: &MemoryCluster, defaults: SessionDefaults) -> Session {
    Session::connect(Arc::new(cluster.clone()), defaults)
        .await
        .expect("Failed to connect to simulated cluster")
}

/// Writes a UDF source file under `dir` and returns its path
pub fn write_udf(dir: &TempDir, relative: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create UDF directory");
    }
    std::fs::write(&path, content).expect("Failed to write UDF file");
    path
}
