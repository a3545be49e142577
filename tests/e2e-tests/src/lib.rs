// E2E Test Framework for the UDF module registry

pub mod assertions;
pub mod cluster;

pub use cluster::{ClusterOptions, TestCluster};

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use udf_client::{ConvergenceConfig, SessionDefaults};

/// Route node and client logs to the test output (`RUST_LOG` selects levels)
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Session defaults with the given convergence deadline and fast polling
pub fn defaults_with_deadline(timeout: Duration) -> SessionDefaults {
    SessionDefaults {
        convergence: ConvergenceConfig {
            timeout,
            poll_interval: Duration::from_millis(20),
            max_poll_interval: Duration::from_millis(100),
        },
        ..SessionDefaults::default()
    }
}

/// Write a UDF source file under `dir` and return its path
pub fn write_udf(dir: &TempDir, relative: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create UDF directory");
    }
    std::fs::write(&path, content).expect("Failed to write UDF file");
    path
}
