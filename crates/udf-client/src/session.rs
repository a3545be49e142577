//! Explicit connection handle.
//!
//! # Rust Learning Note
//!
//! Instead of a hidden global "is connected" flag, every registry operation
//! takes a `&Session`. The handle is an `Arc` around shared state, so
//! cloning is cheap and all clones observe the same open/closed flag:
//!
//! ```rust,ignore
//! let session = Session::connect(transport, SessionDefaults::default()).await?;
//! let worker = session.clone();
//! session.close();
//! assert!(!worker.is_open());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use udf_common::{Error, Result};
use udf_transport::Transport;

use crate::blob::DEFAULT_MAX_MODULE_SIZE;
use crate::convergence::ConvergenceConfig;
use crate::translate::{translate, Operation};

/// Connection-level defaults applied to every operation on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDefaults {
    /// Timeout used when an `InfoPolicy` leaves it unset.
    pub info_timeout: Duration,
    /// Size cap for module content.
    pub max_module_size: u64,
    pub convergence: ConvergenceConfig,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            info_timeout: Duration::from_millis(1000),
            max_module_size: DEFAULT_MAX_MODULE_SIZE,
            convergence: ConvergenceConfig::default(),
        }
    }
}

struct SessionInner {
    transport: Arc<dyn Transport>,
    defaults: SessionDefaults,
    open: AtomicBool,
}

/// An open (or closed) connection to a cluster.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Opens a session after checking that the cluster lists at least one
    /// node.
    pub async fn connect(transport: Arc<dyn Transport>, defaults: SessionDefaults) -> Result<Self> {
        let nodes = transport
            .list_cluster_nodes()
            .await
            .map_err(|e| translate(Operation::ListNodes, None, e))?;

        if nodes.is_empty() {
            return Err(Error::cluster_unreachable("cluster reports no nodes"));
        }

        info!("Connected to cluster with {} nodes", nodes.len());

        Ok(Self {
            inner: Arc::new(SessionInner {
                transport,
                defaults,
                open: AtomicBool::new(true),
            }),
        })
    }

    /// Closes the session for this handle and all its clones.
    pub fn close(&self) {
        if self.inner.open.swap(false, Ordering::SeqCst) {
            debug!("Session closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    pub fn defaults(&self) -> &SessionDefaults {
        &self.inner.defaults
    }

    /// Returns the transport, or `NotConnected` once the session is closed.
    pub fn transport(&self) -> Result<&dyn Transport> {
        if !self.is_open() {
            return Err(Error::not_connected());
        }
        Ok(self.inner.transport.as_ref())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("open", &self.is_open())
            .field("defaults", &self.inner.defaults)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udf_common::ErrorKind;
    use udf_transport::MemoryCluster;

    #[tokio::test]
    async fn test_connect_and_close() {
        let cluster = MemoryCluster::with_nodes(3);
        let session = Session::connect(Arc::new(cluster), SessionDefaults::default())
            .await
            .unwrap();
        assert!(session.is_open());
        assert!(session.transport().is_ok());

        let clone = session.clone();
        session.close();
        assert!(!clone.is_open());
        assert!(matches!(clone.transport(), Err(Error::NotConnected { .. })));
    }

    #[tokio::test]
    async fn test_connect_unreachable() {
        let cluster = MemoryCluster::with_nodes(3);
        cluster.set_reachable(false);
        let err = Session::connect(Arc::new(cluster), SessionDefaults::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClusterUnreachable);
    }

    #[tokio::test]
    async fn test_connect_empty_cluster() {
        let err = Session::connect(Arc::new(MemoryCluster::new()), SessionDefaults::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClusterUnreachable);
    }
}
