//! Transport-level failure signals.
//!
//! These are deliberately low-level: they say what went wrong on the wire,
//! not what it means for the caller. The registry core translates them
//! into the caller-visible taxonomy per operation.

use std::time::Duration;

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Failure reported by a [`crate::Transport`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No node could be reached.
    #[error("Unreachable: {reason}")]
    Unreachable { reason: String },

    /// The request did not complete within its timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server has no such entry.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server refused the request as malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The server failed while handling the request.
    #[error("Server error: {0}")]
    Server(String),

    /// The response could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    /// True for failures where another node might still answer.
    pub fn is_retryable_elsewhere(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout(_))
    }
}
