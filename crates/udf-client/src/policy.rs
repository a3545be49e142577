//! Per-call policy.

use std::time::Duration;

use udf_common::{Error, Result};

/// Options for a single registry call.
///
/// `timeout` bounds each transport request made by the call. When unset,
/// the session's connection-level default applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoPolicy {
    pub timeout: Option<Duration>,
}

impl InfoPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn with_timeout_ms(millis: u64) -> Self {
        Self::with_timeout(Duration::from_millis(millis))
    }

    /// Returns the effective timeout, rejecting an explicit zero.
    pub fn resolve_timeout(&self, default: Duration) -> Result<Duration> {
        match self.timeout {
            Some(timeout) if timeout.is_zero() => {
                Err(Error::invalid_argument("policy timeout must be greater than 0"))
            }
            Some(timeout) => Ok(timeout),
            None => Ok(default),
        }
    }
}
