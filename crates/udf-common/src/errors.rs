//! Error types for the UDF registry.
//!
//! # Rust Learning Note
//!
//! Every caller-visible failure is an ordinary `Result` value. This module
//! defines the one error type the public API returns.
//!
//! ## Branching on the kind, not the message
//!
//! ```rust
//! use udf_common::{Error, ErrorKind, Result};
//!
//! fn describe(result: Result<Vec<u8>>) -> &'static str {
//!     match result {
//!         Ok(_) => "found",
//!         Err(e) if e.kind() == ErrorKind::ModuleNotFound => "missing",
//!         Err(_) => "failed",
//!     }
//! }
//! ```
//!
//! Each variant belongs to exactly one [`ErrorKind`], and each kind has a
//! stable numeric code and name. Messages are for humans and may change.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::{NodeId, UdfLanguage};

/// Result type alias for UDF registry operations.
///
/// This is a convenience alias so we can write `Result<T>` instead of
/// `Result<T, Error>` throughout the codebase.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause attached to some errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The small taxonomy every failure is reduced to.
///
/// Codes and names are stable: scripts and bindings may persist them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FileNotFound,
    ModuleTooLarge,
    UnsupportedLanguage,
    NotConnected,
    RegistrationFailed,
    ModuleNotFound,
    ConvergenceTimeout,
    ClusterUnreachable,
    InvalidArgument,
}

impl ErrorKind {
    /// All kinds, in code order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::FileNotFound,
        ErrorKind::ModuleTooLarge,
        ErrorKind::UnsupportedLanguage,
        ErrorKind::NotConnected,
        ErrorKind::RegistrationFailed,
        ErrorKind::ModuleNotFound,
        ErrorKind::ConvergenceTimeout,
        ErrorKind::ClusterUnreachable,
        ErrorKind::InvalidArgument,
    ];

    /// Stable numeric code.
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::FileNotFound => 1,
            ErrorKind::ModuleTooLarge => 2,
            ErrorKind::UnsupportedLanguage => 3,
            ErrorKind::NotConnected => 4,
            ErrorKind::RegistrationFailed => 5,
            ErrorKind::ModuleNotFound => 6,
            ErrorKind::ConvergenceTimeout => 7,
            ErrorKind::ClusterUnreachable => 8,
            ErrorKind::InvalidArgument => 9,
        }
    }

    /// Stable upper-case name.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "FILE_NOT_FOUND",
            ErrorKind::ModuleTooLarge => "MODULE_TOO_LARGE",
            ErrorKind::UnsupportedLanguage => "UNSUPPORTED_LANGUAGE",
            ErrorKind::NotConnected => "NOT_CONNECTED",
            ErrorKind::RegistrationFailed => "REGISTRATION_FAILED",
            ErrorKind::ModuleNotFound => "MODULE_NOT_FOUND",
            ErrorKind::ConvergenceTimeout => "CONVERGENCE_TIMEOUT",
            ErrorKind::ClusterUnreachable => "CLUSTER_UNREACHABLE",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
        }
    }

    /// Looks a kind up by its numeric code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.code() == code)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Optional context describing which module (and function) an error
/// concerns.
///
/// Every [`Error`] exposes one through [`Error::context`]; fields the
/// operation could not fill stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub module: Option<String>,
    pub func: Option<String>,
}

impl ErrorContext {
    /// Context naming a module.
    pub fn module(name: impl Into<String>) -> Self {
        Self {
            module: Some(name.into()),
            func: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.module.is_none() && self.func.is_none()
    }
}

/// Main error type for UDF registry operations.
///
/// # Rust Learning Note
///
/// We use the `thiserror` crate to automatically derive `Display` and
/// `std::error::Error`. Variants carry the data a caller may want to act
/// on (the offending path, the pending nodes), and `#[source]` fields keep
/// the underlying cause reachable through `Error::source()`.
///
/// Every variant also carries an [`ErrorContext`], so callers can match
/// the variant directly whether or not an operation annotated it:
///
/// ```rust
/// use udf_common::{Error, NodeId};
///
/// fn pending_nodes(err: &Error) -> &[NodeId] {
///     match err {
///         Error::ConvergenceTimeout { pending, .. } => pending.as_slice(),
///         _ => &[],
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// The UDF source file could not be opened or read.
    #[error("Cannot open UDF file {}: {source}", .path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        context: ErrorContext,
    },

    /// The UDF source file exceeds the size cap.
    #[error("UDF file {} is {size} bytes, exceeding the {limit} byte limit", .path.display())]
    ModuleTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
        context: ErrorContext,
    },

    /// The requested language is not supported.
    #[error("Unsupported UDF language: {language}")]
    UnsupportedLanguage {
        /// The language as the caller gave it.
        language: String,
        context: ErrorContext,
    },

    /// The session handle is closed.
    #[error("No connection to the cluster")]
    NotConnected { context: ErrorContext },

    /// The cluster did not accept the module.
    #[error("Registration of UDF module {module} failed: {reason}")]
    RegistrationFailed {
        module: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
        context: ErrorContext,
    },

    /// The cluster has no module with this name.
    #[error("UDF module not found: {module}")]
    ModuleNotFound {
        module: String,
        context: ErrorContext,
    },

    /// The module was submitted but not confirmed on every node in time.
    #[error(
        "UDF module {module} was submitted but did not converge within {waited:?} (pending nodes: {})",
        join_nodes(.pending)
    )]
    ConvergenceTimeout {
        module: String,
        waited: Duration,
        pending: Vec<NodeId>,
        context: ErrorContext,
    },

    /// The cluster could not service the request.
    #[error("Cluster unreachable: {reason}")]
    ClusterUnreachable {
        reason: String,
        #[source]
        source: Option<BoxError>,
        context: ErrorContext,
    },

    /// A caller-supplied argument is invalid.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        context: ErrorContext,
    },
}

fn join_nodes(nodes: &[NodeId]) -> String {
    if nodes.is_empty() {
        return "none".to_string();
    }
    nodes
        .iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Creates a FileNotFound error.
    pub fn file_not_found(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileNotFound {
            path: path.into(),
            source,
            context: ErrorContext::default(),
        }
    }

    /// Creates a ModuleTooLarge error.
    pub fn module_too_large(path: impl Into<PathBuf>, size: u64, limit: u64) -> Self {
        Self::ModuleTooLarge {
            path: path.into(),
            size,
            limit,
            context: ErrorContext::default(),
        }
    }

    /// Creates an UnsupportedLanguage error.
    pub fn unsupported_language(language: UdfLanguage) -> Self {
        Self::unsupported_language_name(language.to_string())
    }

    /// Creates an UnsupportedLanguage error for a language given by name.
    pub fn unsupported_language_name(name: impl Into<String>) -> Self {
        Self::UnsupportedLanguage {
            language: name.into(),
            context: ErrorContext::default(),
        }
    }

    /// Creates a NotConnected error.
    pub fn not_connected() -> Self {
        Self::NotConnected {
            context: ErrorContext::default(),
        }
    }

    /// Creates a RegistrationFailed error without an underlying cause.
    pub fn registration_failed(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RegistrationFailed {
            module: module.into(),
            reason: reason.into(),
            source: None,
            context: ErrorContext::default(),
        }
    }

    /// Creates a RegistrationFailed error caused by `source`.
    pub fn registration_failed_by<E>(module: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::RegistrationFailed {
            module: module.into(),
            reason: source.to_string(),
            source: Some(Box::new(source)),
            context: ErrorContext::default(),
        }
    }

    /// Creates a ModuleNotFound error.
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            module: module.into(),
            context: ErrorContext::default(),
        }
    }

    /// Creates a ConvergenceTimeout error.
    pub fn convergence_timeout(
        module: impl Into<String>,
        waited: Duration,
        pending: Vec<NodeId>,
    ) -> Self {
        Self::ConvergenceTimeout {
            module: module.into(),
            waited,
            pending,
            context: ErrorContext::default(),
        }
    }

    /// Creates a ClusterUnreachable error without an underlying cause.
    pub fn cluster_unreachable(reason: impl Into<String>) -> Self {
        Self::ClusterUnreachable {
            reason: reason.into(),
            source: None,
            context: ErrorContext::default(),
        }
    }

    /// Creates a ClusterUnreachable error caused by `source`.
    pub fn cluster_unreachable_by<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ClusterUnreachable {
            reason: source.to_string(),
            source: Some(Box::new(source)),
            context: ErrorContext::default(),
        }
    }

    /// Creates an InvalidArgument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileNotFound { .. } => ErrorKind::FileNotFound,
            Error::ModuleTooLarge { .. } => ErrorKind::ModuleTooLarge,
            Error::UnsupportedLanguage { .. } => ErrorKind::UnsupportedLanguage,
            Error::NotConnected { .. } => ErrorKind::NotConnected,
            Error::RegistrationFailed { .. } => ErrorKind::RegistrationFailed,
            Error::ModuleNotFound { .. } => ErrorKind::ModuleNotFound,
            Error::ConvergenceTimeout { .. } => ErrorKind::ConvergenceTimeout,
            Error::ClusterUnreachable { .. } => ErrorKind::ClusterUnreachable,
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// Shorthand for `self.kind().code()`.
    pub fn code(&self) -> i32 {
        self.kind().code()
    }

    /// Returns the module/function context; empty when none was attached.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Error::FileNotFound { context, .. }
            | Error::ModuleTooLarge { context, .. }
            | Error::UnsupportedLanguage { context, .. }
            | Error::NotConnected { context }
            | Error::RegistrationFailed { context, .. }
            | Error::ModuleNotFound { context, .. }
            | Error::ConvergenceTimeout { context, .. }
            | Error::ClusterUnreachable { context, .. }
            | Error::InvalidArgument { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Error::FileNotFound { context, .. }
            | Error::ModuleTooLarge { context, .. }
            | Error::UnsupportedLanguage { context, .. }
            | Error::NotConnected { context }
            | Error::RegistrationFailed { context, .. }
            | Error::ModuleNotFound { context, .. }
            | Error::ConvergenceTimeout { context, .. }
            | Error::ClusterUnreachable { context, .. }
            | Error::InvalidArgument { context, .. } => context,
        }
    }

    /// Attaches context, replacing any context already present.
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        *self.context_mut() = context;
        self
    }

    /// Records the module this error concerns, keeping any function context.
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.context_mut().module = Some(module.into());
        self
    }
}

// Convenience methods for Result types
pub trait ResultExt<T> {
    /// Records the module an error result concerns.
    fn in_module(self, module: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn in_module(self, module: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.in_module(module))
    }
}
