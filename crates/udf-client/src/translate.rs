//! Translation of transport failures into the caller-visible taxonomy.
//!
//! # Rust Learning Note
//!
//! The same wire failure means different things depending on the call that
//! produced it. A `NotFound` from `fetch_module` is the caller's problem
//! (`ModuleNotFound`), while a `NotFound` from `list_modules` has no target
//! and can only mean the cluster answered nonsense. So translation is keyed
//! on the [`Operation`] as well as the error:
//!
//! ```rust,ignore
//! let err = translate(Operation::Get, Some("avg.lua"), TransportError::NotFound(..));
//! assert_eq!(err.kind(), ErrorKind::ModuleNotFound);
//! assert_eq!(err.context().module.as_deref(), Some("avg.lua"));
//! ```
//!
//! The transport error is kept as the `source()` of the translated error
//! wherever the kind allows one.

use udf_common::{Error, ErrorContext};
use udf_transport::TransportError;

/// The registry-level call a transport failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Submit,
    Remove,
    List,
    Get,
    ListNodes,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Submit => "put",
            Operation::Remove => "remove",
            Operation::List => "list",
            Operation::Get => "get",
            Operation::ListNodes => "list_cluster_nodes",
        }
    }
}

/// Translates `error`, raised by `operation` on `module`, into an [`Error`].
///
/// When `module` is known it is recorded in the error context along with
/// the operation name.
pub fn translate(operation: Operation, module: Option<&str>, error: TransportError) -> Error {
    let translated = match (operation, error) {
        (Operation::Submit, error) => Error::registration_failed_by(module.unwrap_or_default(), error),
        (Operation::ListNodes, error) => Error::cluster_unreachable_by(error),

        (Operation::Remove | Operation::Get, TransportError::NotFound(_)) => {
            Error::module_not_found(module.unwrap_or_default())
        }
        (Operation::Remove | Operation::Get | Operation::List, TransportError::InvalidRequest(message)) => {
            Error::invalid_argument(message)
        }
        (Operation::Remove | Operation::Get | Operation::List, error) => {
            Error::cluster_unreachable_by(error)
        }
    };

    match module {
        Some(module) => translated.with_context(ErrorContext {
            module: Some(module.to_string()),
            func: Some(operation.as_str().to_string()),
        }),
        None => translated,
    }
}
