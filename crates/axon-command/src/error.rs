//! Command execution errors.
//!
//! Every command invocation returns an [`ExecuteResult`] distinguishing
//! success from each failure kind. All errors implement
//! [`ErrorCode`](axon_types::ErrorCode) for unified handling.
//!
//! # Error Code Convention
//!
//! All execution errors use the `EXEC_` prefix:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`TypeMismatch`](ExecuteError::TypeMismatch) | `EXEC_TYPE_MISMATCH` | No |
//! | [`MailboxFull`](ExecuteError::MailboxFull) | `EXEC_MAILBOX_FULL` | Yes |
//! | [`InterfaceDisabled`](ExecuteError::InterfaceDisabled) | `EXEC_INTERFACE_DISABLED` | Yes |
//! | [`ComponentTerminated`](ExecuteError::ComponentTerminated) | `EXEC_COMPONENT_TERMINATED` | No |
//! | [`HandlerFailed`](ExecuteError::HandlerFailed) | `EXEC_HANDLER_FAILED` | Yes |
//!
//! # Example
//!
//! ```
//! use axon_command::ExecuteError;
//! use axon_types::ErrorCode;
//!
//! let err = ExecuteError::MailboxFull;
//! assert_eq!(err.code(), "EXEC_MAILBOX_FULL");
//! assert!(err.is_recoverable());
//! ```

use axon_types::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of a command execution or delivery attempt.
pub type ExecuteResult<T = ()> = Result<T, ExecuteError>;

/// Command execution failure.
///
/// # Taxonomy
///
/// *Type errors* (`TypeMismatch`) are reported per call and leave
/// component state untouched. *Capacity errors* (`MailboxFull`) surface
/// backpressure to the producer immediately — the engine never blocks or
/// retries on the caller's behalf. *Lifecycle errors*
/// (`InterfaceDisabled`, `ComponentTerminated`) are surfaced to any
/// caller waiting on a now-impossible completion, never silently
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ExecuteError {
    /// Argument's dynamic type differs from the command's prototype.
    ///
    /// **Not recoverable** - the same call will mismatch again.
    #[error("argument type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Prototype type recorded at command creation.
        expected: String,
        /// Dynamic type supplied at call time.
        found: String,
    },

    /// The target connection's mailbox (or argument budget) is full.
    ///
    /// The enqueue was rejected without blocking and the mailbox is
    /// unchanged. Callers needing guaranteed delivery use the blocking
    /// variant.
    ///
    /// **Recoverable** - retry after the consumer drains.
    #[error("mailbox full")]
    MailboxFull,

    /// The target component is not in a state that accepts calls, or
    /// the function slot is not bound to any provided interface.
    ///
    /// **Recoverable** - the component may become ready, or the slot
    /// may be connected.
    #[error("interface disabled")]
    InterfaceDisabled,

    /// The serving component was killed while this call was pending.
    ///
    /// Blocking calls degrade to this error rather than hang.
    ///
    /// **Not recoverable** - the component is gone.
    #[error("component terminated")]
    ComponentTerminated,

    /// The user-supplied callable reported a failure.
    ///
    /// **Recoverable** - retry is up to the caller's domain logic.
    #[error("handler failed: {0}")]
    HandlerFailed(String),
}

impl ExecuteError {
    /// Shorthand for a [`HandlerFailed`](Self::HandlerFailed) error.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::HandlerFailed(message.into())
    }
}

impl ErrorCode for ExecuteError {
    fn code(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } => "EXEC_TYPE_MISMATCH",
            Self::MailboxFull => "EXEC_MAILBOX_FULL",
            Self::InterfaceDisabled => "EXEC_INTERFACE_DISABLED",
            Self::ComponentTerminated => "EXEC_COMPONENT_TERMINATED",
            Self::HandlerFailed(_) => "EXEC_HANDLER_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::MailboxFull | Self::InterfaceDisabled | Self::HandlerFailed(_) => true,
            Self::TypeMismatch { .. } | Self::ComponentTerminated => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_types::assert_error_codes;

    fn all_variants() -> Vec<ExecuteError> {
        vec![
            ExecuteError::TypeMismatch {
                expected: "i32".into(),
                found: "f64".into(),
            },
            ExecuteError::MailboxFull,
            ExecuteError::InterfaceDisabled,
            ExecuteError::ComponentTerminated,
            ExecuteError::HandlerFailed("x".into()),
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "EXEC_");
    }

    #[test]
    fn mailbox_full_is_recoverable() {
        assert!(ExecuteError::MailboxFull.is_recoverable());
    }

    #[test]
    fn type_mismatch_is_not_recoverable() {
        let err = ExecuteError::TypeMismatch {
            expected: "i32".into(),
            found: "f64".into(),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("expected i32"));
    }

    #[test]
    fn terminated_is_not_recoverable() {
        assert!(!ExecuteError::ComponentTerminated.is_recoverable());
    }

    #[test]
    fn handler_shorthand() {
        let err = ExecuteError::handler("sensor offline");
        assert_eq!(err.code(), "EXEC_HANDLER_FAILED");
        assert!(err.to_string().contains("sensor offline"));
    }
}
