//! Interface population and lifecycle errors.
//!
//! These are *configuration* errors in the middleware's taxonomy:
//! always reported synchronously to the caller, never retried
//! automatically, and they leave all existing state unmodified.
//!
//! # Error Code Convention
//!
//! All interface errors use the `INTERFACE_` prefix:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`DuplicateCommand`](InterfaceError::DuplicateCommand) | `INTERFACE_DUPLICATE_COMMAND` | No |
//! | [`DuplicateEvent`](InterfaceError::DuplicateEvent) | `INTERFACE_DUPLICATE_EVENT` | No |
//! | [`DuplicateInterface`](InterfaceError::DuplicateInterface) | `INTERFACE_DUPLICATE_INTERFACE` | No |
//! | [`DuplicateFunction`](InterfaceError::DuplicateFunction) | `INTERFACE_DUPLICATE_FUNCTION` | No |
//! | [`DuplicateHandler`](InterfaceError::DuplicateHandler) | `INTERFACE_DUPLICATE_HANDLER` | No |
//! | [`PopulationFrozen`](InterfaceError::PopulationFrozen) | `INTERFACE_POPULATION_FROZEN` | No |
//! | [`NotFactory`](InterfaceError::NotFactory) | `INTERFACE_NOT_FACTORY` | No |
//! | [`UnknownUser`](InterfaceError::UnknownUser) | `INTERFACE_UNKNOWN_USER` | No |
//! | [`CopyBusy`](InterfaceError::CopyBusy) | `INTERFACE_COPY_BUSY` | Yes |
//! | [`MissingCommand`](InterfaceError::MissingCommand) | `INTERFACE_MISSING_COMMAND` | No |
//! | [`AlreadyBound`](InterfaceError::AlreadyBound) | `INTERFACE_ALREADY_BOUND` | No |

use axon_types::ErrorCode;
use thiserror::Error;

/// Interface population or end-user-copy lifecycle failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    /// A command with this name already exists in that shape's map.
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),

    /// An event generator with this name already exists.
    #[error("duplicate event: {0}")]
    DuplicateEvent(String),

    /// The component already has an interface with this name.
    #[error("duplicate interface: {0}")]
    DuplicateInterface(String),

    /// A function slot with this name was already declared.
    #[error("duplicate function: {0}")]
    DuplicateFunction(String),

    /// An event handler with this name was already registered.
    #[error("duplicate event handler: {0}")]
    DuplicateHandler(String),

    /// Population was attempted after the first connection.
    ///
    /// Canonical command/event maps are read-only once an end-user copy
    /// exists; that is what makes call-time lookups lock-cheap.
    #[error("interface population is frozen after first connection")]
    PopulationFrozen,

    /// A factory-only operation was invoked on an end-user copy.
    #[error("not a factory interface")]
    NotFactory,

    /// No end-user copy exists for this user name.
    #[error("unknown end user: {0}")]
    UnknownUser(String),

    /// The end-user copy still has queued or mid-execution commands.
    ///
    /// The copy is never force-destroyed while in-flight data could be
    /// read or written; retry after the owner drains its mailbox.
    #[error("end-user copy busy: {0}")]
    CopyBusy(String),

    /// A mandatory function slot found no same-named, same-shape
    /// command at bind time.
    #[error("no matching command for function: {0}")]
    MissingCommand(String),

    /// The required interface is already bound to a provider.
    #[error("required interface already bound: {0}")]
    AlreadyBound(String),
}

impl ErrorCode for InterfaceError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateCommand(_) => "INTERFACE_DUPLICATE_COMMAND",
            Self::DuplicateEvent(_) => "INTERFACE_DUPLICATE_EVENT",
            Self::DuplicateInterface(_) => "INTERFACE_DUPLICATE_INTERFACE",
            Self::DuplicateFunction(_) => "INTERFACE_DUPLICATE_FUNCTION",
            Self::DuplicateHandler(_) => "INTERFACE_DUPLICATE_HANDLER",
            Self::PopulationFrozen => "INTERFACE_POPULATION_FROZEN",
            Self::NotFactory => "INTERFACE_NOT_FACTORY",
            Self::UnknownUser(_) => "INTERFACE_UNKNOWN_USER",
            Self::CopyBusy(_) => "INTERFACE_COPY_BUSY",
            Self::MissingCommand(_) => "INTERFACE_MISSING_COMMAND",
            Self::AlreadyBound(_) => "INTERFACE_ALREADY_BOUND",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::CopyBusy(_))
    }
}
