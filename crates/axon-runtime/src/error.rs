//! Runtime error taxonomy: lifecycle transitions and connection
//! brokering.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`InvalidTransition`](LifecycleError::InvalidTransition) | `LIFECYCLE_INVALID_TRANSITION` | No |
//! | [`SetupFailed`](LifecycleError::SetupFailed) | `LIFECYCLE_SETUP_FAILED` | Yes |
//! | [`StartupFailed`](LifecycleError::StartupFailed) | `LIFECYCLE_STARTUP_FAILED` | Yes |
//! | [`ComponentNotFound`](ConnectError::ComponentNotFound) | `CONNECT_COMPONENT_NOT_FOUND` | No |
//! | [`InterfaceNotFound`](ConnectError::InterfaceNotFound) | `CONNECT_INTERFACE_NOT_FOUND` | No |
//! | [`IncompatibleInterfaces`](ConnectError::IncompatibleInterfaces) | `CONNECT_INCOMPATIBLE_INTERFACES` | No |
//! | [`AlreadyConnected`](ConnectError::AlreadyConnected) | `CONNECT_ALREADY_CONNECTED` | No |
//! | [`NotConnected`](ConnectError::NotConnected) | `CONNECT_NOT_CONNECTED` | No |
//! | [`DuplicateComponent`](ConnectError::DuplicateComponent) | `CONNECT_DUPLICATE_COMPONENT` | No |

use axon_types::{ComponentState, ErrorCode};
use thiserror::Error;

/// Component lifecycle failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The requested transition is not legal from the current state.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// State the component was in.
        from: ComponentState,
        /// State the transition targeted.
        to: ComponentState,
    },

    /// The behavior's `setup` hook failed; the component stays out of
    /// `Ready` and `create` may be retried.
    #[error("setup failed: {0}")]
    SetupFailed(String),

    /// The behavior's `startup` hook failed; the component stays
    /// `Ready` and `start` may be retried.
    #[error("startup failed: {0}")]
    StartupFailed(String),
}

impl ErrorCode for LifecycleError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "LIFECYCLE_INVALID_TRANSITION",
            Self::SetupFailed(_) => "LIFECYCLE_SETUP_FAILED",
            Self::StartupFailed(_) => "LIFECYCLE_STARTUP_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::SetupFailed(_) | Self::StartupFailed(_))
    }
}

/// Connection brokering failure.
///
/// All connect errors are all-or-nothing: a failed connect or
/// disconnect leaves every interface exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// No component with this name is registered.
    #[error("component not found: {0}")]
    ComponentNotFound(String),

    /// The named component has no such interface.
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    /// One or more required function slots found no same-named,
    /// same-shaped command; the payload names them.
    #[error("incompatible interfaces: {0}")]
    IncompatibleInterfaces(String),

    /// This (client, required) pair is already connected.
    #[error("already connected: {0}")]
    AlreadyConnected(String),

    /// No such connection exists.
    #[error("not connected: {0}")]
    NotConnected(String),

    /// A component with this name is already registered.
    #[error("duplicate component: {0}")]
    DuplicateComponent(String),
}

impl ErrorCode for ConnectError {
    fn code(&self) -> &'static str {
        match self {
            Self::ComponentNotFound(_) => "CONNECT_COMPONENT_NOT_FOUND",
            Self::InterfaceNotFound(_) => "CONNECT_INTERFACE_NOT_FOUND",
            Self::IncompatibleInterfaces(_) => "CONNECT_INCOMPATIBLE_INTERFACES",
            Self::AlreadyConnected(_) => "CONNECT_ALREADY_CONNECTED",
            Self::NotConnected(_) => "CONNECT_NOT_CONNECTED",
            Self::DuplicateComponent(_) => "CONNECT_DUPLICATE_COMPONENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
