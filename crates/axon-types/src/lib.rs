//! Core types for the AXON component middleware.
//!
//! AXON is a middleware for real-time robotics control software:
//! independently schedulable components expose **provided interfaces**
//! (commands and events) and consume **required interfaces** (function
//! slots and event handlers), communicating through typed command and
//! event objects rather than direct calls.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  axon-types     : states, policies, ErrorCode  ◄── HERE      │
//! │  axon-command   : Callable, Command shapes, EventGenerator   │
//! │  axon-interface : Mailbox, Provided/Required interfaces      │
//! │  axon-runtime   : Component lifecycle, registry, run loop    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate holds the foundational vocabulary shared by every layer:
//!
//! - [`ComponentState`] — the lifecycle state machine's state enum,
//!   with a strict total order over lifecycle progress
//! - [`QueueingPolicy`] / [`InterfacePolicy`] — whether a command call
//!   crosses a mailbox or runs inline
//! - [`ErrorCode`] — unified machine-readable error codes, with
//!   [`assert_error_code`]/[`assert_error_codes`] test helpers
//! - [`ConnectionId`] — uuid-backed identifier for live connections
//!
//! # Example
//!
//! ```
//! use axon_types::{ComponentState, InterfacePolicy, QueueingPolicy};
//!
//! // Lifecycle states are ordered.
//! assert!(ComponentState::Ready < ComponentState::Active);
//!
//! // A task-style component queues commands by default; a single
//! // command may override that.
//! let policy = InterfacePolicy::QueueCommands;
//! assert!(QueueingPolicy::InterfaceDefault.resolves_queued(policy));
//! assert!(!QueueingPolicy::MustNotQueue.resolves_queued(policy));
//! ```

mod error;
mod id;
mod policy;
mod state;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::ConnectionId;
pub use policy::{InterfacePolicy, QueueingPolicy};
pub use state::ComponentState;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_order_spans_lifecycle() {
        assert!(ComponentState::Constructed < ComponentState::Initializing);
        assert!(ComponentState::Initializing < ComponentState::Ready);
        assert!(ComponentState::Ready < ComponentState::Active);
        assert!(ComponentState::Active < ComponentState::Finishing);
        assert!(ComponentState::Finishing < ComponentState::Finished);
    }

    #[test]
    fn device_style_interface_runs_inline() {
        let policy = InterfacePolicy::DoNotQueueCommands;
        assert!(!QueueingPolicy::InterfaceDefault.resolves_queued(policy));
        assert!(QueueingPolicy::MustQueue.resolves_queued(policy));
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
