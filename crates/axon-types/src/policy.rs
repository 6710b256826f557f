//! Queueing policies for commands and provided interfaces.
//!
//! Whether a command execution request crosses a mailbox or runs inline
//! on the calling thread is decided per call from two settings:
//!
//! - the provided interface's [`InterfacePolicy`], fixed at creation
//! - the individual command's [`QueueingPolicy`], which may override it
//!
//! Read commands ignore both: reads are not mutations, always execute
//! inline, and have no queueing semantics.
//!
//! # Example
//!
//! ```
//! use axon_types::{InterfacePolicy, QueueingPolicy};
//!
//! let interface = InterfacePolicy::QueueCommands;
//! assert!(QueueingPolicy::InterfaceDefault.resolves_queued(interface));
//! assert!(!QueueingPolicy::MustNotQueue.resolves_queued(interface));
//! ```

use serde::{Deserialize, Serialize};

/// Per-command queueing override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QueueingPolicy {
    /// Follow the owning interface's [`InterfacePolicy`].
    #[default]
    InterfaceDefault,

    /// Always enqueue, even on a non-queueing interface.
    MustQueue,

    /// Always execute inline on the calling thread.
    ///
    /// Only safe for commands whose callable is itself thread-safe.
    MustNotQueue,
}

impl QueueingPolicy {
    /// Resolves this policy against the owning interface's policy.
    ///
    /// Returns `true` if a call should be enqueued.
    #[must_use]
    pub fn resolves_queued(&self, interface: InterfacePolicy) -> bool {
        match self {
            Self::MustQueue => true,
            Self::MustNotQueue => false,
            Self::InterfaceDefault => matches!(interface, InterfacePolicy::QueueCommands),
        }
    }
}

/// Default queueing behavior of a provided interface.
///
/// Thread-owning ("task"-style) components queue commands so that all
/// mutation happens on their own thread; thread-less ("device"-style)
/// components execute everything inline on the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterfacePolicy {
    /// Commands are serialized through per-connection mailboxes.
    QueueCommands,

    /// Commands execute inline; the component adds no thread-safety
    /// mechanism of its own.
    #[default]
    DoNotQueueCommands,
}

impl InterfacePolicy {
    /// Returns `true` if this interface queues commands by default.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::QueueCommands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_default_follows_interface() {
        assert!(QueueingPolicy::InterfaceDefault.resolves_queued(InterfacePolicy::QueueCommands));
        assert!(
            !QueueingPolicy::InterfaceDefault.resolves_queued(InterfacePolicy::DoNotQueueCommands)
        );
    }

    #[test]
    fn must_queue_overrides_interface() {
        assert!(QueueingPolicy::MustQueue.resolves_queued(InterfacePolicy::DoNotQueueCommands));
    }

    #[test]
    fn must_not_queue_overrides_interface() {
        assert!(!QueueingPolicy::MustNotQueue.resolves_queued(InterfacePolicy::QueueCommands));
    }

    #[test]
    fn policy_defaults() {
        assert_eq!(QueueingPolicy::default(), QueueingPolicy::InterfaceDefault);
        assert_eq!(
            InterfacePolicy::default(),
            InterfacePolicy::DoNotQueueCommands
        );
    }

    #[test]
    fn interface_policy_is_queued() {
        assert!(InterfacePolicy::QueueCommands.is_queued());
        assert!(!InterfacePolicy::DoNotQueueCommands.is_queued());
    }
}
