//! Component lifecycle states.
//!
//! Every component owns exactly one [`ComponentState`], mutated only by
//! its own lifecycle calls (`create`/`start`/`suspend`/`kill`) or by its
//! run thread detecting completion, and read concurrently by any thread
//! through a snapshot.
//!
//! # State Machine
//!
//! ```text
//! Constructed ──create()──► Initializing ──► Ready ──start()──► Active
//!                                              ▲                  │
//!                                              └───suspend()──────┘
//!
//!      any state ──kill()──► Finishing ──► Finished (terminal)
//! ```
//!
//! # Example
//!
//! ```
//! use axon_types::ComponentState;
//!
//! let state = ComponentState::Ready;
//! assert!(state.accepts_commands());
//! assert!(!state.is_terminal());
//!
//! // States carry a strict total order over lifecycle progress.
//! assert!(ComponentState::Constructed < ComponentState::Ready);
//! assert!(ComponentState::Active < ComponentState::Finished);
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle state of a component.
///
/// States form a strict total order over lifecycle progress:
/// `Constructed < Initializing < Ready < Active < Finishing < Finished`.
///
/// # State Categories
///
/// | Category | States | Accepts Commands |
/// |----------|--------|------------------|
/// | Setup | `Constructed`, `Initializing` | No |
/// | Operational | `Ready`, `Active` | Yes |
/// | Shutdown | `Finishing` | No |
/// | Terminal | `Finished` | No |
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ComponentState {
    /// Component object exists but `create()` has not been called.
    #[default]
    Constructed,

    /// Setup hook is running.
    ///
    /// Transient state observable from other threads while `create()`
    /// executes the user-supplied setup.
    Initializing,

    /// Setup complete; commands are accepted but the run hook is not
    /// executing. `start()` moves to `Active`, `suspend()` returns here.
    Ready,

    /// Component is running.
    ///
    /// Thread-owning components drain their mailboxes and invoke the run
    /// hook in this state.
    Active,

    /// Cleanup hook is running after `kill()`.
    Finishing,

    /// Terminal state.
    ///
    /// Killing an already-finished component is a no-op, not an error.
    Finished,
}

impl ComponentState {
    /// Returns `true` if the component accepts command execution.
    ///
    /// Commands delivered in any other state fail with an
    /// interface-disabled error rather than queueing indefinitely.
    ///
    /// # Example
    ///
    /// ```
    /// use axon_types::ComponentState;
    ///
    /// assert!(ComponentState::Ready.accepts_commands());
    /// assert!(ComponentState::Active.accepts_commands());
    /// assert!(!ComponentState::Constructed.accepts_commands());
    /// assert!(!ComponentState::Finished.accepts_commands());
    /// ```
    #[must_use]
    pub fn accepts_commands(&self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }

    /// Returns `true` if this is the terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns `true` if the component is shutting down or finished.
    ///
    /// # Example
    ///
    /// ```
    /// use axon_types::ComponentState;
    ///
    /// assert!(ComponentState::Finishing.is_ending());
    /// assert!(ComponentState::Finished.is_ending());
    /// assert!(!ComponentState::Active.is_ending());
    /// ```
    #[must_use]
    pub fn is_ending(&self) -> bool {
        matches!(self, Self::Finishing | Self::Finished)
    }
}

impl std::fmt::Display for ComponentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constructed => write!(f, "constructed"),
            Self::Initializing => write!(f, "initializing"),
            Self::Ready => write!(f, "ready"),
            Self::Active => write!(f, "active"),
            Self::Finishing => write!(f, "finishing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}
