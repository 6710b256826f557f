//! Identifier types for AXON.
//!
//! Components, interfaces, and commands are addressed by string names
//! (unique within their owning scope, fixed at population time); only
//! connections — which are created and destroyed at runtime — carry a
//! uuid-backed identifier.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a recorded connection between a required interface and
/// a provided interface's end-user copy.
///
/// Returned by `connect` and accepted by `disconnect`. Uuid-backed so it
/// stays valid across process boundaries when the connection is brokered
/// by a distributed proxy.
///
/// # Example
///
/// ```
/// use axon_types::ConnectionId;
///
/// let a = ConnectionId::new();
/// let b = ConnectionId::new();
/// assert_ne!(a, b);
/// assert!(format!("{a}").starts_with("conn:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

// NOTE: no `Default` impl. A "default" connection id would silently
// alias unrelated connections; construction must be explicit.

impl ConnectionId {
    /// Creates a new random connection identifier.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_uniqueness() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId::new();
        let display = format!("{id}");
        assert!(display.starts_with("conn:"));
        assert!(display.contains(&id.uuid().to_string()));
    }

    #[test]
    fn connection_id_serde_round_trip() {
        let id = ConnectionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
