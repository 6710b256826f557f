//! Void command: no argument, no result.

use crate::error::ExecuteResult;
use crate::shape::CommandShape;
use axon_types::QueueingPolicy;

/// A named command taking no argument and producing no result.
///
/// # Example
///
/// ```
/// use axon_command::CommandVoid;
/// use axon_types::QueueingPolicy;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// let hits = Arc::new(AtomicU32::new(0));
/// let h = Arc::clone(&hits);
/// let cmd = CommandVoid::new("Zero", QueueingPolicy::default(), move || {
///     h.fetch_add(1, Ordering::SeqCst);
///     Ok(())
/// });
///
/// cmd.execute().unwrap();
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
pub struct CommandVoid {
    name: String,
    policy: QueueingPolicy,
    callable: Box<dyn Fn() -> ExecuteResult + Send + Sync>,
}

impl CommandVoid {
    /// Creates a void command wrapping `callable`.
    pub fn new(
        name: impl Into<String>,
        policy: QueueingPolicy,
        callable: impl Fn() -> ExecuteResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            policy,
            callable: Box::new(callable),
        }
    }

    /// Returns the command's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the command's queueing policy.
    #[must_use]
    pub fn policy(&self) -> QueueingPolicy {
        self.policy
    }

    /// Returns this command's shape tag.
    #[must_use]
    pub fn shape(&self) -> CommandShape {
        CommandShape::Void
    }

    /// Invokes the wrapped callable.
    pub fn execute(&self) -> ExecuteResult {
        (self.callable)()
    }
}

impl std::fmt::Debug for CommandVoid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandVoid")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecuteError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn void_executes_callable() {
        let hits = Arc::new(AtomicU32::new(0));
        let h = Arc::clone(&hits);
        let cmd = CommandVoid::new("Tick", QueueingPolicy::default(), move || {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        cmd.execute().unwrap();
        cmd.execute().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(cmd.name(), "Tick");
        assert_eq!(cmd.shape(), CommandShape::Void);
    }

    #[test]
    fn void_propagates_handler_failure() {
        let cmd = CommandVoid::new("Fail", QueueingPolicy::default(), || {
            Err(ExecuteError::handler("nope"))
        });
        assert!(matches!(
            cmd.execute(),
            Err(ExecuteError::HandlerFailed(_))
        ));
    }
}
