//! Component behavior hooks.

use axon_command::ExecuteResult;

/// User-supplied lifecycle hooks for a component.
///
/// Every hook is defaulted, so a behavior implements only what it
/// needs. Hooks are called with the state machine already holding the
/// transition — they must not call back into the component's own
/// lifecycle methods.
///
/// | Hook | Called during | Thread |
/// |------|---------------|--------|
/// | `setup` | `create()` | the caller's |
/// | `startup` | `start()` | the caller's |
/// | `run` | each run-loop cycle while `Active` | the component's |
/// | `cleanup` | `kill()` | the run loop's, or the caller's for components without one |
///
/// # Example
///
/// ```
/// use axon_runtime::Behavior;
///
/// struct Counter {
///     ticks: u64,
/// }
///
/// impl Behavior for Counter {
///     fn run(&mut self) {
///         self.ticks += 1;
///     }
/// }
/// ```
pub trait Behavior: Send + 'static {
    /// One-time initialization, run during `create()`.
    ///
    /// # Errors
    ///
    /// A failure aborts the transition; the component stays out of
    /// `Ready` and `create()` may be retried.
    fn setup(&mut self) -> ExecuteResult {
        Ok(())
    }

    /// Activation work, run during `start()` before the run loop
    /// spawns.
    ///
    /// # Errors
    ///
    /// A failure aborts the transition; the component stays `Ready`.
    fn startup(&mut self) -> ExecuteResult {
        Ok(())
    }

    /// One cycle of periodic work, run while the component is
    /// `Active`, after that cycle's mailbox drain.
    fn run(&mut self) {}

    /// Teardown, run exactly once during `kill()`.
    fn cleanup(&mut self) {}
}

/// A behavior with no hooks; for components that only serve commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBehavior;

impl Behavior for NullBehavior {}
