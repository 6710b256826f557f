//! Write command: one argument, checked against a prototype.

use crate::arg::ArgSpec;
use crate::error::ExecuteResult;
use crate::shape::CommandShape;
use axon_types::QueueingPolicy;
use parking_lot::Mutex;
use std::any::Any;

/// A named command taking one argument and producing no result.
///
/// The argument's dynamic type must equal the prototype captured at
/// creation; a mismatch is a per-call failure, not a crash.
///
/// # Example
///
/// ```
/// use axon_command::CommandWrite;
/// use axon_types::QueueingPolicy;
/// use parking_lot::Mutex;
/// use std::sync::Arc;
///
/// let target = Arc::new(Mutex::new(0i32));
/// let t = Arc::clone(&target);
/// let cmd = CommandWrite::new("SetValue", QueueingPolicy::default(), move |v: &i32| {
///     *t.lock() = *v;
///     Ok(())
/// });
///
/// cmd.execute(&7i32).unwrap();
/// assert_eq!(*target.lock(), 7);
/// ```
pub struct CommandWrite {
    name: String,
    policy: QueueingPolicy,
    arg: ArgSpec,
    callable: Box<dyn Fn(&dyn Any) -> ExecuteResult + Send + Sync>,
}

impl CommandWrite {
    /// Creates a write command wrapping `callable`.
    ///
    /// The argument prototype is captured from `T`.
    pub fn new<T: Any + Send>(
        name: impl Into<String>,
        policy: QueueingPolicy,
        callable: impl Fn(&T) -> ExecuteResult + Send + Sync + 'static,
    ) -> Self {
        let spec = ArgSpec::of::<T>();
        Self {
            name: name.into(),
            policy,
            arg: spec,
            callable: Box::new(move |any| {
                // The typed and erased entry points both check the spec
                // before reaching here, so this downcast cannot fail.
                spec.check_erased(any)?;
                let value = any.downcast_ref::<T>().ok_or_else(|| {
                    crate::error::ExecuteError::TypeMismatch {
                        expected: spec.type_name().to_string(),
                        found: "<erased>".to_string(),
                    }
                })?;
                callable(value)
            }),
        }
    }

    /// Creates a filtered write: a qualified-read `filter` immediately
    /// followed by `write` on the filter's output.
    ///
    /// Invocations of the same filtered-write command are serialized
    /// against each other, so the filter-then-write pair is atomic with
    /// respect to concurrent calls of this name. Plain writes to the
    /// same underlying state are not serialized against it.
    pub fn filtered<T: Any + Send, U: Any + Send>(
        name: impl Into<String>,
        policy: QueueingPolicy,
        filter: impl Fn(&T) -> ExecuteResult<U> + Send + Sync + 'static,
        write: impl Fn(&U) -> ExecuteResult + Send + Sync + 'static,
    ) -> Self {
        let pair = Mutex::new(());
        Self::new(name, policy, move |input: &T| {
            let _guard = pair.lock();
            let filtered = filter(input)?;
            write(&filtered)
        })
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

    /// Returns the argument prototype.
    #[must_use]
    pub fn arg_spec(&self) -> ArgSpec {
        self.arg
    }

    /// Returns this command's shape tag.
    #[must_use]
    pub fn shape(&self) -> CommandShape {
        CommandShape::Write
    }

    /// Invokes the wrapped callable with a typed argument.
    pub fn execute<T: Any + Send>(&self, arg: &T) -> ExecuteResult {
        self.arg.check(arg)?;
        (self.callable)(arg)
    }

    /// Invokes the wrapped callable with an already-erased argument.
    ///
    /// Used by the mailbox drain path, where arguments travel boxed.
    pub fn execute_erased(&self, arg: &dyn Any) -> ExecuteResult {
        self.arg.check_erased(arg)?;
        (self.callable)(arg)
    }
}

impl std::fmt::Debug for CommandWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandWrite")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("arg", &self.arg)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecuteError;
    use std::sync::Arc;

    #[test]
    fn write_mutates_captured_state() {
        let target = Arc::new(Mutex::new(String::new()));
        let t = Arc::clone(&target);
        let cmd = CommandWrite::new("SetName", QueueingPolicy::default(), move |v: &String| {
            *t.lock() = v.clone();
            Ok(())
        });

        cmd.execute(&"psm1".to_string()).unwrap();
        assert_eq!(*target.lock(), "psm1");
    }

    #[test]
    fn write_rejects_mismatched_argument() {
        let cmd = CommandWrite::new("SetValue", QueueingPolicy::default(), |_: &i32| Ok(()));
        let err = cmd.execute(&1.0f64).unwrap_err();
        assert!(matches!(err, ExecuteError::TypeMismatch { .. }));
    }

    #[test]
    fn write_erased_path_checks_type() {
        let cmd = CommandWrite::new("SetValue", QueueingPolicy::default(), |_: &i32| Ok(()));
        let good: Box<dyn Any + Send> = Box::new(5i32);
        let bad: Box<dyn Any + Send> = Box::new("five");

        assert!(cmd.execute_erased(good.as_ref()).is_ok());
        assert!(cmd.execute_erased(bad.as_ref()).is_err());
    }

    #[test]
    fn filtered_write_applies_filter_then_write() {
        let target = Arc::new(Mutex::new(0i64));
        let t = Arc::clone(&target);
        let cmd = CommandWrite::filtered(
            "SetClamped",
            QueueingPolicy::default(),
            |v: &i64| Ok((*v).clamp(0, 100)),
            move |clamped: &i64| {
                *t.lock() = *clamped;
                Ok(())
            },
        );

        cmd.execute(&250i64).unwrap();
        assert_eq!(*target.lock(), 100);
        cmd.execute(&42i64).unwrap();
        assert_eq!(*target.lock(), 42);
    }

    #[test]
    fn filtered_write_propagates_filter_failure() {
        let cmd = CommandWrite::filtered(
            "SetChecked",
            QueueingPolicy::default(),
            |v: &i64| {
                if *v < 0 {
                    Err(ExecuteError::handler("negative"))
                } else {
                    Ok(*v)
                }
            },
            |_: &i64| Ok(()),
        );

        assert!(cmd.execute(&-1i64).is_err());
        assert!(cmd.execute(&1i64).is_ok());
    }
}
