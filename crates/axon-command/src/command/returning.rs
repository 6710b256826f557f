//! Return-bearing command variants.
//!
//! [`CommandVoidReturn`] and [`CommandWriteReturn`] mutate state *and*
//! produce a result. Because the semantics require the result before the
//! call returns, these two shapes are always executed synchronously with
//! respect to the caller: under a queueing interface the calling thread
//! blocks until the server thread has drained and executed the entry.
//! The blocking machinery lives in the interface layer; here they are
//! ordinary callables with an erased execution path for the drain loop.

use crate::arg::ArgSpec;
use crate::error::{ExecuteError, ExecuteResult};
use crate::shape::CommandShape;
use axon_types::QueueingPolicy;
use std::any::Any;

/// A void command that also produces one result.
///
/// # Example
///
/// ```
/// use axon_command::CommandVoidReturn;
/// use axon_types::QueueingPolicy;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// let counter = Arc::new(AtomicU32::new(0));
/// let c = Arc::clone(&counter);
/// let cmd = CommandVoidReturn::new("NextSequence", QueueingPolicy::default(), move || {
///     Ok(c.fetch_add(1, Ordering::SeqCst))
/// });
///
/// assert_eq!(cmd.execute::<u32>().unwrap(), 0);
/// assert_eq!(cmd.execute::<u32>().unwrap(), 1);
/// ```
pub struct CommandVoidReturn {
    name: String,
    policy: QueueingPolicy,
    result: ArgSpec,
    callable: Box<dyn Fn() -> ExecuteResult<Box<dyn Any + Send>> + Send + Sync>,
}

impl CommandVoidReturn {
    /// Creates a void-return command wrapping `callable`.
    pub fn new<R: Any + Send>(
        name: impl Into<String>,
        policy: QueueingPolicy,
        callable: impl Fn() -> ExecuteResult<R> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            policy,
            result: ArgSpec::of::<R>(),
            callable: Box::new(move || callable().map(|r| Box::new(r) as Box<dyn Any + Send>)),
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

    /// Returns the result prototype.
    #[must_use]
    pub fn result_spec(&self) -> ArgSpec {
        self.result
    }

    /// Returns this command's shape tag.
    #[must_use]
    pub fn shape(&self) -> CommandShape {
        CommandShape::VoidReturn
    }

    /// Invokes the wrapped callable and extracts a typed result.
    pub fn execute<R: Any + Send>(&self) -> ExecuteResult<R> {
        self.result.check_type::<R>()?;
        let boxed = (self.callable)()?;
        boxed
            .downcast::<R>()
            .map(|b| *b)
            .map_err(|_| ExecuteError::TypeMismatch {
                expected: self.result.type_name().to_string(),
                found: "<erased>".to_string(),
            })
    }

    /// Invokes the wrapped callable, leaving the result boxed.
    ///
    /// Used by the drain loop, which forwards the boxed result through
    /// the completion channel of the blocked caller.
    pub fn execute_erased(&self) -> ExecuteResult<Box<dyn Any + Send>> {
        (self.callable)()
    }
}

impl std::fmt::Debug for CommandVoidReturn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandVoidReturn")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

/// A write command that also produces one result.
///
/// # Example
///
/// ```
/// use axon_command::CommandWriteReturn;
/// use axon_types::QueueingPolicy;
/// use parking_lot::Mutex;
/// use std::sync::Arc;
///
/// let state = Arc::new(Mutex::new(10i32));
/// let s = Arc::clone(&state);
/// let cmd = CommandWriteReturn::new("AddAndGet", QueueingPolicy::default(), move |v: &i32| {
///     let mut guard = s.lock();
///     *guard += *v;
///     Ok(*guard)
/// });
///
/// assert_eq!(cmd.execute::<i32, i32>(&5).unwrap(), 15);
/// ```
pub struct CommandWriteReturn {
    name: String,
    policy: QueueingPolicy,
    arg: ArgSpec,
    result: ArgSpec,
    callable: Box<dyn Fn(&dyn Any) -> ExecuteResult<Box<dyn Any + Send>> + Send + Sync>,
}

impl CommandWriteReturn {
    /// Creates a write-return command wrapping `callable`.
    pub fn new<T: Any + Send, R: Any + Send>(
        name: impl Into<String>,
        policy: QueueingPolicy,
        callable: impl Fn(&T) -> ExecuteResult<R> + Send + Sync + 'static,
    ) -> Self {
        let arg = ArgSpec::of::<T>();
        Self {
            name: name.into(),
            policy,
            arg,
            result: ArgSpec::of::<R>(),
            callable: Box::new(move |any| {
                arg.check_erased(any)?;
                let value = any
                    .downcast_ref::<T>()
                    .ok_or_else(|| ExecuteError::TypeMismatch {
                        expected: arg.type_name().to_string(),
                        found: "<erased>".to_string(),
                    })?;
                callable(value).map(|r| Box::new(r) as Box<dyn Any + Send>)
            }),
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

    /// Returns the argument prototype.
    #[must_use]
    pub fn arg_spec(&self) -> ArgSpec {
        self.arg
    }

    /// Returns the result prototype.
    #[must_use]
    pub fn result_spec(&self) -> ArgSpec {
        self.result
    }

    /// Returns this command's shape tag.
    #[must_use]
    pub fn shape(&self) -> CommandShape {
        CommandShape::WriteReturn
    }

    /// Invokes the wrapped callable with a typed argument and extracts
    /// a typed result.
    pub fn execute<T: Any + Send, R: Any + Send>(&self, arg: &T) -> ExecuteResult<R> {
        self.arg.check(arg)?;
        self.result.check_type::<R>()?;
        let boxed = (self.callable)(arg)?;
        boxed
            .downcast::<R>()
            .map(|b| *b)
            .map_err(|_| ExecuteError::TypeMismatch {
                expected: self.result.type_name().to_string(),
                found: "<erased>".to_string(),
            })
    }

    /// Invokes the wrapped callable with an already-erased argument,
    /// leaving the result boxed.
    pub fn execute_erased(&self, arg: &dyn Any) -> ExecuteResult<Box<dyn Any + Send>> {
        self.arg.check_erased(arg)?;
        (self.callable)(arg)
    }
}

impl std::fmt::Debug for CommandWriteReturn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandWriteReturn")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("arg", &self.arg)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}
