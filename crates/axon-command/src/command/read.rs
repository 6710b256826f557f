//! Read command: one result, always executed inline.

use crate::arg::ArgSpec;
use crate::error::{ExecuteError, ExecuteResult};
use crate::shape::CommandShape;
use std::any::Any;

/// A named command producing one result and taking no argument.
///
/// Reads are not mutations: they always execute inline on the calling
/// thread against the latest committed state and have no queueing
/// semantics.
///
/// # Example
///
/// ```
/// use axon_command::CommandRead;
///
/// let cmd = CommandRead::new("GetValue", || Ok(17i32));
/// assert_eq!(cmd.execute::<i32>().unwrap(), 17);
///
/// // Asking for the wrong result type fails cleanly.
/// assert!(cmd.execute::<f64>().is_err());
/// ```
pub struct CommandRead {
    name: String,
    result: ArgSpec,
    callable: Box<dyn Fn() -> ExecuteResult<Box<dyn Any + Send>> + Send + Sync>,
}

impl CommandRead {
    /// Creates a read command wrapping `callable`.
    ///
    /// The result prototype is captured from `R`.
    pub fn new<R: Any + Send>(
        name: impl Into<String>,
        callable: impl Fn() -> ExecuteResult<R> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            result: ArgSpec::of::<R>(),
            callable: Box::new(move || callable().map(|r| Box::new(r) as Box<dyn Any + Send>)),
        }
    }

    /// Returns the command's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the result prototype.
    #[must_use]
    pub fn result_spec(&self) -> ArgSpec {
        self.result
    }

    /// Returns this command's shape tag.
    #[must_use]
    pub fn shape(&self) -> CommandShape {
        CommandShape::Read
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
}

impl std::fmt::Debug for CommandRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRead")
            .field("name", &self.name)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}
