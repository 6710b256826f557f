//! Qualified read command: one argument in, one result out, inline.

use crate::arg::ArgSpec;
use crate::error::{ExecuteError, ExecuteResult};
use crate::shape::CommandShape;
use std::any::Any;

/// A named command taking one argument and producing one result.
///
/// Like plain reads, qualified reads are not mutations and always
/// execute inline on the calling thread.
///
/// # Example
///
/// ```
/// use axon_command::CommandQualifiedRead;
///
/// // Look up a joint position by index.
/// let positions = [0.1f64, 0.2, 0.3];
/// let cmd = CommandQualifiedRead::new("GetJoint", move |i: &usize| {
///     positions
///         .get(*i)
///         .copied()
///         .ok_or_else(|| axon_command::ExecuteError::handler("index out of range"))
/// });
///
/// assert_eq!(cmd.execute::<usize, f64>(&1).unwrap(), 0.2);
/// assert!(cmd.execute::<usize, f64>(&9).is_err());
/// ```
pub struct CommandQualifiedRead {
    name: String,
    arg: ArgSpec,
    result: ArgSpec,
    callable: Box<dyn Fn(&dyn Any) -> ExecuteResult<Box<dyn Any + Send>> + Send + Sync>,
}

impl CommandQualifiedRead {
    /// Creates a qualified-read command wrapping `callable`.
    ///
    /// Argument and result prototypes are captured from `T` and `R`.
    pub fn new<T: Any + Send, R: Any + Send>(
        name: impl Into<String>,
        callable: impl Fn(&T) -> ExecuteResult<R> + Send + Sync + 'static,
    ) -> Self {
        let arg = ArgSpec::of::<T>();
        Self {
            name: name.into(),
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
        CommandShape::QualifiedRead
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
}

impl std::fmt::Debug for CommandQualifiedRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQualifiedRead")
            .field("name", &self.name)
            .field("arg", &self.arg)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_read_maps_argument_to_result() {
        let cmd = CommandQualifiedRead::new("Double", |v: &i32| Ok(i64::from(*v) * 2));
        assert_eq!(cmd.execute::<i32, i64>(&21).unwrap(), 42);
    }

    #[test]
    fn qualified_read_rejects_wrong_argument() {
        let cmd = CommandQualifiedRead::new("Double", |v: &i32| Ok(*v * 2));
        assert!(matches!(
            cmd.execute::<f32, i32>(&1.0),
            Err(ExecuteError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn qualified_read_rejects_wrong_result() {
        let cmd = CommandQualifiedRead::new("Double", |v: &i32| Ok(*v * 2));
        assert!(matches!(
            cmd.execute::<i32, String>(&1),
            Err(ExecuteError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn qualified_read_specs() {
        let cmd = CommandQualifiedRead::new("Lookup", |k: &String| Ok(k.len()));
        assert_eq!(cmd.arg_spec(), ArgSpec::of::<String>());
        assert_eq!(cmd.result_spec(), ArgSpec::of::<usize>());
        assert_eq!(cmd.shape(), CommandShape::QualifiedRead);
    }
}
