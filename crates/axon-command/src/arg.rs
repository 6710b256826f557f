//! Argument type descriptions.
//!
//! Write- and read-bearing commands carry an [`ArgSpec`] prototype
//! describing the one argument (or result) type they accept. Every call
//! checks the dynamic type of the supplied value against the prototype;
//! a disagreement is a per-call [`TypeMismatch`](crate::ExecuteError::TypeMismatch)
//! failure, never a panic.
//!
//! Arguments cross mailboxes as `Box<dyn Any + Send>`; the spec is the
//! single "value description" capability the rest of the engine needs —
//! type identity plus a human-readable name for diagnostics.
//!
//! # Example
//!
//! ```
//! use axon_command::ArgSpec;
//!
//! let spec = ArgSpec::of::<i32>();
//! assert!(spec.accepts(&42i32));
//! assert!(!spec.accepts(&"not an int"));
//! assert!(spec.type_name().contains("i32"));
//! ```

use crate::error::{ExecuteError, ExecuteResult};
use std::any::{Any, TypeId};

/// Description of a command argument or result type.
///
/// Captured once at command-creation time from the concrete Rust type;
/// immutable afterwards. Two specs are equal when they describe the same
/// type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    type_id: TypeId,
    type_name: &'static str,
}

impl ArgSpec {
    /// Builds the spec for a concrete type.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the described type's name, for diagnostics only.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if `value`'s dynamic type matches this spec.
    #[must_use]
    pub fn accepts(&self, value: &dyn Any) -> bool {
        value.type_id() == self.type_id
    }

    /// Checks a statically-typed value against this spec.
    ///
    /// # Errors
    ///
    /// Fails with [`ExecuteError::TypeMismatch`] naming both types when
    /// `T` is not the prototype type.
    pub fn check<T: Any>(&self, value: &T) -> ExecuteResult<()> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(ExecuteError::TypeMismatch {
                expected: self.type_name.to_string(),
                found: std::any::type_name::<T>().to_string(),
            })
        }
    }

    /// Checks a statically-named type against this spec.
    ///
    /// Used by typed result extraction: the caller names the type it
    /// expects back and the command verifies it against the prototype
    /// before executing.
    pub fn check_type<T: Any>(&self) -> ExecuteResult<()> {
        if *self == Self::of::<T>() {
            Ok(())
        } else {
            Err(ExecuteError::TypeMismatch {
                expected: self.type_name.to_string(),
                found: std::any::type_name::<T>().to_string(),
            })
        }
    }

    /// Checks an already-erased value against this spec.
    ///
    /// The concrete name of the offending type is no longer available on
    /// this path; the mismatch reports the expected type only.
    pub fn check_erased(&self, value: &dyn Any) -> ExecuteResult<()> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(ExecuteError::TypeMismatch {
                expected: self.type_name.to_string(),
                found: "<erased>".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_accepts_matching_type() {
        let spec = ArgSpec::of::<f64>();
        assert!(spec.accepts(&1.5f64));
        assert!(!spec.accepts(&1.5f32));
    }

    #[test]
    fn spec_check_reports_both_types() {
        let spec = ArgSpec::of::<i32>();
        assert!(spec.check(&7i32).is_ok());

        let err = spec.check(&"seven").unwrap_err();
        match err {
            ExecuteError::TypeMismatch { expected, found } => {
                assert!(expected.contains("i32"));
                assert!(found.contains("str"));
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn spec_check_erased() {
        let spec = ArgSpec::of::<String>();
        let value: Box<dyn std::any::Any> = Box::new("hello".to_string());
        assert!(spec.check_erased(value.as_ref()).is_ok());

        let wrong: Box<dyn std::any::Any> = Box::new(42u8);
        assert!(spec.check_erased(wrong.as_ref()).is_err());
    }

    #[test]
    fn spec_equality_is_type_identity() {
        assert_eq!(ArgSpec::of::<i32>(), ArgSpec::of::<i32>());
        assert_ne!(ArgSpec::of::<i32>(), ArgSpec::of::<u32>());
    }
}
