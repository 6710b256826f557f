//! Unified error interface for AXON.
//!
//! This module provides the [`ErrorCode`] trait for standardized error
//! handling across all AXON crates.
//!
//! # Design
//!
//! Every public operation in the middleware returns an explicit `Result`
//! distinguishing success from each failure kind; nothing throws or
//! panics for expected conditions. All AXON error types implement
//! [`ErrorCode`] to provide:
//!
//! - **Machine-readable codes**: for programmatic error handling
//! - **Recoverability info**: for retry logic at the call site
//!
//! # Example
//!
//! ```
//! use axon_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum CallError {
//!     MailboxFull,
//!     TypeMismatch,
//! }
//!
//! impl ErrorCode for CallError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::MailboxFull => "EXEC_MAILBOX_FULL",
//!             Self::TypeMismatch => "EXEC_TYPE_MISMATCH",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         // Capacity pressure clears once the consumer drains;
//!         // a wrong argument type never will.
//!         matches!(self, Self::MailboxFull)
//!     }
//! }
//!
//! let err = CallError::MailboxFull;
//! assert_eq!(err.code(), "EXEC_MAILBOX_FULL");
//! assert!(err.is_recoverable());
//! ```

/// Unified error code interface for AXON errors.
///
/// # Code Format
///
/// Error codes should be:
///
/// - **UPPER_SNAKE_CASE**: e.g., `"EXEC_MAILBOX_FULL"`
/// - **Layer-prefixed**: `"EXEC_"`, `"INTERFACE_"`, `"CONNECT_"`,
///   `"LIFECYCLE_"`
/// - **Stable**: codes do not change once defined (API contract)
///
/// # Recoverability
///
/// An error is recoverable if retrying the operation may succeed — a
/// full mailbox drains, a blocked component resumes. Configuration
/// errors (duplicate names, incompatible interfaces) and type errors
/// are not recoverable: retrying the same call cannot help.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    ///
    /// UPPER_SNAKE_CASE, prefixed with the layer that produced it, and
    /// stable across versions.
    fn code(&self) -> &'static str;

    /// Returns whether the error is recoverable.
    ///
    /// - `true`: retry may succeed (transient condition)
    /// - `false`: retry will not help (configuration or type error)
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows AXON conventions.
///
/// # Checks
///
/// 1. Code is not empty
/// 2. Code starts with the expected layer prefix
/// 3. Code is UPPER_SNAKE_CASE
///
/// # Panics
///
/// Panics with a descriptive message if validation fails. Intended for
/// use in tests covering every variant of an error enum.
///
/// # Example
///
/// ```
/// use axon_types::{assert_error_code, ErrorCode};
///
/// #[derive(Debug)]
/// struct Full;
///
/// impl ErrorCode for Full {
///     fn code(&self) -> &'static str { "EXEC_MAILBOX_FULL" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&Full, "EXEC_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Validates multiple error codes at once.
///
/// Use this to verify all variants of an error enum share a prefix.
///
/// # Example
///
/// ```
/// use axon_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum E { A, B }
///
/// impl ErrorCode for E {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::A => "CONNECT_ALREADY_CONNECTED",
///             Self::B => "CONNECT_NOT_CONNECTED",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[E::A, E::B], "CONNECT_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stand-in for a hardware-facing error enum like the ones the
    /// dispatch layers define.
    #[derive(Debug)]
    enum DriveError {
        BusSaturated,
        EncoderLost,
    }

    impl ErrorCode for DriveError {
        fn code(&self) -> &'static str {
            match self {
                Self::BusSaturated => "DRIVE_BUS_SATURATED",
                Self::EncoderLost => "DRIVE_ENCODER_LOST",
            }
        }

        fn is_recoverable(&self) -> bool {
            // A saturated bus clears; a lost encoder needs a power cycle.
            matches!(self, Self::BusSaturated)
        }
    }

    #[test]
    fn code_and_recoverability_per_variant() {
        assert_eq!(DriveError::BusSaturated.code(), "DRIVE_BUS_SATURATED");
        assert!(DriveError::BusSaturated.is_recoverable());
        assert!(!DriveError::EncoderLost.is_recoverable());
    }

    #[test]
    fn prefix_assert_accepts_matching_code() {
        assert_error_code(&DriveError::EncoderLost, "DRIVE_");
    }

    #[test]
    fn prefix_assert_covers_every_variant() {
        assert_error_codes(&[DriveError::BusSaturated, DriveError::EncoderLost], "DRIVE_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn prefix_assert_rejects_foreign_code() {
        assert_error_code(&DriveError::BusSaturated, "CONNECT_");
    }

    #[test]
    fn upper_snake_case_accepts_codes() {
        assert!(is_upper_snake_case("DRIVE"));
        assert!(is_upper_snake_case("DRIVE_BUS_SATURATED"));
        assert!(is_upper_snake_case("AXIS_3_FAULT"));
    }

    #[test]
    fn upper_snake_case_rejects_malformed_codes() {
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("drive"));
        assert!(!is_upper_snake_case("Drive_Fault"));
        assert!(!is_upper_snake_case("_DRIVE"));
        assert!(!is_upper_snake_case("DRIVE_"));
        assert!(!is_upper_snake_case("DRIVE__FAULT"));
    }
}
