//! Command shapes.
//!
//! Connection-time matching validates that a required interface's
//! function slot and a provided interface's command agree on name *and*
//! shape; [`CommandShape`] is the tag compared.

use serde::{Deserialize, Serialize};

/// The six command shapes.
///
/// | Shape | Argument | Result | Queueing |
/// |-------|----------|--------|----------|
/// | `Void` | – | – | per policy |
/// | `Read` | – | one | never (inline) |
/// | `Write` | one | – | per policy |
/// | `QualifiedRead` | one | one | never (inline) |
/// | `VoidReturn` | – | one | blocking through the queue |
/// | `WriteReturn` | one | one | blocking through the queue |
///
/// Filtered writes are a composition stored under the `Write` shape;
/// they do not introduce a seventh matching tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandShape {
    /// No argument, no result.
    Void,
    /// One result, executed inline against the latest committed state.
    Read,
    /// One argument, checked against the command's prototype.
    Write,
    /// One argument in, one result out, executed inline.
    QualifiedRead,
    /// As `Void` plus a result; blocks the caller under a queueing
    /// interface until the server thread has executed it.
    VoidReturn,
    /// As `Write` plus a result; blocks like `VoidReturn`.
    WriteReturn,
}

impl std::fmt::Display for CommandShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::QualifiedRead => write!(f, "qualified_read"),
            Self::VoidReturn => write!(f, "void_return"),
            Self::WriteReturn => write!(f, "write_return"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_display() {
        assert_eq!(format!("{}", CommandShape::Void), "void");
        assert_eq!(format!("{}", CommandShape::QualifiedRead), "qualified_read");
        assert_eq!(format!("{}", CommandShape::WriteReturn), "write_return");
    }

    #[test]
    fn shape_equality() {
        assert_eq!(CommandShape::Write, CommandShape::Write);
        assert_ne!(CommandShape::Write, CommandShape::WriteReturn);
    }
}
