//! Runtime error types raised by value operations.
//!
//! Every failure detected while manipulating a [`Value`](crate::Value) is a
//! [`VmError`] tagged with an [`ErrorKind`]. Errors are raised locally by the
//! operation that detected them and propagate with `?`.

use std::fmt;

use thiserror::Error;

/// The category of a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Lossy or incompatible explicit cast
    TypeCast,
    /// Arithmetic or comparison applied to an incompatible operand pair
    Type,
    /// Integer-domain modulo or integer division by zero
    DivideByZero,
    /// A legacy semantic gap whose policy is deliberately undecided
    UnspecifiedLegacyBehavior,
    /// Invariant violations and everything else
    Misc,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TypeCast => "type-cast error",
            ErrorKind::Type => "type error",
            ErrorKind::DivideByZero => "divide-by-zero error",
            ErrorKind::UnspecifiedLegacyBehavior => "unspecified legacy behavior",
            ErrorKind::Misc => "error",
        };
        f.write_str(name)
    }
}

/// An error raised by a value or VM operation.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, VmError};
///
/// let err = VmError::type_cast("string", "real");
/// assert_eq!(err.kind, ErrorKind::TypeCast);
/// assert_eq!(err.to_string(), "Error casting type string to real");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct VmError {
    /// The category of the error
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
}

/// Result alias used throughout the runtime
pub type Result<T> = std::result::Result<T, VmError>;

impl VmError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Cast between fundamentally incompatible kinds
    pub fn type_cast(src: impl fmt::Display, dst: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::TypeCast,
            format!("Error casting type {src} to {dst}"),
        )
    }

    /// Exact cast whose runtime value does not fit the destination
    pub fn range(src: impl fmt::Display, dst: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::TypeCast,
            format!("Range error converting {src} to {dst}"),
        )
    }

    /// Operation applied to an incompatible operand kind
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    /// Integer-domain division or modulo by zero
    pub fn divide_by_zero() -> Self {
        Self::new(ErrorKind::DivideByZero, "Division by zero")
    }

    /// Behavior the legacy runtime never pinned down
    pub fn unspecified(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnspecifiedLegacyBehavior, message)
    }

    /// Internal or otherwise uncategorised failure
    pub fn misc(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Misc, message)
    }

    /// Whether this error has the given kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}
