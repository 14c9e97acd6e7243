//! Bytecode decoding and assembly errors

use core_types::VmError;
use thiserror::Error;

/// Failure while reading, assembling or resolving bytecode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
    /// Byte does not name an opcode
    #[error("Unknown opcode {byte:#04x}{}", address.map(|a| format!(" at {a}")).unwrap_or_default())]
    UnknownOpcode {
        /// Offending byte
        byte: u8,
        /// Address it was read from, when known
        address: Option<usize>,
    },

    /// Operand runs past the end of the section
    #[error("Unexpected end of bytecode at {address}")]
    UnexpectedEnd {
        /// Address of the truncated read
        address: usize,
    },

    /// Inline string is not valid UTF-8 or contains NUL
    #[error("Malformed inline string at {address}")]
    InvalidString {
        /// Address of the string
        address: usize,
    },

    /// Seek target lies outside the section
    #[error("Branch target {target} outside section of length {len}")]
    InvalidAddress {
        /// Requested target
        target: i64,
        /// Section length
        len: usize,
    },

    /// No bytecode registered at the index
    #[error("No bytecode section with index {0}")]
    NoSuchSection(u32),

    /// Value kind cannot be encoded inline
    #[error("Values of kind {kind} have no immediate form")]
    NoImmediate {
        /// Kind name
        kind: &'static str,
    },

    /// A label was referenced but never bound
    #[error("Label {0} was never bound")]
    UnboundLabel(usize),
}

impl From<BytecodeError> for VmError {
    fn from(err: BytecodeError) -> Self {
        VmError::misc(err.to_string())
    }
}
