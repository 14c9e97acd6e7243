//! Errors surfaced by the dispatch loop

use std::fmt;

use bytecode_system::BytecodeStream;
use core_types::VmError;
use thiserror::Error;

/// One frame of a captured stack trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Display name of the section
    pub section: String,
    /// Program counter within the section
    pub pc: usize,
    /// Source line of the instruction before `pc`, when symbols exist
    pub line: Option<u32>,
}

impl TraceEntry {
    /// Describe the position of a bytecode cursor
    pub fn from_stream(stream: &BytecodeStream) -> Self {
        let pc = stream.position();
        let bytecode = stream.bytecode();
        Self {
            section: bytecode.display_name().to_owned(),
            pc,
            line: bytecode.line_at(pc.saturating_sub(1)),
        }
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.section)?;
        if let Some(line) = self.line {
            write!(f, "line {line}, ")?;
        }
        write!(f, "pc {}", self.pc)
    }
}

/// Render a trace innermost first: `at` for the innermost frame, `by` for
/// each caller
pub fn format_trace(trace: &[TraceEntry]) -> String {
    let mut frames = trace.iter().rev();
    let Some(innermost) = frames.next() else {
        return "<no trace data>".to_owned();
    };
    let mut out = format!("  at {innermost}");
    for frame in frames {
        out.push_str(&format!("\n  by {frame}"));
    }
    out
}

/// An error raised while executing bytecode, with the call stack at the
/// point it was raised (outermost first)
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{}", .error, trace_suffix(.trace))]
pub struct ExecutionError {
    /// The underlying error
    #[source]
    pub error: VmError,
    /// Call stack, innermost last
    pub trace: Vec<TraceEntry>,
}

impl ExecutionError {
    /// Error without trace data
    pub fn bare(error: VmError) -> Self {
        Self {
            error,
            trace: Vec::new(),
        }
    }
}

fn trace_suffix(trace: &[TraceEntry]) -> String {
    if trace.is_empty() {
        String::new()
    } else {
        format!("\n{}", format_trace(trace))
    }
}

impl From<VmError> for ExecutionError {
    fn from(error: VmError) -> Self {
        Self::bare(error)
    }
}

impl From<ExecutionError> for VmError {
    fn from(err: ExecutionError) -> Self {
        err.error
    }
}

/// Failure of a single dispatch step
#[derive(Debug)]
pub(crate) enum Failure {
    /// Raised by this instruction; the loop attaches a trace
    Raised(VmError),
    /// Already traced by a nested call
    Propagated(ExecutionError),
}

impl From<VmError> for Failure {
    fn from(err: VmError) -> Self {
        Failure::Raised(err)
    }
}

impl From<bytecode_system::BytecodeError> for Failure {
    fn from(err: bytecode_system::BytecodeError) -> Self {
        Failure::Raised(err.into())
    }
}

impl From<ExecutionError> for Failure {
    fn from(err: ExecutionError) -> Self {
        Failure::Propagated(err)
    }
}
