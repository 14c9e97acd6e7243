//! Dynamically-typed runtime values.
//!
//! This module provides the core [`Value`] enum manipulated by the virtual
//! machine. Releasing a value is structural: dropping it releases any string
//! buffer or array reference it holds, and [`Value::take`] moves a value out
//! leaving [`Value::Undefined`] behind.

use std::fmt;
use std::rc::Rc;

use crate::array::ArrayHandle;
use crate::error::{Result, VmError};

/// An opaque host pointer carried through the VM by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pointer(pub usize);

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0x{:x}>", self.0)
    }
}

/// The kind (tag) of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// No value
    Undefined,
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int32,
    /// 64-bit unsigned integer
    UInt64,
    /// 64-bit float
    Real,
    /// Shared string
    String,
    /// Copy-on-write array handle
    Array,
    /// Opaque pointer
    Pointer,
}

impl ValueKind {
    /// Short lowercase name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Bool => "bool",
            ValueKind::Int32 => "int",
            ValueKind::UInt64 => "uint64",
            ValueKind::Real => "real",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Pointer => "pointer",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents any runtime value.
///
/// # Examples
///
/// ```
/// use core_types::{Value, ValueKind};
///
/// let n = Value::Int32(42);
/// assert_eq!(n.kind(), ValueKind::Int32);
/// assert!(n.cond().unwrap());
///
/// let s = Value::from("hello");
/// assert_eq!(s.to_string(), "\"hello\"");
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Undefined,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// 64-bit IEEE float
    Real(f64),
    /// Immutable shared string
    String(Rc<str>),
    /// Handle to shared, copy-on-write array data
    Array(ArrayHandle),
    /// Opaque host pointer
    Pointer(Pointer),
}

/// Numeric view of a value used by the arithmetic and comparison tables.
///
/// Booleans behave as integers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Num {
    Int(i32),
    UInt(u64),
    Real(f64),
}

impl Num {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::UInt(u) => u as f64,
            Num::Real(r) => r,
        }
    }
}

/// Whether a real holds an integral value
pub(crate) fn is_integral_real(r: f64) -> bool {
    r == r.floor()
}

impl Value {
    /// The kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int32(_) => ValueKind::Int32,
            Value::UInt64(_) => ValueKind::UInt64,
            Value::Real(_) => ValueKind::Real,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Pointer(_) => ValueKind::Pointer,
        }
    }

    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// Move the value out, leaving [`Value::Undefined`] in its place
    pub fn take(&mut self) -> Value {
        std::mem::take(self)
    }

    /// Whether this is [`Value::Undefined`]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Whether this is an array value (possibly with unallocated data)
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Whether this is a string value
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Whether this value takes part in numeric arithmetic
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int32(_) | Value::UInt64(_) | Value::Real(_)
        )
    }

    /// Whether this is a numeric value of an integer kind (reals excluded)
    pub fn is_integral(&self) -> bool {
        self.is_numeric() && !matches!(self, Value::Real(_))
    }

    /// Borrow the string payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the array handle, if any
    pub fn as_array(&self) -> Option<&ArrayHandle> {
        match self {
            Value::Array(handle) => Some(handle),
            _ => None,
        }
    }

    pub(crate) fn num(&self) -> Option<Num> {
        match self {
            Value::Bool(b) => Some(Num::Int(*b as i32)),
            Value::Int32(i) => Some(Num::Int(*i)),
            Value::UInt64(u) => Some(Num::UInt(*u)),
            Value::Real(r) => Some(Num::Real(*r)),
            _ => None,
        }
    }

    pub(crate) fn from_num(num: Num) -> Self {
        match num {
            Num::Int(i) => Value::Int32(i),
            Num::UInt(u) => Value::UInt64(u),
            Num::Real(r) => Value::Real(r),
        }
    }

    /// Evaluate the value as a branch condition.
    ///
    /// Integers are true when strictly positive, uint64 when nonzero, and
    /// reals when `>= 0.5`.
    ///
    /// # Errors
    ///
    /// `Misc` on undefined; `UnspecifiedLegacyBehavior` on strings, arrays and
    /// pointers.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert!(Value::Real(0.5).cond().unwrap());
    /// assert!(!Value::Real(0.49).cond().unwrap());
    /// assert!(!Value::Int32(-1).cond().unwrap());
    /// ```
    pub fn cond(&self) -> Result<bool> {
        match self {
            Value::Undefined => Err(VmError::misc("Condition on undefined variable.")),
            Value::Bool(b) => Ok(*b),
            Value::Int32(i) => Ok(*i > 0),
            Value::UInt64(u) => Ok(*u != 0),
            Value::Real(r) => Ok(*r >= 0.5),
            other => Err(VmError::unspecified(format!("cond(): {}", other.kind()))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt64(u)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Pointer> for Value {
    fn from(p: Pointer) -> Self {
        Value::Pointer(p)
    }
}

impl From<ArrayHandle> for Value {
    fn from(handle: ArrayHandle) -> Self {
        Value::Array(handle)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_display(f, &mut Vec::new())
    }
}

impl Value {
    fn write_display(&self, f: &mut fmt::Formatter<'_>, visiting: &mut Vec<usize>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("<undefined>"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int32(i) => write!(f, "{i}"),
            Value::UInt64(u) => write!(f, "{u}L"),
            Value::Real(r) => write!(f, "{r:.2}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Pointer(p) => write!(f, "{p}"),
            Value::Array(handle) => {
                let Some(data) = handle.data() else {
                    return f.write_str("[]");
                };
                let address = handle.address();
                if visiting.contains(&address) {
                    return f.write_str("[...]");
                }
                visiting.push(address);
                f.write_str("[")?;
                for (i, row) in data.rows().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str("[")?;
                    for (j, cell) in row.iter().enumerate() {
                        if j > 0 {
                            f.write_str(", ")?;
                        }
                        cell.write_display(f, visiting)?;
                    }
                    f.write_str("]")?;
                }
                visiting.pop();
                f.write_str("]")
            }
        }
    }
}
