//! Equality and ordering between values.
//!
//! Numeric kinds compare across tag boundaries; strings by content; arrays
//! and pointers by identity. Ordering is defined only between numeric kinds.

use std::cmp::Ordering;

use crate::error::{Result, VmError};
use crate::value::{Num, Value};

fn numeric_cmp(a: Num, b: Num) -> Option<Ordering> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
        (Num::Int(x), Num::UInt(y)) => Some((x as i128).cmp(&(y as i128))),
        (Num::UInt(x), Num::Int(y)) => Some((x as i128).cmp(&(y as i128))),
        (Num::UInt(x), Num::UInt(y)) => Some(x.cmp(&y)),
        (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.num(), other.num()) {
            return numeric_cmp(a, b) == Some(Ordering::Equal);
        }
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::String(a), Value::String(b)) => a == b,
            // an unallocated array still equals itself
            (Value::Array(a), Value::Array(b)) => std::ptr::eq(a, b) || a.ptr_eq(b),
            (Value::Pointer(a), Value::Pointer(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Numeric ordering between two values.
    ///
    /// Returns `None` when a real operand is NaN.
    ///
    /// # Errors
    ///
    /// A `Type` error when either operand is not numeric.
    pub fn try_cmp(&self, other: &Value) -> Result<Option<Ordering>> {
        match (self.num(), other.num()) {
            (Some(a), Some(b)) => Ok(numeric_cmp(a, b)),
            _ => Err(VmError::type_error("Cannot order non-numerical types")),
        }
    }

    /// `self < other`
    pub fn lt(&self, other: &Value) -> Result<bool> {
        Ok(self.try_cmp(other)? == Some(Ordering::Less))
    }

    /// `self <= other`
    pub fn le(&self, other: &Value) -> Result<bool> {
        Ok(matches!(
            self.try_cmp(other)?,
            Some(Ordering::Less | Ordering::Equal)
        ))
    }

    /// `self > other`
    pub fn gt(&self, other: &Value) -> Result<bool> {
        Ok(self.try_cmp(other)? == Some(Ordering::Greater))
    }

    /// `self >= other`
    pub fn ge(&self, other: &Value) -> Result<bool> {
        Ok(matches!(
            self.try_cmp(other)?,
            Some(Ordering::Greater | Ordering::Equal)
        ))
    }
}
