//! Conversions from [`Value`] into host types.
//!
//! Two strengths are offered:
//!
//! - **exact**: succeeds only if the runtime value is exactly representable in
//!   the target (a real holding `3.0` converts to `i32`; `3.5` does not)
//! - **coerce**: always produces a target value by truncating, wrapping or
//!   re-tagging, failing only for fundamentally incompatible kinds
//!
//! Coercing to `bool` evaluates [`Value::cond`].

use num_traits::ToPrimitive;

use crate::error::{Result, VmError};
use crate::value::{is_integral_real, Pointer, Value};

/// A host type a [`Value`] can be cast into.
pub trait FromValue: Sized {
    /// Target name used in error messages
    const NAME: &'static str;

    /// Lossless conversion
    fn from_exact(value: &Value) -> Result<Self>;

    /// Permissive conversion
    fn from_coerce(value: &Value) -> Result<Self>;
}

fn incompatible<T: FromValue>(value: &Value) -> VmError {
    VmError::type_cast(value.kind(), T::NAME)
}

fn out_of_range<T: FromValue>(value: &Value) -> VmError {
    VmError::range(value.kind(), T::NAME)
}

/// Exact conversion of a real to an integer type via `convert`
fn exact_from_real<T: FromValue>(
    value: &Value,
    r: f64,
    convert: impl FnOnce(f64) -> Option<T>,
) -> Result<T> {
    if !is_integral_real(r) {
        return Err(out_of_range::<T>(value));
    }
    convert(r).ok_or_else(|| out_of_range::<T>(value))
}

impl FromValue for bool {
    const NAME: &'static str = "bool";

    fn from_exact(value: &Value) -> Result<Self> {
        let bit = match value {
            Value::Bool(b) => return Ok(*b),
            Value::Int32(i) => *i as i64,
            Value::UInt64(u) if *u <= 1 => *u as i64,
            Value::UInt64(_) => return Err(out_of_range::<Self>(value)),
            Value::Real(r) if *r == 0.0 || *r == 1.0 => *r as i64,
            Value::Real(_) => return Err(out_of_range::<Self>(value)),
            _ => return Err(incompatible::<Self>(value)),
        };
        match bit {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(out_of_range::<Self>(value)),
        }
    }

    fn from_coerce(value: &Value) -> Result<Self> {
        value.cond()
    }
}

impl FromValue for i32 {
    const NAME: &'static str = "int";

    fn from_exact(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b as i32),
            Value::Int32(i) => Ok(*i),
            Value::UInt64(u) => u.to_i32().ok_or_else(|| out_of_range::<Self>(value)),
            Value::Real(r) => exact_from_real(value, *r, |r| r.to_i32()),
            _ => Err(incompatible::<Self>(value)),
        }
    }

    fn from_coerce(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b as i32),
            Value::Int32(i) => Ok(*i),
            Value::UInt64(u) => Ok(*u as i32),
            Value::Real(r) => Ok(*r as i32),
            _ => Err(incompatible::<Self>(value)),
        }
    }
}

impl FromValue for i64 {
    const NAME: &'static str = "int64";

    fn from_exact(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b as i64),
            Value::Int32(i) => Ok(*i as i64),
            Value::UInt64(u) => u.to_i64().ok_or_else(|| out_of_range::<Self>(value)),
            Value::Real(r) => exact_from_real(value, *r, |r| r.to_i64()),
            _ => Err(incompatible::<Self>(value)),
        }
    }

    fn from_coerce(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b as i64),
            Value::Int32(i) => Ok(*i as i64),
            Value::UInt64(u) => Ok(*u as i64),
            Value::Real(r) => Ok(*r as i64),
            _ => Err(incompatible::<Self>(value)),
        }
    }
}

impl FromValue for u64 {
    const NAME: &'static str = "uint64";

    fn from_exact(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b as u64),
            Value::Int32(i) => i.to_u64().ok_or_else(|| out_of_range::<Self>(value)),
            Value::UInt64(u) => Ok(*u),
            Value::Real(r) => exact_from_real(value, *r, |r| r.to_u64()),
            _ => Err(incompatible::<Self>(value)),
        }
    }

    fn from_coerce(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b as u64),
            Value::Int32(i) => Ok(*i as u64),
            Value::UInt64(u) => Ok(*u),
            Value::Real(r) => Ok(*r as i64 as u64),
            _ => Err(incompatible::<Self>(value)),
        }
    }
}

impl FromValue for usize {
    const NAME: &'static str = "size";

    fn from_exact(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b as usize),
            Value::Int32(i) => i.to_usize().ok_or_else(|| out_of_range::<Self>(value)),
            Value::UInt64(u) => u.to_usize().ok_or_else(|| out_of_range::<Self>(value)),
            Value::Real(r) => exact_from_real(value, *r, |r| r.to_usize()),
            _ => Err(incompatible::<Self>(value)),
        }
    }

    fn from_coerce(value: &Value) -> Result<Self> {
        u64::from_coerce(value).map(|u| u as usize)
    }
}

impl FromValue for f64 {
    const NAME: &'static str = "real";

    fn from_exact(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b as i32 as f64),
            Value::Int32(i) => Ok(*i as f64),
            Value::UInt64(u) => {
                let r = *u as f64;
                // 2^64 does not survive the round trip even though `as`
                // saturates it back to u64::MAX
                if r as u128 == *u as u128 {
                    Ok(r)
                } else {
                    Err(out_of_range::<Self>(value))
                }
            }
            Value::Real(r) => Ok(*r),
            _ => Err(incompatible::<Self>(value)),
        }
    }

    fn from_coerce(value: &Value) -> Result<Self> {
        value
            .num()
            .map(|n| n.as_f64())
            .ok_or_else(|| incompatible::<Self>(value))
    }
}

impl FromValue for String {
    const NAME: &'static str = "string";

    fn from_exact(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            _ => Err(incompatible::<Self>(value)),
        }
    }

    fn from_coerce(value: &Value) -> Result<Self> {
        Self::from_exact(value)
    }
}

impl FromValue for Pointer {
    const NAME: &'static str = "pointer";

    fn from_exact(value: &Value) -> Result<Self> {
        match value {
            Value::Pointer(p) => Ok(*p),
            _ => Err(incompatible::<Self>(value)),
        }
    }

    fn from_coerce(value: &Value) -> Result<Self> {
        Self::from_exact(value)
    }
}

impl Value {
    /// Convert losslessly into `T`.
    ///
    /// # Errors
    ///
    /// A `TypeCast` error naming source and destination when the value does
    /// not fit or the kinds are incompatible.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert_eq!(Value::Real(3.0).cast_exact::<i32>().unwrap(), 3);
    /// assert!(Value::Real(3.5).cast_exact::<i32>().is_err());
    /// ```
    pub fn cast_exact<T: FromValue>(&self) -> Result<T> {
        T::from_exact(self)
    }

    /// Convert into `T`, truncating or wrapping as needed.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert_eq!(Value::Real(3.9).cast_coerce::<i32>().unwrap(), 3);
    /// assert!(Value::Real(0.7).cast_coerce::<bool>().unwrap());
    /// ```
    pub fn cast_coerce<T: FromValue>(&self) -> Result<T> {
        T::from_coerce(self)
    }

    /// Convert in place, re-tagging the value as `T`'s kind
    pub fn coerce<T: FromValue + Into<Value>>(&mut self) -> Result<()> {
        let converted: T = self.cast_coerce()?;
        *self = converted.into();
        Ok(())
    }
}
