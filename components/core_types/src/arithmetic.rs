//! Compound-assignment arithmetic on values.
//!
//! Each operator switches on the pair of operand kinds. Booleans behave as
//! `int`. The domain rules are legacy-pinned:
//!
//! - mixed int/real stays in the integer domain when the real is integral
//! - `/` always yields a real, and a zero divisor yields `+inf`
//! - integer-domain `%` and `div` by zero raise `DivideByZero`
//! - `%`, shifts and bitwise operators refuse non-integral reals with
//!   `UnspecifiedLegacyBehavior`
//!
//! Integer overflow wraps.

use crate::error::{Result, VmError};
use crate::value::{is_integral_real, Num, Value};

fn operands(lhs: &Value, rhs: &Value, verb: &str) -> Result<(Num, Num)> {
    match (lhs.num(), rhs.num()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(VmError::type_error(format!("Cannot {verb} types"))),
    }
}

fn unspecified(what: &str) -> VmError {
    VmError::unspecified(what.to_string())
}

/// `a op b` computed on signed 128-bit intermediates, truncated to int
fn wide_int(a: u64, b: i64, op: fn(i128, i128) -> i128) -> Num {
    Num::Int(op(a as i128, b as i128) as i32)
}

fn add(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_add(y)),
        (Num::Int(x), Num::UInt(y)) => Num::UInt((x as u64).wrapping_add(y)),
        (Num::Int(x), Num::Real(y)) if is_integral_real(y) => Num::Int(x.wrapping_add(y as i32)),
        (Num::Int(x), Num::Real(y)) => Num::Real(x as f64 + y),
        (Num::UInt(x), Num::Int(y)) => Num::UInt(x.wrapping_add(y as u64)),
        (Num::UInt(x), Num::UInt(y)) => Num::UInt(x.wrapping_add(y)),
        (Num::UInt(x), Num::Real(y)) if is_integral_real(y) && x as f64 >= -y => {
            Num::UInt(x.wrapping_add(y as i64 as u64))
        }
        (Num::UInt(x), Num::Real(y)) => Num::Real(x as f64 + y),
        (Num::Real(x), Num::Int(y)) if is_integral_real(x) => Num::Int((x as i32).wrapping_add(y)),
        (Num::Real(x), Num::Int(y)) => Num::Real(x + y as f64),
        (Num::Real(x), Num::UInt(y)) if is_integral_real(x) => {
            if x >= 0.0 {
                Num::UInt((x as u64).wrapping_add(y))
            } else {
                Num::Int((x as i32).wrapping_add(y as i32))
            }
        }
        (Num::Real(x), Num::UInt(y)) => Num::Real(x + y as f64),
        (Num::Real(x), Num::Real(y)) => Num::Real(x + y),
    }
}

fn sub(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_sub(y)),
        (Num::Int(x), Num::UInt(y)) => Num::Int((x as u64).wrapping_sub(y) as i32),
        (Num::Int(x), Num::Real(y)) if is_integral_real(y) => Num::Int(x.wrapping_sub(y as i32)),
        (Num::Int(x), Num::Real(y)) => Num::Real(x as f64 - y),
        (Num::UInt(x), Num::Int(y)) if (y as i128) > x as i128 => {
            wide_int(x, y as i64, |a, b| a - b)
        }
        (Num::UInt(x), Num::Int(y)) => Num::UInt(x.wrapping_sub(y as i64 as u64)),
        (Num::UInt(x), Num::UInt(y)) if y > x => Num::Int((x as i32).wrapping_sub(y as i32)),
        (Num::UInt(x), Num::UInt(y)) => Num::UInt(x - y),
        (Num::UInt(x), Num::Real(y)) if is_integral_real(y) && x as f64 >= y => {
            Num::UInt(x.wrapping_sub(y as i64 as u64))
        }
        (Num::UInt(x), Num::Real(y)) => Num::Real(x as f64 - y),
        (Num::Real(x), Num::Int(y)) if is_integral_real(x) => Num::Int((x as i32).wrapping_sub(y)),
        (Num::Real(x), Num::Int(y)) => Num::Real(x - y as f64),
        (Num::Real(x), Num::UInt(y)) if is_integral_real(x) => {
            Num::Int((x as i32).wrapping_sub(y as i32))
        }
        (Num::Real(x), Num::UInt(y)) => Num::Real(x - y as f64),
        (Num::Real(x), Num::Real(y)) => Num::Real(x - y),
    }
}

fn mul(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_mul(y)),
        (Num::Int(x), Num::UInt(y)) => Num::UInt((x as u64).wrapping_mul(y)),
        (Num::Int(x), Num::Real(y)) if is_integral_real(y) => Num::Int(x.wrapping_mul(y as i32)),
        (Num::Int(x), Num::Real(y)) => Num::Real(x as f64 * y),
        (Num::UInt(x), Num::Int(y)) if y < 0 => Num::Int((x as i32).wrapping_mul(y)),
        (Num::UInt(x), Num::Int(y)) => Num::UInt(x.wrapping_mul(y as u64)),
        (Num::UInt(x), Num::UInt(y)) => Num::UInt(x.wrapping_mul(y)),
        (Num::UInt(x), Num::Real(y)) if is_integral_real(y) => {
            if y >= 0.0 {
                Num::UInt(x.wrapping_mul(y as u64))
            } else {
                Num::Int((x as i32).wrapping_mul(y as i32))
            }
        }
        (Num::UInt(x), Num::Real(y)) => Num::Real(x as f64 * y),
        (Num::Real(x), Num::Int(y)) if is_integral_real(x) => Num::Int((x * y as f64) as i32),
        (Num::Real(x), Num::Int(y)) => Num::Real(x * y as f64),
        (Num::Real(x), Num::UInt(y)) if is_integral_real(x) => Num::UInt((x * y as f64) as u64),
        (Num::Real(x), Num::UInt(y)) => Num::Real(x * y as f64),
        (Num::Real(x), Num::Real(y)) => Num::Real(x * y),
    }
}

fn fdiv(a: Num, b: Num) -> Num {
    let divisor = b.as_f64();
    if divisor == 0.0 {
        return Num::Real(f64::INFINITY);
    }
    Num::Real(a.as_f64() / divisor)
}

fn is_zero(n: Num) -> bool {
    match n {
        Num::Int(i) => i == 0,
        Num::UInt(u) => u == 0,
        Num::Real(r) => r == 0.0,
    }
}

fn rem(a: Num, b: Num) -> Result<Num> {
    if matches!(a, Num::Real(x) if !is_integral_real(x)) {
        return Err(unspecified("% on non-integral real"));
    }
    if matches!(b, Num::Real(y) if !is_integral_real(y)) {
        return Err(unspecified("% by non-integral real"));
    }
    if is_zero(b) {
        return Err(VmError::divide_by_zero());
    }
    Ok(match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_rem(y)),
        (Num::Int(x), Num::UInt(y)) => Num::UInt((x as u64) % y),
        (Num::Int(x), Num::Real(y)) => Num::Int(x.wrapping_rem(y as i32)),
        (Num::UInt(x), Num::Int(y)) if y < 0 => wide_int(x, y as i64, |a, b| a % b),
        (Num::UInt(x), Num::Int(y)) => Num::UInt(x % y as u64),
        (Num::UInt(x), Num::UInt(y)) => Num::UInt(x % y),
        (Num::UInt(x), Num::Real(y)) if y > 0.0 => Num::UInt(x % y as u64),
        (Num::UInt(x), Num::Real(y)) => wide_int(x, y as i64, |a, b| a % b),
        (Num::Real(x), Num::Int(y)) => Num::Int((x as i32).wrapping_rem(y)),
        (Num::Real(x), Num::UInt(y)) => Num::UInt((x as u64) % y),
        (Num::Real(x), Num::Real(y)) => Num::Int((x as i32).wrapping_rem(y as i32)),
    })
}

fn idiv(a: Num, b: Num) -> Result<Num> {
    if matches!(b, Num::Real(y) if !is_integral_real(y)) {
        return Err(unspecified("div by non-integral real"));
    }
    if is_zero(b) {
        return Err(VmError::divide_by_zero());
    }
    Ok(match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_div(y)),
        (Num::Int(x), Num::UInt(y)) => Num::UInt((x as u64) / y),
        (Num::Int(x), Num::Real(y)) => Num::Int(x.wrapping_div(y as i32)),
        (Num::UInt(x), Num::Int(y)) if y < 0 => wide_int(x, y as i64, |a, b| a / b),
        (Num::UInt(x), Num::Int(y)) => Num::UInt(x / y as u64),
        (Num::UInt(x), Num::UInt(y)) => Num::UInt(x / y),
        (Num::UInt(x), Num::Real(y)) if y > 0.0 => Num::UInt(x / y as u64),
        (Num::UInt(x), Num::Real(y)) => wide_int(x, y as i64, |a, b| a / b),
        (Num::Real(x), Num::Int(y)) => Num::Int((x.floor() as i32).wrapping_div(y)),
        (Num::Real(x), Num::UInt(y)) => Num::UInt((x.floor() as u64) / y),
        (Num::Real(x), Num::Real(y)) => Num::Int((x.floor() as i32).wrapping_div(y as i32)),
    })
}

/// Shift amount from the right operand
fn shift_amount(b: Num, what: &str) -> Result<u32> {
    let amount = match b {
        Num::Int(y) => y as i64,
        Num::UInt(y) => return Ok(y.min(u32::MAX as u64) as u32),
        Num::Real(y) if is_integral_real(y) => y as i64,
        Num::Real(_) => return Err(unspecified(what)),
    };
    if amount < 0 {
        return Err(VmError::misc("negative shift"));
    }
    Ok(amount.min(u32::MAX as i64) as u32)
}

/// Left operand of a shift, promoted to the uint64 domain
fn shift_base(a: Num, what: &str) -> Result<u64> {
    match a {
        Num::Int(x) => Ok(x as u64),
        Num::UInt(x) => Ok(x),
        Num::Real(x) if is_integral_real(x) => Ok(x as i64 as u64),
        Num::Real(_) => Err(unspecified(what)),
    }
}

fn shift(a: Num, b: Num, left: bool) -> Result<Num> {
    let what = if left { "<< on real" } else { ">> on real" };
    let base = shift_base(a, what)?;
    let amount = shift_amount(b, what)?;
    let shifted = if left {
        base.checked_shl(amount)
    } else {
        base.checked_shr(amount)
    };
    Ok(Num::UInt(shifted.unwrap_or(0)))
}

#[derive(Clone, Copy)]
enum Bitwise {
    And,
    Or,
    Xor,
}

impl Bitwise {
    fn symbol(self) -> &'static str {
        match self {
            Bitwise::And => "&",
            Bitwise::Or => "|",
            Bitwise::Xor => "^",
        }
    }

    fn i32(self, a: i32, b: i32) -> i32 {
        match self {
            Bitwise::And => a & b,
            Bitwise::Or => a | b,
            Bitwise::Xor => a ^ b,
        }
    }

    fn u64(self, a: u64, b: u64) -> u64 {
        match self {
            Bitwise::And => a & b,
            Bitwise::Or => a | b,
            Bitwise::Xor => a ^ b,
        }
    }

    fn apply(self, a: Num, b: Num) -> Result<Num> {
        let non_integral = |side: &str| unspecified(&format!("{} with non-integral real {side}", self.symbol()));
        if matches!(a, Num::Real(x) if !is_integral_real(x)) {
            return Err(non_integral("lhs"));
        }
        if matches!(b, Num::Real(y) if !is_integral_real(y)) {
            return Err(non_integral("rhs"));
        }
        Ok(match (a, b) {
            (Num::Int(x), Num::Int(y)) => Num::Int(self.i32(x, y)),
            (Num::Int(x), Num::UInt(y)) => Num::UInt(self.u64(x as u64, y)),
            (Num::Int(x), Num::Real(y)) => Num::Int(self.i32(x, y as i32)),
            (Num::UInt(x), Num::Int(y)) if y < 0 => Num::Int(self.i32(x as i32, y)),
            (Num::UInt(x), Num::Int(y)) => Num::UInt(self.u64(x, y as u64)),
            (Num::UInt(x), Num::UInt(y)) => Num::UInt(self.u64(x, y)),
            (Num::UInt(x), Num::Real(y)) => Num::UInt(self.u64(x, y as i64 as u64)),
            (Num::Real(x), Num::Int(y)) => Num::Int(self.i32(x as i32, y)),
            (Num::Real(x), Num::UInt(y)) => Num::UInt(self.u64(x as i64 as u64, y)),
            (Num::Real(x), Num::Real(y)) => Num::Int(self.i32(x as i32, y as i32)),
        })
    }
}

impl Value {
    fn apply_numeric(&mut self, rhs: &Value, verb: &str, op: impl FnOnce(Num, Num) -> Result<Num>) -> Result<()> {
        let (a, b) = operands(self, rhs, verb)?;
        *self = Value::from_num(op(a, b)?);
        Ok(())
    }

    /// `self += rhs`; strings concatenate
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// let mut v = Value::Int32(3);
    /// v.add_assign(&Value::Int32(4)).unwrap();
    /// assert!(matches!(v, Value::Int32(7)));
    ///
    /// let mut s = Value::from("ab");
    /// s.add_assign(&Value::from("cd")).unwrap();
    /// assert_eq!(s.as_str(), Some("abcd"));
    /// ```
    pub fn add_assign(&mut self, rhs: &Value) -> Result<()> {
        if let (Value::String(a), Value::String(b)) = (&*self, rhs) {
            let joined = format!("{a}{b}");
            *self = Value::from(joined);
            return Ok(());
        }
        self.apply_numeric(rhs, "add", |a, b| Ok(add(a, b)))
    }

    /// `self -= rhs`
    pub fn sub_assign(&mut self, rhs: &Value) -> Result<()> {
        self.apply_numeric(rhs, "subtract", |a, b| Ok(sub(a, b)))
    }

    /// `self *= rhs`
    pub fn mul_assign(&mut self, rhs: &Value) -> Result<()> {
        self.apply_numeric(rhs, "multiply", |a, b| Ok(mul(a, b)))
    }

    /// `self /= rhs` in the real domain; a zero divisor yields `+inf`
    pub fn div_assign(&mut self, rhs: &Value) -> Result<()> {
        self.apply_numeric(rhs, "divide", |a, b| Ok(fdiv(a, b)))
    }

    /// `self %= rhs`
    ///
    /// # Errors
    ///
    /// `DivideByZero` for a zero divisor; `UnspecifiedLegacyBehavior` when a
    /// non-integral real is involved.
    pub fn rem_assign(&mut self, rhs: &Value) -> Result<()> {
        self.apply_numeric(rhs, "%", rem)
    }

    /// Integer division; a real left operand is floored first
    pub fn idiv_assign(&mut self, rhs: &Value) -> Result<()> {
        self.apply_numeric(rhs, "integer-divide", idiv)
    }

    /// `self <<= rhs` in the uint64 domain
    pub fn shl_assign(&mut self, rhs: &Value) -> Result<()> {
        self.apply_numeric(rhs, "<<", |a, b| shift(a, b, true))
    }

    /// `self >>= rhs` in the uint64 domain
    pub fn shr_assign(&mut self, rhs: &Value) -> Result<()> {
        self.apply_numeric(rhs, ">>", |a, b| shift(a, b, false))
    }

    /// `self &= rhs`
    pub fn bitand_assign(&mut self, rhs: &Value) -> Result<()> {
        self.apply_numeric(rhs, "&", |a, b| Bitwise::And.apply(a, b))
    }

    /// `self |= rhs`; an undefined left operand takes the right operand
    pub fn bitor_assign(&mut self, rhs: &Value) -> Result<()> {
        if self.is_undefined() {
            *self = rhs.clone();
            return Ok(());
        }
        self.apply_numeric(rhs, "|", |a, b| Bitwise::Or.apply(a, b))
    }

    /// `self ^= rhs`
    pub fn bitxor_assign(&mut self, rhs: &Value) -> Result<()> {
        self.apply_numeric(rhs, "^", |a, b| Bitwise::Xor.apply(a, b))
    }

    /// Bitwise complement in the uint64 domain
    pub fn invert(&mut self) -> Result<()> {
        let bits = match self {
            Value::Bool(b) => *b as u64,
            Value::Int32(i) => *i as u64,
            Value::UInt64(u) => *u,
            Value::Real(r) => *r as i64 as u64,
            _ => return Err(unspecified("~ on unexpected type")),
        };
        *self = Value::UInt64(!bits);
        Ok(())
    }
}
