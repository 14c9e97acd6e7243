//! Unit tests for value arithmetic and comparison

use core_types::{ErrorKind, Value};
use proptest::prelude::*;

fn add(a: Value, b: Value) -> Value {
    let mut a = a;
    a.add_assign(&b).unwrap();
    a
}

#[test]
fn test_add_pairs() {
    assert!(matches!(add(Value::Int32(3), Value::Int32(4)), Value::Int32(7)));
    assert!(matches!(add(Value::Bool(true), Value::Int32(1)), Value::Int32(2)));
    assert!(matches!(add(Value::UInt64(1), Value::Real(-1.0)), Value::UInt64(0)));
    assert!(matches!(add(Value::UInt64(0), Value::Real(-1.0)), Value::Real(r) if r == -1.0));
    assert!(matches!(add(Value::Real(-2.0), Value::UInt64(3)), Value::Int32(1)));
    assert!(matches!(add(Value::Real(1.5), Value::Real(1.5)), Value::Real(r) if r == 3.0));
}

#[test]
fn test_string_concat_only_with_strings() {
    let mut s = Value::from("a");
    assert_eq!(s.add_assign(&Value::Int32(1)).unwrap_err().kind, ErrorKind::Type);
    s.add_assign(&Value::from("b")).unwrap();
    assert_eq!(s, Value::from("ab"));
}

#[test]
fn test_real_division_by_zero() {
    let mut v = Value::Real(1.0);
    v.div_assign(&Value::Real(0.0)).unwrap();
    assert_eq!(v, Value::Real(f64::INFINITY));
}

#[test]
fn test_integer_modulo_by_zero() {
    let mut v = Value::Int32(5);
    assert_eq!(v.rem_assign(&Value::Int32(0)).unwrap_err().kind, ErrorKind::DivideByZero);
}

#[test]
fn test_real_modulo_fraction() {
    let mut v = Value::Real(2.5);
    let err = v.rem_assign(&Value::Real(1.0)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnspecifiedLegacyBehavior);
}

#[test]
fn test_mul_negative_int_with_uint() {
    let mut v = Value::UInt64(3);
    v.mul_assign(&Value::Int32(-2)).unwrap();
    assert!(matches!(v, Value::Int32(-6)));
}

proptest! {
    /// Integral reals stay in the integer domain when added to ints
    #[test]
    fn test_integral_real_keeps_int(a in -10_000i32..10_000, b in -10_000i32..10_000) {
        let v = add(Value::Int32(a), Value::Real(b as f64));
        prop_assert!(matches!(v, Value::Int32(n) if n == a + b));
    }

    /// Numeric equality agrees with ordering
    #[test]
    fn test_eq_consistent_with_order(a in any::<i32>(), b in -1.0e10f64..1.0e10) {
        let (x, y) = (Value::Int32(a), Value::Real(b));
        let eq = x == y;
        prop_assert_eq!(eq, x.le(&y).unwrap() && x.ge(&y).unwrap());
    }
}
