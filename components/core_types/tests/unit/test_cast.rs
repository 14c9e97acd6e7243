//! Property tests for exact and coercing casts

use core_types::{ErrorKind, Value};
use proptest::prelude::*;

proptest! {
    /// Every i32 round-trips through a real and back exactly
    #[test]
    fn test_int_real_int_exact(i in any::<i32>()) {
        let real: f64 = Value::Int32(i).cast_exact().unwrap();
        prop_assert_eq!(Value::Real(real).cast_exact::<i32>().unwrap(), i);
    }

    /// A real converts exactly to i32 iff it is integral and in range
    #[test]
    fn test_real_to_int_exactness(r in -3.0e9f64..3.0e9) {
        let fits = r.fract() == 0.0 && r >= i32::MIN as f64 && r <= i32::MAX as f64;
        match Value::Real(r).cast_exact::<i32>() {
            Ok(i) => {
                prop_assert!(fits);
                prop_assert_eq!(i as f64, r);
            }
            Err(err) => {
                prop_assert!(!fits);
                prop_assert_eq!(err.kind, ErrorKind::TypeCast);
            }
        }
    }

    /// uint64 converts exactly to real iff it survives the round trip
    #[test]
    fn test_u64_to_real_exactness(u in any::<u64>()) {
        let fits = (u as f64) as u128 == u as u128;
        prop_assert_eq!(Value::UInt64(u).cast_exact::<f64>().is_ok(), fits);
    }

    /// Negative ints never convert exactly to unsigned targets
    #[test]
    fn test_negative_int_to_unsigned(i in i32::MIN..0) {
        prop_assert!(Value::Int32(i).cast_exact::<u64>().is_err());
        prop_assert!(Value::Int32(i).cast_exact::<usize>().is_err());
        prop_assert!(Value::Int32(i).cast_exact::<i64>().is_ok());
    }

    /// Coercion to int truncates toward zero
    #[test]
    fn test_coerce_truncates(r in -1.0e6f64..1.0e6) {
        prop_assert_eq!(Value::Real(r).cast_coerce::<i32>().unwrap(), r.trunc() as i32);
    }
}

#[test]
fn test_string_and_pointer_only_from_same_kind() {
    assert_eq!(Value::from("a").cast_exact::<String>().unwrap(), "a");
    assert!(Value::Int32(1).cast_exact::<String>().is_err());
    assert!(Value::from("a").cast_coerce::<core_types::Pointer>().is_err());
}
