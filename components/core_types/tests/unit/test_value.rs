//! Unit tests for the Value enum

use core_types::{ErrorKind, Pointer, Value, ValueKind};

#[cfg(test)]
mod value_creation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(true).kind(), ValueKind::Bool);
        assert_eq!(Value::from(1i32).kind(), ValueKind::Int32);
        assert_eq!(Value::from(1u64).kind(), ValueKind::UInt64);
        assert_eq!(Value::from(1.5).kind(), ValueKind::Real);
        assert_eq!(Value::from("s").kind(), ValueKind::String);
        assert_eq!(Value::from(String::from("s")).kind(), ValueKind::String);
        assert_eq!(Value::from(Pointer(3)).kind(), ValueKind::Pointer);
    }

    #[test]
    fn test_clone_shares_string() {
        let a = Value::from("shared");
        let b = a.clone();
        match (&a, &b) {
            (Value::String(x), Value::String(y)) => assert!(std::rc::Rc::ptr_eq(x, y)),
            _ => panic!("expected strings"),
        }
    }
}

#[cfg(test)]
mod value_cond_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_real_threshold_is_one_half() {
        assert!(Value::Real(0.5).cond().unwrap());
        assert!(Value::Real(100.0).cond().unwrap());
        assert!(!Value::Real(0.499_999).cond().unwrap());
        assert!(!Value::Real(-3.0).cond().unwrap());
    }

    #[test]
    fn test_non_numeric_cond() {
        let array = Value::array(vec![], None);
        assert_eq!(array.cond().unwrap_err().kind, ErrorKind::UnspecifiedLegacyBehavior);
        assert_eq!(
            Value::Pointer(Pointer(0)).cond().unwrap_err().message,
            "cond(): pointer"
        );
        assert_eq!(
            Value::Undefined.cond().unwrap_err().message,
            "Condition on undefined variable."
        );
    }
}

#[cfg(test)]
mod value_display_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_matrix() {
        let v = Value::array(
            vec![
                vec![Value::Int32(1), Value::Real(2.0)],
                vec![Value::from("s"), Value::Bool(false), Value::UInt64(5)],
            ],
            None,
        );
        assert_eq!(v.to_string(), "[[1, 2.00], [\"s\", False, 5L]]");
    }

    #[test]
    fn test_display_null_array() {
        let mut v = Value::Undefined;
        v.array_ensure(None, None);
        assert_eq!(v.to_string(), "[]");
    }
}
