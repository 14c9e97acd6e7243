//! Core runtime value types and error handling.
//!
//! This crate provides the value model manipulated by the virtual machine:
//! a tagged value, copy-on-write arrays coordinated with the garbage
//! collector, casting, comparison and arithmetic rules, and a persistence
//! codec.
//!
//! # Overview
//!
//! - [`Value`] - Tagged runtime value
//! - [`ArrayHandle`] / [`ArrayData`] - Copy-on-write 2-D arrays
//! - [`FromValue`] - Exact and coercing casts into host types
//! - [`VmError`] / [`ErrorKind`] - Runtime errors
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, Value};
//!
//! let mut v = Value::Int32(3);
//! v.add_assign(&Value::Real(0.5)).unwrap();
//! assert_eq!(v.to_string(), "3.50");
//!
//! let err = Value::Int32(5).rem_assign(&Value::Int32(0)).unwrap_err();
//! assert_eq!(err.kind, ErrorKind::DivideByZero);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod arithmetic;
mod array;
mod cast;
mod compare;
mod error;
mod serialize;
mod value;

pub use array::{ArrayData, ArrayHandle};
pub use cast::FromValue;
pub use error::{ErrorKind, Result, VmError};
pub use serialize::{ARRAY_CLOSE_CANARY, ARRAY_OPEN_CANARY, MAX_ARRAY_NESTING};
pub use value::{Pointer, Value, ValueKind};
