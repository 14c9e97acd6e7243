//! Integration tests for the interpreter
//! Whole programs assembled and run through the public VM API

mod test_calls;
mod test_with;
