//! Tests for BytecodeStream

use bytecode_system::{Bytecode, BytecodeError, BytecodeStream, Opcode};
use proptest::prelude::*;

fn stream(code: Vec<u8>) -> BytecodeStream {
    BytecodeStream::new(Bytecode::new(code, 0, Some(0)))
}

#[test]
fn test_read_opcode_reports_address() {
    let mut s = stream(vec![Opcode::Nop as u8, 0xfe]);
    assert_eq!(s.read_opcode().unwrap(), Opcode::Nop);
    assert_eq!(
        s.read_opcode(),
        Err(BytecodeError::UnknownOpcode {
            byte: 0xfe,
            address: Some(1)
        })
    );
}

#[test]
fn test_floats_are_native_endian() {
    let mut code = 1.5f64.to_ne_bytes().to_vec();
    code.extend_from_slice(&0.25f32.to_ne_bytes());
    let mut s = stream(code);
    assert_eq!(s.read_f64().unwrap(), 1.5);
    assert_eq!(s.read_f32().unwrap(), 0.25);
}

#[test]
fn test_invalid_utf8_string() {
    let mut s = stream(vec![0xc3, 0x28, 0]);
    assert_eq!(
        s.read_string(),
        Err(BytecodeError::InvalidString { address: 0 })
    );
}

#[test]
fn test_seek_then_read() {
    let mut s = stream(vec![1, 2, 3, 4, 5]);
    s.seek(3).unwrap();
    assert_eq!(s.read_u8().unwrap(), 4);
    assert_eq!(s.position(), 4);
}

proptest! {
    #[test]
    fn prop_integers_read_back(a in any::<u32>(), b in any::<i32>(), c in any::<u64>()) {
        let mut code = a.to_le_bytes().to_vec();
        code.extend_from_slice(&b.to_le_bytes());
        code.extend_from_slice(&c.to_le_bytes());
        let mut s = stream(code);
        prop_assert_eq!(s.read_u32().unwrap(), a);
        prop_assert_eq!(s.read_i32().unwrap(), b);
        prop_assert_eq!(s.read_u64().unwrap(), c);
        prop_assert!(s.at_end());
    }
}
