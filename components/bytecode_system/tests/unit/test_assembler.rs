//! Tests for Assembler

use bytecode_system::{Assembler, BytecodeStream, Immediate, Instruction, Opcode};
use core_types::Value;
use proptest::prelude::*;

#[test]
fn test_loop_shape() {
    // for (i = 0; i < 3; ++i) {}
    let mut asm = Assembler::new();
    asm.op_u32(Opcode::All, 1);
    asm.ldi_s32(0).op_u32(Opcode::Stl, 0);
    let top = asm.here();
    let end = asm.label();
    asm.op_u32(Opcode::Ldl, 0).ldi_s32(3).op(Opcode::Gte).bcond(end);
    asm.op_u32(Opcode::Incl, 0).jmp(top);
    asm.bind(end);
    asm.ret(0);
    let bc = asm.finish(0, Some(0)).unwrap();

    let listing = Instruction::decode_all(BytecodeStream::new(bc)).unwrap();
    let bcond = listing.iter().find(|i| i.opcode == Opcode::Bcond).unwrap();
    let ret = listing.last().unwrap();
    assert_eq!(bcond.immediates, vec![Immediate::Address(ret.address as i32)]);

    let jmp = listing.iter().find(|i| i.opcode == Opcode::Jmp).unwrap();
    let ldl = listing.iter().find(|i| i.opcode == Opcode::Ldl).unwrap();
    assert_eq!(jmp.immediates, vec![Immediate::Address(ldl.address as i32)]);
}

#[test]
fn test_nested_accessor_operands() {
    let mut asm = Assembler::new();
    asm.op_nested(Opcode::Stlax, 2, 1);
    let bc = asm.finish(0, Some(0)).unwrap();
    let all = Instruction::decode_all(BytecodeStream::new(bc)).unwrap();
    assert_eq!(all[0].immediates, vec![Immediate::U32(2), Immediate::U32(1)]);
}

#[test]
fn test_position_tracks_encoding() {
    let mut asm = Assembler::new();
    assert_eq!(asm.position(), 0);
    asm.ldi_u64(1);
    assert_eq!(asm.position(), 9);
    asm.ldi_f32(1.0);
    assert_eq!(asm.position(), 14);
    asm.nat(0, 2);
    assert_eq!(asm.position(), 20);
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int32),
        any::<u64>().prop_map(Value::UInt64),
        any::<f64>()
            .prop_filter("NaN never equals itself", |r| !r.is_nan())
            .prop_map(Value::Real),
        "[a-z ]{0,12}".prop_map(Value::from),
    ]
}

proptest! {
    #[test]
    fn prop_ldi_encodes_decodable_constant(values in prop::collection::vec(scalar(), 1..8)) {
        let mut asm = Assembler::new();
        for v in &values {
            asm.ldi(v);
        }
        let bc = asm.finish(0, Some(0)).unwrap();
        let decoded = Instruction::decode_all(BytecodeStream::new(bc)).unwrap();
        prop_assert_eq!(decoded.len(), values.len());

        for (instruction, value) in decoded.iter().zip(&values) {
            let back = match (&instruction.opcode, instruction.immediates.as_slice()) {
                (Opcode::LdiUndef, []) => Value::Undefined,
                (Opcode::LdiTrue, []) => Value::Bool(true),
                (Opcode::LdiFalse, []) => Value::Bool(false),
                (Opcode::LdiS32, [Immediate::I32(i)]) => Value::Int32(*i),
                (Opcode::LdiU64, [Immediate::U64(u)]) => Value::UInt64(*u),
                (Opcode::LdiF64, [Immediate::F64(r)]) => Value::Real(*r),
                (Opcode::LdiString, [Immediate::Str(s)]) => Value::from(s.as_str()),
                other => panic!("unexpected instruction {other:?}"),
            };
            prop_assert_eq!(back.kind(), value.kind());
            prop_assert_eq!(&back, value);
        }
    }
}
