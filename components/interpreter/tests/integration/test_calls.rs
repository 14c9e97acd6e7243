//! Call and return through the operand stack

use bytecode_system::Opcode;
use core_types::{ErrorKind, Value};
use interpreter::{BasicFrame, Vm, VmConfig};
use pretty_assertions::assert_eq;

use crate::common::{finish, section, vm, ARGUMENT, STACK_HEIGHT};

/// sub(a, b) = a - b
fn add_sub(vm: &mut Vm<BasicFrame>) -> u32 {
    vm.add_bytecode(section("sub", 1, Some(2), |a| {
        a.op_u32(Opcode::All, 0);
        a.ldi_s32(0).nat(ARGUMENT, 1);
        a.ldi_s32(1).nat(ARGUMENT, 1);
        a.op(Opcode::Sub2).ret(1);
    }))
}

#[test]
fn test_call_leaves_one_result_and_restores_locals() {
    let mut vm = vm();
    let sub = add_sub(&mut vm);
    let main = vm.add_bytecode(section("main", 4, Some(0), |a| {
        a.op_u32(Opcode::All, 1);
        a.ldi_s32(7).op_u32(Opcode::Stl, 0);
        a.nat(STACK_HEIGHT, 0);
        a.ldi_s32(10).ldi_s32(4).call(sub, 2);
        a.nat(STACK_HEIGHT, 0);
        a.op_u32(Opcode::Ldl, 0);
        a.ret(4);
    }));

    let out = finish(&mut vm, main, &[]).unwrap();
    let before: u64 = out[0].cast_exact().unwrap();
    let after: u64 = out[2].cast_exact().unwrap();
    assert_eq!(out[1], Value::Int32(6));
    // the first probe and the call result sit between the two probes
    assert_eq!(after, before + 2);
    assert_eq!(out[3], Value::Int32(7));
    assert!(vm.executor().stack.is_empty());
    assert_eq!(vm.executor().locals_start, 0);
    assert_eq!(vm.executor().depth(), 0);
}

#[test]
fn test_host_call_with_arguments() {
    let mut vm = vm();
    let sub = add_sub(&mut vm);
    let out = finish(&mut vm, sub, &[Value::Real(2.5), Value::Int32(1)]).unwrap();
    assert_eq!(out, vec![Value::Real(1.5)]);
}

#[test]
fn test_recursive_factorial() {
    let mut vm = vm();
    let fact = vm.bytecode().len() as u32;
    vm.add_bytecode(section("fact", 1, Some(1), |a| {
        let base = a.label();
        a.op_u32(Opcode::All, 1);
        a.ldi_s32(0).nat(ARGUMENT, 1).op_u32(Opcode::Stl, 0);
        a.op_u32(Opcode::Ldl, 0).ldi_s32(1).op(Opcode::Lte).bcond(base);
        a.op_u32(Opcode::Ldl, 0);
        a.op_u32(Opcode::Ldl, 0).op(Opcode::Dec).call(fact, 1);
        a.op(Opcode::Mult2).ret(1);
        a.bind(base);
        a.ldi_s32(1).ret(1);
    }));

    let out = finish(&mut vm, fact, &[Value::Int32(6)]).unwrap();
    assert_eq!(out, vec![Value::Int32(720)]);
}

#[test]
fn test_wrong_argument_count_from_bytecode() {
    let mut vm = vm();
    let sub = add_sub(&mut vm);
    let main = vm.add_bytecode(section("main", 1, Some(0), |a| {
        a.op_u32(Opcode::All, 0);
        a.ldi_s32(1).call(sub, 1);
        a.ret(1);
    }));

    let err = finish(&mut vm, main, &[]).unwrap_err();
    assert_eq!(err.error.message, "sub takes 2 arguments but was called with 1");
    assert_eq!(err.trace.len(), 1);
    assert_eq!(err.trace[0].section, "main");
}

#[test]
fn test_call_depth_limit() {
    let config = VmConfig {
        max_call_depth: 8,
        ..VmConfig::default()
    };
    let mut vm = Vm::with_config(BasicFrame::new(), config);
    let forever = vm.bytecode().len() as u32;
    vm.add_bytecode(section("forever", 0, Some(0), |a| {
        a.op_u32(Opcode::All, 0).call(forever, 0).ret(0);
    }));

    let err = finish(&mut vm, forever, &[]).unwrap_err();
    assert_eq!(err.error.message, "Maximum call depth exceeded");
    assert_eq!(err.trace.len(), 8);
    assert!(vm.executor().stack.is_empty());
    assert_eq!(vm.executor().depth(), 0);
}

#[test]
fn test_nested_error_trace() {
    let mut vm = vm();
    let inner = vm.add_bytecode(section("inner", 0, Some(0), |a| {
        a.op_u32(Opcode::All, 0);
        a.statement(12);
        a.ldi_string("a").ldi_s32(1).op(Opcode::Sub2);
        a.ret(0);
    }));
    let outer = vm.add_bytecode(section("outer", 0, Some(0), |a| {
        a.statement(3);
        a.op_u32(Opcode::All, 0).call(inner, 0).ret(0);
    }));

    let err = finish(&mut vm, outer, &[]).unwrap_err();
    assert_eq!(err.error.kind, ErrorKind::Type);
    let sections: Vec<&str> = err.trace.iter().map(|t| t.section.as_str()).collect();
    assert_eq!(sections, vec!["outer", "inner"]);
    assert_eq!(err.trace[0].line, Some(3));
    assert_eq!(err.trace[1].line, Some(12));

    let text = err.to_string();
    assert!(text.contains("\n  at inner: line 12, pc "));
    assert!(text.contains("\n  by outer: line 3, pc "));
}

#[test]
fn test_running_off_the_end() {
    let mut vm = vm();
    let main = vm.add_bytecode(section("main", 0, Some(0), |a| {
        a.op_u32(Opcode::All, 0).ldi_s32(0);
    }));
    let err = finish(&mut vm, main, &[]).unwrap_err();
    assert_eq!(err.error.kind, ErrorKind::Misc);
    assert!(err.error.message.starts_with("Unexpected end of bytecode"));
}

#[test]
fn test_vm_reusable_after_error() {
    let mut vm = vm();
    let bad = vm.add_bytecode(section("bad", 0, Some(0), |a| {
        a.op_u32(Opcode::All, 0).op(Opcode::Eof);
    }));
    let sub = add_sub(&mut vm);

    assert!(finish(&mut vm, bad, &[]).is_err());
    let out = finish(&mut vm, sub, &[Value::Int32(3), Value::Int32(1)]).unwrap();
    assert_eq!(out, vec![Value::Int32(2)]);
}
