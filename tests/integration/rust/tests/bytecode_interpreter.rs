//! Bytecode System and Interpreter Integration Tests
//!
//! Programs assembled with `bytecode_system` and executed by the
//! interpreter, checking the calling convention and control flow end to end.

use std::cell::Cell;
use std::rc::Rc;

use bytecode_system::{Assembler, Bytecode, Opcode};
use core_types::{Result, Value};
use integration_tests::{argument, locals_start, stack_height};
use interpreter::{BasicFrame, Debugger, Execution, Frame, Instance, InstanceId, NativeFn, Vm};
use pretty_assertions::assert_eq;

fn section(name: &str, retc: u8, argc: Option<u8>, build: impl FnOnce(&mut Assembler)) -> Bytecode {
    let mut asm = Assembler::named(name);
    build(&mut asm);
    asm.finish(retc, argc).unwrap()
}

fn finished(execution: Execution) -> Vec<Value> {
    match execution {
        Execution::Finished(values) => values,
        Execution::Suspended => panic!("unexpected suspension"),
    }
}

fn probe_vm() -> (Vm<BasicFrame>, u32, u32, u32) {
    let mut vm = Vm::new(BasicFrame::new());
    let height = vm.register_native("stack_height", NativeFn::Arity0(stack_height));
    let base = vm.register_native("locals_start", NativeFn::Arity0(locals_start));
    let arg = vm.register_native("argument", NativeFn::Arity1(argument));
    (vm, height, base, arg)
}

/// Test: a two-argument call leaves exactly one value and restores the
/// caller's locals base
#[test]
fn test_call_return_stack_discipline() {
    let (mut vm, height, base, arg) = probe_vm();
    let mul = vm.add_bytecode(section("mul", 1, Some(2), |a| {
        a.op_u32(Opcode::All, 2);
        a.ldi_s32(0).nat(arg, 1);
        a.ldi_s32(1).nat(arg, 1);
        a.op(Opcode::Mult2).ret(1);
    }));
    let main = vm.add_bytecode(section("main", 5, Some(0), |a| {
        a.op_u32(Opcode::All, 3);
        a.nat(base, 0).op_u32(Opcode::Stl, 0);
        a.nat(height, 0).op_u32(Opcode::Stl, 1);
        a.ldi_s32(6).ldi_s32(7).call(mul, 2);
        a.nat(height, 0);
        a.nat(base, 0);
        a.op_u32(Opcode::Ldl, 0).op_u32(Opcode::Ldl, 1);
        a.ret(5);
    }));

    let out = finished(vm.call_bytecode(main, &[]).unwrap());
    let [result, height_after, base_after, base_before, height_before] = out.as_slice() else {
        panic!("expected five results");
    };
    assert_eq!(*result, Value::Int32(42));
    let (before, after): (u64, u64) = (height_before.cast_exact().unwrap(), height_after.cast_exact().unwrap());
    assert_eq!(after, before + 1);
    assert_eq!(base_after, base_before);
}

/// Test: with-iteration over {A, B, C} visits each once even when one is
/// destroyed mid-loop, then restores self and sets the condition flag
#[test]
fn test_with_iteration_snapshot() {
    fn destroy(vm: &mut Vm<BasicFrame>, id: &Value) -> Result<()> {
        let id = InstanceId(id.cast_exact::<u64>()? as u32);
        vm.frame_mut().destroy_instance(id);
        Ok(())
    }

    let mut vm = Vm::new(BasicFrame::new());
    let owner = vm.frame_mut().create_instance(1);
    let set: Vec<_> = (0..3).map(|_| vm.frame_mut().create_instance(2)).collect();
    vm.executor_mut().self_id = Some(owner);
    let destroy = vm.register_native("destroy", NativeFn::Void1(destroy));
    let last = set[2].0 as i32;

    // each visit adds self to global 0 and counts in local 0; the first
    // visit destroys the last instance before the loop reaches it
    let main = vm.add_bytecode(section("main", 3, Some(0), |a| {
        let (top, done) = (a.label(), a.label());
        a.op_u32(Opcode::All, 1);
        a.ldi_s32(0).op_u32(Opcode::Stl, 0);
        a.ldi_s32(0).op_u32(Opcode::Stg, 0);
        a.ldi_s32(2).op(Opcode::Wti);
        a.bind(top);
        a.op(Opcode::Wty).bcond(done);
        a.op_u32(Opcode::Incl, 0);
        a.ldi_s32(last).nat(destroy, interpreter::VOID_UNARY);
        a.op_u32(Opcode::Ldg, 0).op(Opcode::LdiSelf).op(Opcode::Add2).op_u32(Opcode::Stg, 0);
        a.ldi_s32(1).op_u32(Opcode::Sts, 3);
        a.jmp(top);
        a.bind(done);
        a.op(Opcode::Pcond);
        a.op_u32(Opcode::Ldl, 0);
        a.op(Opcode::LdiSelf);
        a.ret(3);
    }));

    let out = finished(vm.call_bytecode(main, &[]).unwrap());
    assert_eq!(out[0], Value::Bool(true));
    assert_eq!(out[1], Value::Int32(3));
    assert_eq!(out[2], Value::Real(owner.0 as f64));

    let expected: u32 = set.iter().map(|id| id.0).sum();
    let total: f64 = vm.frame_mut().global(0).cast_exact().unwrap();
    assert_eq!(total, expected as f64);
    assert!(!vm.frame().get(set[2]).unwrap().is_active());
    for id in &set {
        assert_eq!(vm.frame().get(*id).unwrap().find_variable(3), Some(&Value::Int32(1)));
    }
    assert_eq!(vm.executor().self_id, Some(owner));
}

/// Test: a suspended call keeps its locals and resumes where it stopped
#[test]
fn test_suspend_resume_round_trip() {
    let mut vm = Vm::new(BasicFrame::new());
    let main = vm.add_bytecode(section("main", 1, Some(1), |a| {
        a.op_u32(Opcode::All, 1);
        a.ldi_s32(10).op_u32(Opcode::Stl, 0);
        a.op(Opcode::Sus);
        a.op_u32(Opcode::Ldl, 0).ldi_s32(5).op(Opcode::Add2);
        a.ret(1);
    }));

    assert_eq!(
        vm.call_bytecode(main, &[Value::from("ignored")]).unwrap(),
        Execution::Suspended
    );
    assert_eq!(vm.executor().depth(), 1);
    let out = finished(vm.resume().unwrap());
    assert_eq!(out, vec![Value::Int32(15)]);
    assert_eq!(vm.executor().depth(), 0);
}

/// Counts pauses caused by errors
struct PauseOnError {
    pauses: Rc<Cell<usize>>,
    armed: bool,
}

impl Debugger<BasicFrame> for PauseOnError {
    fn tick(&mut self, vm: &mut Vm<BasicFrame>) -> Result<()> {
        if self.armed {
            self.armed = false;
            self.pauses.set(self.pauses.get() + 1);
            // the failing frame is still inspectable while paused
            assert_eq!(vm.executor().pc.bytecode().display_name(), "inner");
        }
        Ok(())
    }

    fn break_execution(&mut self) {
        self.armed = true;
    }
}

/// Test: an error raised two calls deep pauses the debugger once, then
/// unwinds to the host with the full trace
#[test]
fn test_error_pauses_debugger_once() {
    let mut vm = Vm::new(BasicFrame::new());
    let inner = vm.add_bytecode(section("inner", 0, Some(0), |a| {
        a.op_u32(Opcode::All, 0);
        a.ldi_s32(1).ldi_s32(0).op(Opcode::Idiv2);
        a.ret(0);
    }));
    let middle = vm.add_bytecode(section("middle", 0, Some(0), |a| {
        a.op_u32(Opcode::All, 0).call(inner, 0).ret(0);
    }));
    let outer = vm.add_bytecode(section("outer", 0, Some(0), |a| {
        a.op_u32(Opcode::All, 0).call(middle, 0).ret(0);
    }));

    let pauses = Rc::new(Cell::new(0));
    vm.debugger_attach(Box::new(PauseOnError {
        pauses: pauses.clone(),
        armed: false,
    }));

    let err = vm.call_bytecode(outer, &[]).unwrap_err();
    assert_eq!(err.error.kind, core_types::ErrorKind::DivideByZero);
    let sections: Vec<&str> = err.trace.iter().map(|t| t.section.as_str()).collect();
    assert_eq!(sections, vec!["outer", "middle", "inner"]);
    assert_eq!(pauses.get(), 1);
    assert_eq!(vm.executor().depth(), 0);
}
