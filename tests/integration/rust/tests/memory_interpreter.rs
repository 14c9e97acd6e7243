//! Memory Manager and Interpreter Integration Tests
//!
//! Arrays created by bytecode are tracked by the collector: edges follow
//! ownership, writes copy shared storage and the heap stays consistent.

use bytecode_system::{Assembler, Bytecode, Opcode};
use core_types::Value;
use interpreter::{BasicFrame, Execution, Frame, Instance, Vm, VmConfig, GLOBAL};
use pretty_assertions::assert_eq;

fn section(name: &str, retc: u8, build: impl FnOnce(&mut Assembler)) -> Bytecode {
    let mut asm = Assembler::named(name);
    build(&mut asm);
    asm.finish(retc, Some(0)).unwrap()
}

fn run(vm: &mut Vm<BasicFrame>, index: u32) -> Vec<Value> {
    match vm.call_bytecode(index, &[]).unwrap() {
        Execution::Finished(values) => values,
        Execution::Suspended => panic!("unexpected suspension"),
    }
}

/// Test: storing past the end of a row zero-fills the gap
#[test]
fn test_store_beyond_end_grows_row() {
    let mut vm = Vm::new(BasicFrame::new());
    let main = vm.add_bytecode(section("main", 1, |a| {
        a.op_u32(Opcode::All, 1);
        a.ldi_s32(0).ldi_s32(5).ldi_string("x").op_u32(Opcode::Stla, 0);
        a.op_u32(Opcode::Ldl, 0);
        a.ret(1);
    }));

    let out = run(&mut vm, main);
    let array = &out[0];
    assert_eq!(array.array_height().unwrap(), 1);
    assert_eq!(array.array_length(0).unwrap(), 6);
    for col in 0..5 {
        assert_eq!(array.array_at(0, col).unwrap(), Value::Real(0.0));
    }
    assert_eq!(array.array_at(0, 5).unwrap(), Value::from("x"));
    assert!(array.array_at(0, 6).is_err());
}

/// Test: a global and a field sharing one array diverge on write
#[test]
fn test_shared_array_copied_on_write() {
    let mut vm = Vm::new(BasicFrame::new());
    let me = vm.frame_mut().create_instance(0);
    vm.executor_mut().self_id = Some(me);

    // global0[0,0] = 1; self.0 = global0; self.0[0,1] = 2
    let main = vm.add_bytecode(section("main", 0, |a| {
        a.op_u32(Opcode::All, 0);
        a.ldi_s32(0).ldi_s32(0).ldi_s32(1).op_u32(Opcode::Stga, 0);
        a.op_u32(Opcode::Ldg, 0).op_u32(Opcode::Sts, 0);
        a.ldi_s32(0).ldi_s32(1).ldi_s32(2).op_u32(Opcode::Stsa, 0);
        a.ret(0);
    }));
    run(&mut vm, main);

    let global = vm.frame_mut().global(0).clone();
    let field = vm.frame().get(me).unwrap().find_variable(0).unwrap().clone();
    assert_eq!(global.to_string(), "[[1]]");
    assert_eq!(field.to_string(), "[[1, 2]]");
    assert_ne!(global.array_node(), field.array_node());

    assert_eq!(vm.collect_garbage(), 0);
    assert_eq!(vm.gc().unwrap().node_count(), 2);
    assert!(vm.integrity_check().is_ok());
}

/// Test: nested arrays hang off their parent and die with it
#[test]
fn test_nested_arrays_follow_parent() {
    let mut vm = Vm::new(BasicFrame::new());
    // global0[1,0][2,2] = "deep"
    let build = vm.add_bytecode(section("build", 1, |a| {
        a.op_u32(Opcode::All, 0);
        a.ldi_s32(2).ldi_s32(2).ldi_s32(1).ldi_s32(0);
        a.ldi_s32(GLOBAL as i32).ldi_string("deep");
        a.op_nested(Opcode::Stoax, 0, 1);
        a.ldi_s32(2).ldi_s32(2).ldi_s32(1).ldi_s32(0);
        a.ldi_s32(GLOBAL as i32).op_nested(Opcode::Ldoax, 0, 1);
        a.ret(1);
    }));
    let clear = vm.add_bytecode(section("clear", 0, |a| {
        a.op_u32(Opcode::All, 0).ldi_s32(0).op_u32(Opcode::Stg, 0).ret(0);
    }));

    assert_eq!(run(&mut vm, build), vec![Value::from("deep")]);
    let outer = vm.frame_mut().global(0).clone();
    let inner = outer.array_at(1, 0).unwrap();
    let (outer_node, inner_node) = (outer.array_node().unwrap(), inner.array_node().unwrap());
    drop((outer, inner));

    let gc = vm.gc().unwrap();
    assert!(gc.is_root(outer_node));
    assert!(!gc.is_root(inner_node));
    assert_eq!(gc.reference_count(outer_node, inner_node), 1);
    assert_eq!(vm.collect_garbage(), 0);

    run(&mut vm, clear);
    assert_eq!(vm.collect_garbage(), 2);
    assert_eq!(vm.gc().unwrap().node_count(), 0);
    assert!(vm.integrity_check().is_ok());
}

/// Test: destroyed instances release their arrays once cleaned up
#[test]
fn test_instance_cleanup_frees_field_arrays() {
    let mut vm = Vm::new(BasicFrame::new());
    let doomed = vm.frame_mut().create_instance(0);
    let keeper = vm.frame_mut().create_instance(1);
    vm.executor_mut().self_id = Some(doomed);

    let fill = vm.add_bytecode(section("fill", 0, |a| {
        a.op_u32(Opcode::All, 0);
        a.ldi_s32(0).ldi_s32(0).ldi_s32(7).op_u32(Opcode::Stsa, 0);
        a.ret(0);
    }));
    run(&mut vm, fill);
    vm.executor_mut().self_id = Some(keeper);
    run(&mut vm, fill);
    assert_eq!(vm.gc().unwrap().node_count(), 2);

    vm.frame_mut().destroy_instance(doomed);
    assert_eq!(vm.collect_garbage(), 0);

    let (frame, gc) = vm.frame_and_gc_mut();
    frame.cleanup(gc);
    assert!(vm.frame().get(doomed).is_none());
    assert_eq!(vm.collect_garbage(), 1);

    let kept = vm.frame().get(keeper).unwrap().find_variable(0).unwrap();
    assert_eq!(kept.array_at(0, 0).unwrap(), Value::Int32(7));
    assert!(vm.integrity_check().is_ok());
}

/// Test: with collection disabled arrays work without a collector
#[test]
fn test_arrays_without_collector() {
    let config = VmConfig {
        garbage_collection: false,
        ..VmConfig::default()
    };
    let mut vm = Vm::with_config(BasicFrame::new(), config);
    let main = vm.add_bytecode(section("main", 1, |a| {
        a.op_u32(Opcode::All, 0);
        a.ldi_s32(1).ldi_s32(1).ldi_f64(0.25).op_u32(Opcode::Stga, 3);
        a.ldi_s32(1).ldi_s32(1).op_u32(Opcode::Ldga, 3);
        a.ret(1);
    }));

    assert_eq!(run(&mut vm, main), vec![Value::Real(0.25)]);
    assert!(vm.gc().is_none());
    assert_eq!(vm.frame_mut().global(3).array_node(), None);
    assert_eq!(vm.collect_garbage(), 0);
    assert!(vm.integrity_check().is_ok());
}
