//! With-iteration over instance sets

use bytecode_system::{Assembler, Opcode};
use core_types::{Result, Value};
use interpreter::{BasicFrame, Frame, Instance, InstanceId, NativeFn, Vm, NOONE};
use pretty_assertions::assert_eq;

use crate::common::{finish, section, vm};

/// Loop over object `object`, counting visits in local 0 and running `body`
/// for each instance
fn with_loop(a: &mut Assembler, object: i32, body: impl FnOnce(&mut Assembler)) {
    let top = a.label();
    let done = a.label();
    a.op_u32(Opcode::All, 1);
    a.ldi_s32(0).op_u32(Opcode::Stl, 0);
    a.ldi_s32(object).op(Opcode::Wti);
    a.bind(top);
    a.op(Opcode::Wty).bcond(done);
    a.op_u32(Opcode::Incl, 0);
    body(a);
    a.jmp(top);
    a.bind(done);
    a.op_u32(Opcode::Ldl, 0);
}

fn destroy_last(vm: &mut Vm<BasicFrame>) -> Result<Value> {
    let last = vm.frame().all_instances().last().copied();
    if let Some(id) = last {
        vm.frame_mut().destroy_instance(id);
    }
    Ok(Value::Undefined)
}

#[test]
fn test_visits_each_instance_of_object() {
    let mut vm = vm();
    let ids: Vec<InstanceId> = (0..3).map(|_| vm.frame_mut().create_instance(0)).collect();
    let stranger = vm.frame_mut().create_instance(1);

    let main = vm.add_bytecode(section("main", 1, Some(0), |a| {
        with_loop(a, 0, |a| {
            a.op(Opcode::LdiSelf).op_u32(Opcode::Sts, 4);
        });
        a.ret(1);
    }));

    let out = finish(&mut vm, main, &[]).unwrap();
    assert_eq!(out, vec![Value::Int32(3)]);
    for id in ids {
        let seen = vm.frame().get(id).unwrap().find_variable(4);
        assert_eq!(seen, Some(&Value::Real(id.0 as f64)));
    }
    assert_eq!(vm.frame().get(stranger).unwrap().find_variable(4), None);
    assert_eq!(vm.executor().self_id, None);
    assert!(vm.executor().with_iterators.is_empty());
}

#[test]
fn test_destroyed_instances_still_visited() {
    let mut vm = vm();
    let ids: Vec<InstanceId> = (0..3).map(|_| vm.frame_mut().create_instance(0)).collect();
    let destroy = vm.register_native("destroy_last", NativeFn::Arity0(destroy_last));

    let main = vm.add_bytecode(section("main", 1, Some(0), |a| {
        with_loop(a, 0, |a| {
            a.nat(destroy, 0).op(Opcode::Pop);
            a.ldi_s32(1).op_u32(Opcode::Sts, 0);
        });
        a.ret(1);
    }));

    let out = finish(&mut vm, main, &[]).unwrap();
    // the set is fixed on entry
    assert_eq!(out, vec![Value::Int32(3)]);
    assert!(ids
        .iter()
        .all(|id| vm.frame().get(*id).unwrap().find_variable(0) == Some(&Value::Int32(1))));
    assert!(vm.frame().all_instances().is_empty());

    vm.frame_mut().cleanup(None);
    assert!(vm.frame().is_empty());
}

#[test]
fn test_self_and_other_inside_with() {
    let mut vm = vm();
    let outer = vm.frame_mut().create_instance(7);
    let inner = vm.frame_mut().create_instance(8);
    vm.executor_mut().self_id = Some(outer);

    let main = vm.add_bytecode(section("main", 4, Some(0), |a| {
        a.op_u32(Opcode::All, 2);
        a.ldi_s32(inner.0 as i32).op(Opcode::Wti);
        a.op(Opcode::Wty);
        a.op(Opcode::LdiSelf).op_u32(Opcode::Stl, 0);
        a.op(Opcode::LdiOther).op_u32(Opcode::Stl, 1);
        // still inside the block: stop early
        a.op(Opcode::Wtd);
        a.op_u32(Opcode::Ldl, 0).op_u32(Opcode::Ldl, 1);
        a.op(Opcode::LdiSelf).op(Opcode::LdiOther);
        a.ret(4);
    }));

    let out = finish(&mut vm, main, &[]).unwrap();
    let ids: Vec<f64> = out.iter().map(|v| v.cast_exact().unwrap()).collect();
    assert_eq!(
        ids,
        vec![inner.0 as f64, outer.0 as f64, outer.0 as f64, NOONE as f64]
    );
    assert!(vm.executor().with_iterators.is_empty());
}

#[test]
fn test_with_over_noone_and_global_is_empty() {
    for owner in [interpreter::NOONE, interpreter::GLOBAL] {
        let mut vm = vm();
        vm.frame_mut().create_instance(0);
        let main = vm.add_bytecode(section("main", 1, Some(0), |a| {
            with_loop(a, owner as i32, |_| {});
            a.ret(1);
        }));
        assert_eq!(finish(&mut vm, main, &[]).unwrap(), vec![Value::Int32(0)]);
    }
}

#[test]
fn test_nested_with_blocks() {
    let mut vm = vm();
    for _ in 0..2 {
        vm.frame_mut().create_instance(0);
    }
    for _ in 0..3 {
        vm.frame_mut().create_instance(1);
    }

    // count pairs in global 0
    let main = vm.add_bytecode(section("main", 1, Some(0), |a| {
        let (outer_top, outer_done) = (a.label(), a.label());
        let (inner_top, inner_done) = (a.label(), a.label());
        a.op_u32(Opcode::All, 0);
        a.ldi_s32(0).op_u32(Opcode::Stg, 0);
        a.ldi_s32(0).op(Opcode::Wti);
        a.bind(outer_top);
        a.op(Opcode::Wty).bcond(outer_done);
        a.ldi_s32(1).op(Opcode::Wti);
        a.bind(inner_top);
        a.op(Opcode::Wty).bcond(inner_done);
        a.op_u32(Opcode::Ldg, 0).op(Opcode::Inc).op_u32(Opcode::Stg, 0);
        a.jmp(inner_top);
        a.bind(inner_done);
        a.jmp(outer_top);
        a.bind(outer_done);
        a.op_u32(Opcode::Ldg, 0).ret(1);
    }));

    assert_eq!(finish(&mut vm, main, &[]).unwrap(), vec![Value::Int32(6)]);
    assert_eq!(vm.executor().self_id, None);
}
