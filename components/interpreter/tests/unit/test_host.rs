//! In-memory host frame

use core_types::Value;
use interpreter::{BasicFrame, Frame, Instance, OwnerTarget, FIRST_INSTANCE_ID};
use memory_manager::Collector;
use pretty_assertions::assert_eq;

#[test]
fn test_ids_start_above_object_indices() {
    let mut frame = BasicFrame::new();
    let first = frame.create_instance(3);
    let second = frame.create_instance(3);
    assert_eq!(first.0, FIRST_INSTANCE_ID);
    assert_eq!(second.0, FIRST_INSTANCE_ID + 1);
    assert_eq!(frame.len(), 2);
}

#[test]
fn test_resolve_owner() {
    let mut frame = BasicFrame::new();
    let a = frame.create_instance(3);
    let b = frame.create_instance(4);
    let c = frame.create_instance(3);

    assert_eq!(frame.resolve_owner(a.0 as i64), OwnerTarget::Single(a));
    assert_eq!(frame.resolve_owner(3), OwnerTarget::Multi(vec![a, c]));
    assert_eq!(frame.resolve_owner(9), OwnerTarget::Multi(Vec::new()));
    assert_eq!(
        frame.resolve_owner((FIRST_INSTANCE_ID + 50) as i64),
        OwnerTarget::Noone
    );

    frame.destroy_instance(c);
    assert_eq!(frame.resolve_owner(3), OwnerTarget::Multi(vec![a]));
    assert_eq!(frame.all_instances(), vec![a, b]);
    // destroyed instances stay addressable by id until cleanup
    assert_eq!(frame.resolve_owner(c.0 as i64), OwnerTarget::Single(c));
}

#[test]
fn test_variables_and_builtins() {
    let mut frame = BasicFrame::new();
    let id = frame.create_instance(0);
    let instance = frame.instance(id).unwrap();

    assert_eq!(instance.find_variable(1), None);
    *instance.variable(1) = Value::Int32(5);
    assert_eq!(instance.find_variable(1), Some(&Value::Int32(5)));

    assert!(instance.get_value(0).is_err());
    instance.define_builtin(0, Value::Real(1.0));
    instance.set_value(0, Value::Real(2.0)).unwrap();
    assert_eq!(instance.get_value(0).unwrap(), Value::Real(2.0));
    assert!(instance.get_value_array(0, 0, 0).is_err());
    assert_eq!(instance.gc_node(), None);
}

#[test]
fn test_cleanup_releases_field_roots() {
    let mut gc = Collector::new();
    let mut frame = BasicFrame::new();
    let id = frame.create_instance(0);

    let field = frame.instance(id).unwrap().variable(0);
    *field = Value::array(vec![vec![Value::Int32(1)]], Some(&mut gc));
    field.make_root(&mut gc);
    assert_eq!(gc.process(), 0);

    frame.destroy_instance(id);
    assert_eq!(gc.process(), 0);
    frame.cleanup(Some(&mut gc));
    assert!(frame.is_empty());
    assert_eq!(gc.process(), 1);
}

#[test]
fn test_globals_default_to_undefined() {
    let mut frame = BasicFrame::new();
    assert_eq!(*frame.global(4), Value::Undefined);
    *frame.global(4) = Value::Bool(true);
    assert_eq!(*frame.global(4), Value::Bool(true));
}
