//! Native table lookups

use core_types::{Result, Value};
use interpreter::{BasicFrame, NativeFn, NativeTable, Vm};
use pretty_assertions::assert_eq;

fn pick(_: &mut Vm<BasicFrame>, a: &Value, _: &Value, _: &Value, _: &Value, _: &Value) -> Result<Value> {
    Ok(a.clone())
}

fn count(_: &mut Vm<BasicFrame>, args: &[Value]) -> Result<Value> {
    Ok(Value::UInt64(args.len() as u64))
}

#[test]
fn test_register_assigns_dense_indices() {
    let mut table = NativeTable::<BasicFrame>::new();
    assert!(table.is_empty());
    assert_eq!(table.register("pick", NativeFn::Arity5(pick)), 0);
    assert_eq!(table.register("count", NativeFn::Variadic(count)), 1);
    assert_eq!(table.len(), 2);
    assert_eq!(table.find("count"), Some(1));
    assert_eq!(table.find("missing"), None);
    assert_eq!(&*table.get(0).unwrap().name, "pick");
    assert_eq!(table.get(0).unwrap().function.arity(), 5);
}

#[test]
fn test_invoke_through_entry() {
    let mut vm = Vm::new(BasicFrame::new());
    let index = vm.register_native("count", NativeFn::Variadic(count));
    let entry = vm.natives().get(index).unwrap().clone();
    let out = entry
        .function
        .invoke(&mut vm, &[Value::Undefined, Value::Undefined])
        .unwrap();
    assert_eq!(out, Some(Value::UInt64(2)));
}

#[test]
fn test_debug_lists_names() {
    let mut table = NativeTable::<BasicFrame>::new();
    table.register("pick", NativeFn::Arity5(pick));
    assert_eq!(format!("{table:?}"), "[\"pick\"]");
}
