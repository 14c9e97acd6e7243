//! Host interfaces: the instance table and global variables
//!
//! The VM does not own game objects. A host implements [`Frame`] to expose
//! its instances and globals; the dispatch loop resolves owner ids through
//! it.

use core_types::{Result, Value, VmError};
use memory_manager::NodeId;

/// Identifier of a live instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

/// Identifier of an instance or global variable slot
pub type VariableId = u32;

/// Owner id meaning the current instance
pub const SELF: i64 = -1;
/// Owner id meaning the previous instance
pub const OTHER: i64 = -2;
/// Owner id meaning every active instance
pub const ALL: i64 = -3;
/// Owner id meaning no instance
pub const NOONE: i64 = -4;
/// Owner id meaning the global variable table
pub const GLOBAL: i64 = -5;

/// What a dynamic owner id denotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerTarget {
    /// Nothing; stores are discarded and loads fail
    Noone,
    /// One concrete instance
    Single(InstanceId),
    /// Every instance in the set, in iteration order
    Multi(Vec<InstanceId>),
    /// The global variable table
    Global,
}

/// A game object whose variables the VM reads and writes
pub trait Instance {
    /// Variable slot `id`, created as `Undefined` if missing
    fn variable(&mut self, id: VariableId) -> &mut Value;

    /// Variable slot `id` if it exists
    fn find_variable(&self, id: VariableId) -> Option<&Value>;

    /// Read built-in variable `id`
    fn get_value(&self, id: VariableId) -> Result<Value>;

    /// Write built-in variable `id`
    fn set_value(&mut self, id: VariableId, value: Value) -> Result<()>;

    /// Read cell `(row, col)` of array built-in `id`
    fn get_value_array(&self, id: VariableId, row: usize, col: usize) -> Result<Value> {
        let _ = (row, col);
        Err(VmError::misc(format!("Built-in variable {id} is not an array")))
    }

    /// Write cell `(row, col)` of array built-in `id`
    fn set_value_array(&mut self, id: VariableId, row: usize, col: usize, value: Value) -> Result<()> {
        let _ = (row, col, value);
        Err(VmError::misc(format!("Built-in variable {id} is not an array")))
    }

    /// GC node owning the instance's arrays.
    ///
    /// Instances without one anchor stored arrays as GC roots instead.
    fn gc_node(&self) -> Option<NodeId> {
        None
    }
}

/// The host's instance table and globals
pub trait Frame {
    /// Concrete instance type
    type Instance: Instance;

    /// Instance `id`, if it exists
    fn instance(&mut self, id: InstanceId) -> Option<&mut Self::Instance>;

    /// Resolve a non-negative owner id (an instance id or an object index)
    fn resolve_owner(&self, id: i64) -> OwnerTarget;

    /// Every active instance, in iteration order
    fn all_instances(&self) -> Vec<InstanceId>;

    /// Global slot `id`, created as `Undefined` if missing
    fn global(&mut self, id: VariableId) -> &mut Value;
}
