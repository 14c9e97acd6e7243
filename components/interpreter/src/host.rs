//! Ready-made in-memory host
//!
//! [`BasicFrame`] keeps instances in creation order and globals in a hash
//! map. Embedders with their own object model implement [`Frame`] directly.

use rustc_hash::FxHashMap;

use core_types::{Result, Value, VmError};
use memory_manager::Collector;

use crate::frame::{Frame, Instance, InstanceId, OwnerTarget, VariableId};

/// First id handed out to instances; smaller ids name object indices
pub const FIRST_INSTANCE_ID: u32 = 100_000;

/// Instance with hash-mapped variables and built-ins
#[derive(Debug, Default)]
pub struct BasicInstance {
    id: Option<InstanceId>,
    object_index: i64,
    variables: FxHashMap<VariableId, Value>,
    builtins: FxHashMap<VariableId, Value>,
    active: bool,
}

impl BasicInstance {
    /// Instance of object `object_index`
    pub fn new(id: InstanceId, object_index: i64) -> Self {
        Self {
            id: Some(id),
            object_index,
            active: true,
            ..Self::default()
        }
    }

    /// Id of this instance
    pub fn id(&self) -> Option<InstanceId> {
        self.id
    }

    /// Object index this instance belongs to
    pub fn object_index(&self) -> i64 {
        self.object_index
    }

    /// Whether the instance has not been destroyed
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Declare built-in `id` with an initial value
    pub fn define_builtin(&mut self, id: VariableId, value: Value) {
        self.builtins.insert(id, value);
    }
}

impl Instance for BasicInstance {
    fn variable(&mut self, id: VariableId) -> &mut Value {
        self.variables.entry(id).or_default()
    }

    fn find_variable(&self, id: VariableId) -> Option<&Value> {
        self.variables.get(&id)
    }

    fn get_value(&self, id: VariableId) -> Result<Value> {
        self.builtins
            .get(&id)
            .cloned()
            .ok_or_else(|| VmError::misc(format!("Unknown built-in variable {id}")))
    }

    fn set_value(&mut self, id: VariableId, value: Value) -> Result<()> {
        match self.builtins.get_mut(&id) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VmError::misc(format!("Unknown built-in variable {id}"))),
        }
    }
}

/// In-memory instance table and globals
#[derive(Debug, Default)]
pub struct BasicFrame {
    instances: FxHashMap<InstanceId, BasicInstance>,
    order: Vec<InstanceId>,
    globals: FxHashMap<VariableId, Value>,
    next_id: u32,
}

impl BasicFrame {
    /// Empty frame
    pub fn new() -> Self {
        Self {
            next_id: FIRST_INSTANCE_ID,
            ..Self::default()
        }
    }

    /// Create an instance of `object_index`
    pub fn create_instance(&mut self, object_index: i64) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.instances.insert(id, BasicInstance::new(id, object_index));
        self.order.push(id);
        id
    }

    /// Mark an instance destroyed.
    ///
    /// It stays addressable by id until [`BasicFrame::cleanup`] but no
    /// longer appears in [`Frame::all_instances`] or object sets.
    pub fn destroy_instance(&mut self, id: InstanceId) {
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.active = false;
        }
    }

    /// Drop destroyed instances, releasing the GC roots their fields hold
    pub fn cleanup(&mut self, mut gc: Option<&mut Collector>) {
        let instances = &mut self.instances;
        self.order.retain(|id| {
            let keep = instances.get(id).is_some_and(BasicInstance::is_active);
            if !keep {
                if let Some(mut dead) = instances.remove(id) {
                    if let Some(gc) = gc.as_deref_mut() {
                        for value in dead.variables.values_mut() {
                            value.release_root(gc);
                        }
                    }
                }
            }
            keep
        });
    }

    /// Shared access to instance `id`
    pub fn get(&self, id: InstanceId) -> Option<&BasicInstance> {
        self.instances.get(&id)
    }

    /// Number of instances, destroyed ones included until cleanup
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether there are no instances
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn active(&self) -> impl Iterator<Item = &BasicInstance> {
        self.order
            .iter()
            .filter_map(|id| self.instances.get(id))
            .filter(|instance| instance.active)
    }
}

impl Frame for BasicFrame {
    type Instance = BasicInstance;

    fn instance(&mut self, id: InstanceId) -> Option<&mut BasicInstance> {
        self.instances.get_mut(&id)
    }

    fn resolve_owner(&self, id: i64) -> OwnerTarget {
        if let Ok(raw) = u32::try_from(id) {
            if raw >= FIRST_INSTANCE_ID {
                return match self.instances.get(&InstanceId(raw)) {
                    Some(_) => OwnerTarget::Single(InstanceId(raw)),
                    None => OwnerTarget::Noone,
                };
            }
        }
        OwnerTarget::Multi(
            self.active()
                .filter(|instance| instance.object_index == id)
                .filter_map(BasicInstance::id)
                .collect(),
        )
    }

    fn all_instances(&self) -> Vec<InstanceId> {
        self.active().filter_map(BasicInstance::id).collect()
    }

    fn global(&mut self, id: VariableId) -> &mut Value {
        self.globals.entry(id).or_default()
    }
}
