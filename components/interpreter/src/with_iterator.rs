//! Snapshot iteration for `with` blocks

use smallvec::SmallVec;

use crate::frame::{InstanceId, OwnerTarget};

/// Instances captured when a `with` block is entered.
///
/// The set is fixed at entry; instances created or destroyed by the loop
/// body do not change which instances are visited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithIterator {
    instances: SmallVec<[InstanceId; 4]>,
    at: usize,
}

impl WithIterator {
    /// Iterator over the given instances in order
    pub fn new(instances: impl IntoIterator<Item = InstanceId>) -> Self {
        Self {
            instances: instances.into_iter().collect(),
            at: 0,
        }
    }

    /// Snapshot of an owner target; `Noone` and `Global` are empty
    pub fn from_target(target: OwnerTarget) -> Self {
        match target {
            OwnerTarget::Single(id) => Self::new([id]),
            OwnerTarget::Multi(ids) => Self::new(ids),
            OwnerTarget::Noone | OwnerTarget::Global => Self::default(),
        }
    }

    /// Whether every instance has been visited
    pub fn complete(&self) -> bool {
        self.at >= self.instances.len()
    }

    /// Instance to visit next
    pub fn current(&self) -> Option<InstanceId> {
        self.instances.get(self.at).copied()
    }

    /// Move to the next instance
    pub fn advance(&mut self) {
        self.at += 1;
    }

    /// Number of instances in the snapshot
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
