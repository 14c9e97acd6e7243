//! Collectible payloads and node identifiers
//!
//! Every heap payload the collector tracks is wrapped in a node addressed by a
//! [`NodeId`]. The payload itself implements [`Collectible`], which replaces
//! the pair of opaque cleanup/delete callbacks with a typed interface.

use std::fmt;

/// Identifier of a node tracked by a [`Collector`](crate::Collector).
///
/// Identifiers are generational: a reclaimed node's slot may be reused, but an
/// identifier handed out for the old node never aliases the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the collector arena
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this identifier was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// A heap payload whose reclamation is decided by the collector.
///
/// When a node is found unreachable the collector first severs its outgoing
/// edges, then calls [`Collectible::cleanup`], and only after every reclaimed
/// node of the pass has been cleaned up does it call [`Collectible::delete`].
/// Both hooks run exactly once.
pub trait Collectible {
    /// Reports every node this payload currently references, once per
    /// reference.
    ///
    /// Only the integrity check calls this; it must reflect the payload's
    /// real contents rather than the edges recorded in the collector.
    fn trace(&self, visit: &mut dyn FnMut(NodeId));

    /// Whether the payload's storage was already released by its owners.
    ///
    /// A detached payload can no longer report its references, so the
    /// integrity check skips it; the next pass reclaims its node.
    fn is_detached(&self) -> bool {
        false
    }

    /// Unlinks the payload from the graph before deletion.
    fn cleanup(&mut self) {}

    /// Destroys the payload.
    fn delete(self: Box<Self>) {}
}

/// Cleanup callback accepted by [`CallbackPayload`]
pub type CleanupFn = Box<dyn FnOnce()>;

/// Delete callback accepted by [`CallbackPayload`]
pub type DeleteFn = Box<dyn FnOnce()>;

/// Payload built from two caller-supplied operations.
///
/// Hosts that manage an object's storage themselves register it with a
/// cleanup and a delete operation instead of implementing [`Collectible`].
/// Such payloads report no references to the integrity check.
pub struct CallbackPayload {
    cleanup: Option<CleanupFn>,
    delete: Option<DeleteFn>,
}

impl CallbackPayload {
    /// Create a payload from a cleanup and a delete operation
    pub fn new(cleanup: CleanupFn, delete: DeleteFn) -> Self {
        Self {
            cleanup: Some(cleanup),
            delete: Some(delete),
        }
    }
}

impl fmt::Debug for CallbackPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPayload")
            .field("cleanup_pending", &self.cleanup.is_some())
            .field("delete_pending", &self.delete.is_some())
            .finish()
    }
}

impl Collectible for CallbackPayload {
    fn trace(&self, _visit: &mut dyn FnMut(NodeId)) {}

    fn cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }

    fn delete(mut self: Box<Self>) {
        if let Some(delete) = self.delete.take() {
            delete();
        }
    }
}
