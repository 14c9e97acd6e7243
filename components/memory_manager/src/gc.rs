//! Stop-the-world mark-sweep collector over an explicit reference graph.
//!
//! The collector never inspects payload memory. Owners report their edges
//! through [`Collector::add_reference`] and [`Collector::remove_reference`],
//! and a pass decides reachability purely from that side table:
//!
//! 1. Mark every node reachable from a root.
//! 2. Sweep every unmarked, non-root node: sever its edges, run its cleanup,
//!    and queue its payload for deletion.
//! 3. Delete the queued payloads once all removals are decided.

use rustc_hash::FxHashMap;

use crate::error::GcError;
use crate::object::{CallbackPayload, CleanupFn, Collectible, DeleteFn, NodeId};

/// Tracked record for one collectible payload
struct GcNode {
    /// Number of external anchors pinning this node
    root_count: u32,
    /// Transient mark bit, cleared after every sweep
    marked: bool,
    /// Outgoing edges with multiplicity
    references: FxHashMap<NodeId, u32>,
    payload: Box<dyn Collectible>,
}

enum Slot {
    Occupied { generation: u32, node: GcNode },
    Vacant { next_generation: u32 },
}

/// Counters accumulated over the collector's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Nodes constructed
    pub constructed: u64,
    /// Collection passes run
    pub passes: u64,
    /// Nodes reclaimed across all passes
    pub reclaimed: u64,
}

/// Arena of GC nodes with root flags and weighted edges.
///
/// # Examples
///
/// ```
/// use memory_manager::Collector;
///
/// let mut gc = Collector::new();
/// let a = gc.construct_node_with(Box::new(|| {}), Box::new(|| {}));
/// let b = gc.construct_node_with(Box::new(|| {}), Box::new(|| {}));
/// gc.add_reference(Some(a), Some(b));
/// gc.add_reference(Some(b), Some(a));
///
/// // an unrooted cycle is reclaimed in one pass
/// assert_eq!(gc.process(), 2);
/// assert_eq!(gc.node_count(), 0);
/// ```
pub struct Collector {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    stats: CollectorStats,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Collector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            stats: CollectorStats::default(),
        }
    }

    /// Register a payload and return the node that now tracks it.
    ///
    /// The node starts unrooted with no edges.
    pub fn construct_node(&mut self, payload: Box<dyn Collectible>) -> NodeId {
        let node = GcNode {
            root_count: 0,
            marked: false,
            references: FxHashMap::default(),
            payload,
        };
        self.live += 1;
        self.stats.constructed += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            let generation = match slot {
                Slot::Vacant { next_generation } => *next_generation,
                Slot::Occupied { generation, .. } => generation.wrapping_add(1),
            };
            *slot = Slot::Occupied { generation, node };
            return NodeId::new(index, generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied {
            generation: 0,
            node,
        });
        NodeId::new(index, 0)
    }

    /// Register a node from a cleanup and a delete operation
    ///
    /// # Arguments
    ///
    /// * `cleanup` - Runs first when the node is reclaimed
    /// * `delete` - Runs after every reclaimed node of the pass was cleaned up
    pub fn construct_node_with(&mut self, cleanup: CleanupFn, delete: DeleteFn) -> NodeId {
        self.construct_node(Box::new(CallbackPayload::new(cleanup, delete)))
    }

    fn node(&self, id: NodeId) -> Option<&GcNode> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied { generation, node }) if *generation == id.generation() => {
                Some(node)
            }
            _ => None,
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut GcNode> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied { generation, node }) if *generation == id.generation() => {
                Some(node)
            }
            _ => None,
        }
    }

    /// Whether `id` still names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.live
    }

    /// Lifetime counters
    pub fn stats(&self) -> CollectorStats {
        self.stats
    }

    /// Pin a node as an external anchor.
    ///
    /// Roots nest: a node pinned twice stays a root until unpinned twice.
    pub fn make_root(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.root_count += 1;
        }
    }

    /// Undo one [`Collector::make_root`]
    pub fn remove_root(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.root_count = node.root_count.saturating_sub(1);
        }
    }

    /// Whether the node is currently pinned
    pub fn is_root(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.root_count > 0)
    }

    /// Record one more reference from `from` to `to`.
    ///
    /// Either end may be `None`, in which case nothing is recorded; owners
    /// without a node and values without a payload pass through unchanged.
    pub fn add_reference(&mut self, from: Option<NodeId>, to: Option<NodeId>) {
        let (Some(from), Some(to)) = (from, to) else {
            return;
        };
        if !self.contains(to) {
            tracing::trace!(%from, %to, "ignoring edge to a reclaimed node");
            return;
        }
        if let Some(node) = self.node_mut(from) {
            *node.references.entry(to).or_insert(0) += 1;
        }
    }

    /// Drop one reference from `from` to `to`; the edge disappears at zero
    pub fn remove_reference(&mut self, from: Option<NodeId>, to: Option<NodeId>) {
        let (Some(from), Some(to)) = (from, to) else {
            return;
        };
        if let Some(node) = self.node_mut(from) {
            if let Some(count) = node.references.get_mut(&to) {
                *count -= 1;
                if *count == 0 {
                    node.references.remove(&to);
                }
            }
        }
    }

    /// Multiplicity of the edge `from -> to` (zero when absent)
    pub fn reference_count(&self, from: NodeId, to: NodeId) -> u32 {
        self.node(from)
            .and_then(|node| node.references.get(&to).copied())
            .unwrap_or(0)
    }

    /// All outgoing edges of a node, sorted by target
    pub fn references(&self, id: NodeId) -> Vec<(NodeId, u32)> {
        let mut edges: Vec<(NodeId, u32)> = self
            .node(id)
            .map(|node| node.references.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default();
        edges.sort();
        edges
    }

    /// Run one full mark-sweep pass.
    ///
    /// # Returns
    ///
    /// The number of nodes reclaimed.
    pub fn process(&mut self) -> usize {
        self.process_with_roots(&[])
    }

    /// Run a pass treating `extra_roots` as roots for this pass only.
    ///
    /// Embedders use this for payloads held by transient owners (an operand
    /// stack, for instance) that are neither pinned nor referenced by another
    /// node.
    pub fn process_with_roots(&mut self, extra_roots: &[NodeId]) -> usize {
        self.mark(extra_roots);
        let reclaimed = self.sweep();

        self.stats.passes += 1;
        self.stats.reclaimed += reclaimed as u64;
        tracing::debug!(reclaimed, remaining = self.live, "gc pass complete");
        reclaimed
    }

    fn mark(&mut self, extra_roots: &[NodeId]) {
        let mut worklist: Vec<NodeId> = extra_roots.to_vec();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Slot::Occupied { generation, node } = slot {
                if node.root_count > 0 {
                    worklist.push(NodeId::new(index as u32, *generation));
                }
            }
        }

        // marking an already-marked node is a no-op, so cycles terminate
        while let Some(id) = worklist.pop() {
            let Some(node) = self.node_mut(id) else {
                continue;
            };
            if node.marked {
                continue;
            }
            node.marked = true;
            worklist.extend(node.references.keys().copied());
        }
    }

    fn sweep(&mut self) -> usize {
        let mut condemned: Vec<Box<dyn Collectible>> = Vec::new();

        for index in 0..self.slots.len() {
            let keep = match &mut self.slots[index] {
                Slot::Occupied { node, .. } => {
                    if node.marked || node.root_count > 0 {
                        node.marked = false;
                        true
                    } else {
                        false
                    }
                }
                Slot::Vacant { .. } => true,
            };
            if keep {
                continue;
            }

            let next_generation = match &self.slots[index] {
                Slot::Occupied { generation, .. } => generation.wrapping_add(1),
                Slot::Vacant { next_generation } => *next_generation,
            };
            let slot = std::mem::replace(&mut self.slots[index], Slot::Vacant { next_generation });
            if let Slot::Occupied { mut node, .. } = slot {
                node.references.clear();
                node.payload.cleanup();
                condemned.push(node.payload);
            }
            self.free.push(index as u32);
            self.live -= 1;
        }

        let reclaimed = condemned.len();
        for payload in condemned {
            payload.delete();
        }
        reclaimed
    }

    /// Cross-check recorded edges against the payloads' real references.
    ///
    /// Every live payload is asked to trace what it actually holds; the
    /// per-target touch counts must equal the recorded multiplicities.
    /// No marking happens, so this can run at any point between instructions.
    ///
    /// # Errors
    ///
    /// [`GcError::IntegrityCheckFailed`] naming the first inconsistent edge.
    pub fn integrity_check(&self) -> Result<(), GcError> {
        for (index, slot) in self.slots.iter().enumerate() {
            let Slot::Occupied { generation, node } = slot else {
                continue;
            };
            if node.payload.is_detached() {
                continue;
            }
            let id = NodeId::new(index as u32, *generation);

            let mut touched: FxHashMap<NodeId, u32> = FxHashMap::default();
            node.payload
                .trace(&mut |target| *touched.entry(target).or_insert(0) += 1);

            for (target, recorded) in &node.references {
                let observed = touched.remove(target).unwrap_or(0);
                if observed != *recorded {
                    return Err(GcError::IntegrityCheckFailed {
                        node: id,
                        target: *target,
                        recorded: *recorded,
                        observed,
                    });
                }
            }
            if let Some((target, observed)) = touched.into_iter().next() {
                return Err(GcError::IntegrityCheckFailed {
                    node: id,
                    target,
                    recorded: 0,
                    observed,
                });
            }
        }
        Ok(())
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}
