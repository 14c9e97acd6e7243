//! Copy-on-write 2-D arrays.
//!
//! An array value is an [`ArrayHandle`]: a possibly-null shared reference to
//! [`ArrayData`]. Handles are cheap to clone; a write through a handle whose
//! data is shared first clones the data so the writer holds a private copy.
//!
//! When a [`Collector`] is supplied, array data registers a GC node and every
//! array stored in a cell is mirrored as an edge from the containing array's
//! node. Reference counting alone cannot free cycles of arrays; the collector
//! reclaims them by clearing the rows of unreachable data.
//!
//! Every mutating operation takes `gc: Option<&mut Collector>` and
//! `owner: Option<NodeId>`. `owner` is the node of the structure containing
//! the value being mutated (the enclosing array for a cell, `None` for stack
//! slots, fields and globals).

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use memory_manager::{Collectible, Collector, NodeId};

use crate::error::{Result, VmError};
use crate::value::Value;

/// Backing store of an array value: rows of cells.
#[derive(Default)]
pub struct ArrayData {
    rows: Vec<Vec<Value>>,
    node: Option<NodeId>,
}

impl ArrayData {
    /// Create empty array data with no GC node
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Cells of one row
    pub fn row(&self, row: usize) -> Option<&[Value]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    /// The GC node tracking this data, if any
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Extend rows and columns so that `(row, col)` exists.
    ///
    /// New cells are zero-valued reals, not undefined.
    fn grow(&mut self, row: usize, col: usize) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, || Value::Real(0.0));
        }
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> &mut Value {
        self.grow(row, col);
        &mut self.rows[row][col]
    }
}

impl fmt::Debug for ArrayData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayData")
            .field("height", &self.rows.len())
            .field("node", &self.node)
            .finish()
    }
}

/// GC payload for one [`ArrayData`].
///
/// Holds the data weakly so the collector does not keep it alive; the
/// reference count then measures handles only.
struct ArrayNode {
    data: Weak<RefCell<ArrayData>>,
}

impl Collectible for ArrayNode {
    fn trace(&self, visit: &mut dyn FnMut(NodeId)) {
        let Some(data) = self.data.upgrade() else {
            return;
        };
        let data = data.borrow();
        for cell in data.rows.iter().flatten() {
            if let Some(node) = cell.array_node() {
                visit(node);
            }
        }
    }

    fn is_detached(&self) -> bool {
        self.data.strong_count() == 0
    }

    fn cleanup(&mut self) {
        if let Some(data) = self.data.upgrade() {
            data.borrow_mut().node = None;
        }
    }

    fn delete(self: Box<Self>) {
        if let Some(data) = self.data.upgrade() {
            // dropping the cells releases handles held in a cycle
            let rows = std::mem::take(&mut data.borrow_mut().rows);
            drop(rows);
        }
    }
}

/// Register `data` with the collector and mirror its cells as edges
fn register(gc: &mut Collector, data: &Rc<RefCell<ArrayData>>) -> NodeId {
    let node = gc.construct_node(Box::new(ArrayNode {
        data: Rc::downgrade(data),
    }));
    data.borrow_mut().node = Some(node);
    let borrowed = data.borrow();
    for cell in borrowed.rows.iter().flatten() {
        gc.add_reference(Some(node), cell.array_node());
    }
    node
}

/// Reference-counted, copy-on-write handle to [`ArrayData`].
///
/// A handle may be flagged as a GC root, meaning the value holding it is a
/// long-lived anchor (an instance field or a global). Clones are never
/// rooted.
#[derive(Default)]
pub struct ArrayHandle {
    data: Option<Rc<RefCell<ArrayData>>>,
    rooted: bool,
}

impl Clone for ArrayHandle {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            rooted: false,
        }
    }
}

impl fmt::Debug for ArrayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            None => write!(f, "ArrayHandle(null)"),
            Some(data) => write!(
                f,
                "ArrayHandle({:#x}, refs={}, rooted={})",
                Rc::as_ptr(data) as usize,
                Rc::strong_count(data),
                self.rooted
            ),
        }
    }
}

impl ArrayHandle {
    /// A handle with no backing data yet
    pub fn null() -> Self {
        Self::default()
    }

    /// Wrap rows in a fresh handle, registering a GC node when `gc` is given
    pub fn from_rows(rows: Vec<Vec<Value>>, gc: Option<&mut Collector>) -> Self {
        let data = Rc::new(RefCell::new(ArrayData { rows, node: None }));
        if let Some(gc) = gc {
            register(gc, &data);
        }
        Self {
            data: Some(data),
            rooted: false,
        }
    }

    /// Whether no data has been allocated yet
    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// Whether this handle anchors its data as a GC root
    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    /// Number of handles sharing the data (zero when null)
    pub fn ref_count(&self) -> usize {
        self.data.as_ref().map_or(0, Rc::strong_count)
    }

    /// Whether both handles point at the same data.
    ///
    /// Null handles share nothing, so two of them are unequal.
    pub fn ptr_eq(&self, other: &ArrayHandle) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Read access to the data without allocating
    pub fn data(&self) -> Option<Ref<'_, ArrayData>> {
        self.data.as_ref().map(|data| data.borrow())
    }

    /// The GC node of the data, if allocated and tracked
    pub fn node(&self) -> Option<NodeId> {
        self.data.as_ref().and_then(|data| data.borrow().node)
    }

    pub(crate) fn address(&self) -> usize {
        self.data.as_ref().map_or(0, |data| Rc::as_ptr(data) as usize)
    }

    /// Shared data, allocating an empty backing store on first use
    pub fn readable(
        &mut self,
        gc: Option<&mut Collector>,
        owner: Option<NodeId>,
    ) -> Rc<RefCell<ArrayData>> {
        self.writeable_no_copy(gc, owner)
    }

    /// Data safe to mutate in place.
    ///
    /// Shared data is cloned first: cells are copied one by one, the copy gets
    /// its own GC node mirroring its cells, and the owner's edge (or this
    /// handle's root anchor) moves from the old data to the copy.
    pub fn writeable(
        &mut self,
        mut gc: Option<&mut Collector>,
        owner: Option<NodeId>,
    ) -> Rc<RefCell<ArrayData>> {
        let shared = self
            .data
            .as_ref()
            .is_some_and(|data| Rc::strong_count(data) > 1);
        if !shared {
            return self.writeable_no_copy(gc, owner);
        }

        let Some(old) = self.data.take() else {
            return self.writeable_no_copy(gc, owner);
        };
        let (rows, old_node) = {
            let old = old.borrow();
            (old.rows.clone(), old.node)
        };
        let copy = Rc::new(RefCell::new(ArrayData { rows, node: None }));

        if let Some(gc) = gc.as_deref_mut() {
            // a copy of untracked data stays untracked
            if old_node.is_some() {
                let new_node = register(gc, &copy);
                gc.remove_reference(owner, old_node);
                gc.add_reference(owner, Some(new_node));
                if self.rooted {
                    if let Some(old_node) = old_node {
                        gc.remove_root(old_node);
                    }
                    gc.make_root(new_node);
                }
            }
        }
        tracing::trace!(refs = Rc::strong_count(&old), "array copy-on-write");

        self.data = Some(copy.clone());
        copy
    }

    /// Data for mutation without the copy-on-write check.
    ///
    /// Only for callers that have already proven exclusivity, or that run
    /// with copy-on-write disabled.
    pub fn writeable_no_copy(
        &mut self,
        gc: Option<&mut Collector>,
        owner: Option<NodeId>,
    ) -> Rc<RefCell<ArrayData>> {
        if let Some(data) = &self.data {
            return data.clone();
        }

        let data = Rc::new(RefCell::new(ArrayData::new()));
        if let Some(gc) = gc {
            let node = register(gc, &data);
            gc.add_reference(owner, Some(node));
            if self.rooted {
                gc.make_root(node);
            }
        }
        self.data = Some(data.clone());
        data
    }

    fn make_root(&mut self, gc: &mut Collector) {
        if self.rooted {
            return;
        }
        self.rooted = true;
        if let Some(node) = self.node() {
            gc.make_root(node);
        }
    }

    fn release_root(&mut self, gc: &mut Collector) {
        if !self.rooted {
            return;
        }
        self.rooted = false;
        if let Some(node) = self.node() {
            gc.remove_root(node);
        }
    }
}

fn not_an_array() -> VmError {
    VmError::misc("Indexing variable which is not an array.")
}

impl Value {
    /// Create an array value from rows
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// let v = Value::array(vec![vec![Value::Int32(1), Value::Int32(2)]], None);
    /// assert_eq!(v.to_string(), "[[1, 2]]");
    /// ```
    pub fn array(rows: Vec<Vec<Value>>, gc: Option<&mut Collector>) -> Value {
        Value::Array(ArrayHandle::from_rows(rows, gc))
    }

    /// GC node of the array data this value points at, if any
    pub fn array_node(&self) -> Option<NodeId> {
        match self {
            Value::Array(handle) => handle.node(),
            _ => None,
        }
    }

    /// Make this value array-typed with allocated data.
    ///
    /// A non-array value is replaced by an empty array.
    pub fn array_ensure(&mut self, gc: Option<&mut Collector>, owner: Option<NodeId>) {
        if !self.is_array() {
            *self = Value::Array(ArrayHandle::null());
        }
        if let Value::Array(handle) = self {
            handle.readable(gc, owner);
        }
    }

    fn array_handle_mut(&mut self) -> &mut ArrayHandle {
        if !self.is_array() {
            *self = Value::Array(ArrayHandle::null());
        }
        match self {
            Value::Array(handle) => handle,
            _ => unreachable!("value was just made an array"),
        }
    }

    fn writeable_data(
        &mut self,
        copy: bool,
        gc: Option<&mut Collector>,
        owner: Option<NodeId>,
    ) -> Rc<RefCell<ArrayData>> {
        let handle = self.array_handle_mut();
        if copy {
            handle.writeable(gc, owner)
        } else {
            handle.writeable_no_copy(gc, owner)
        }
    }

    /// Mutable access to cell `(row, col)`, growing the array as needed.
    ///
    /// The value becomes an array if it is not one. With `copy` set, shared
    /// data is cloned before the cell is handed out.
    ///
    /// Storing an array through the returned reference bypasses GC edge
    /// bookkeeping; use [`Value::array_store`] for that.
    pub fn array_get(
        &mut self,
        row: usize,
        col: usize,
        copy: bool,
        gc: Option<&mut Collector>,
        owner: Option<NodeId>,
    ) -> RefMut<'_, Value> {
        self.writeable_data(copy, gc, owner);
        let cell: &RefCell<ArrayData> = match &*self {
            Value::Array(ArrayHandle { data: Some(data), .. }) => data,
            _ => unreachable!("writeable data was just allocated"),
        };
        RefMut::map(cell.borrow_mut(), |data| data.cell_mut(row, col))
    }

    /// Store `value` into cell `(row, col)`, growing the array as needed.
    ///
    /// GC edges are re-linked: the edge to the replaced cell's array (if any)
    /// is dropped and one to the stored array (if any) is added.
    pub fn array_store(
        &mut self,
        row: usize,
        col: usize,
        value: Value,
        copy: bool,
        mut gc: Option<&mut Collector>,
        owner: Option<NodeId>,
    ) {
        let data = self.writeable_data(copy, gc.as_deref_mut(), owner);
        let container = data.borrow().node;
        data.borrow_mut().grow(row, col);

        if let Some(gc) = gc {
            let replaced = data.borrow().rows[row][col].array_node();
            gc.remove_reference(container, replaced);
            gc.add_reference(container, value.array_node());
        }

        let old = std::mem::replace(&mut data.borrow_mut().rows[row][col], value);
        drop(old);
    }

    /// Read cell `(row, col)` without growing.
    ///
    /// # Errors
    ///
    /// `Misc` when the value is not an array or the index is out of bounds.
    pub fn array_at(&self, row: usize, col: usize) -> Result<Value> {
        let Value::Array(handle) = self else {
            return Err(not_an_array());
        };
        let Some(data) = handle.data() else {
            return Err(VmError::misc(format!(
                "Array index out of bounds: {row},{col} not in bounds 0, 0"
            )));
        };
        match data.rows.get(row) {
            Some(cells) if col < cells.len() => Ok(cells[col].clone()),
            cells => Err(VmError::misc(format!(
                "Array index out of bounds: {row},{col} not in bounds {}, {}",
                data.rows.len(),
                cells.map_or(0, Vec::len)
            ))),
        }
    }

    /// Store `value` through a chain of nested arrays.
    ///
    /// `indices[0]` addresses this array, each following pair addresses the
    /// array held in the previous cell. Intermediate cells that are not
    /// arrays become empty arrays; every level is grown and copied on write
    /// like [`Value::array_store`].
    pub fn array_store_nested(
        &mut self,
        indices: &[(usize, usize)],
        value: Value,
        copy: bool,
        mut gc: Option<&mut Collector>,
        owner: Option<NodeId>,
    ) {
        match indices {
            [] => *self = value,
            [(row, col)] => self.array_store(*row, *col, value, copy, gc, owner),
            [(row, col), rest @ ..] => {
                // the cell is moved out so a self-referencing array is not
                // borrowed twice
                let mut cell = self.array_get(*row, *col, copy, gc.as_deref_mut(), owner).take();
                let container = self.array_node();
                cell.array_store_nested(rest, value, copy, gc, container);
                *self.array_get(*row, *col, false, None, None) = cell;
            }
        }
    }

    /// Read through a chain of nested arrays without growing.
    ///
    /// # Errors
    ///
    /// As [`Value::array_at`], at whichever level fails first.
    pub fn array_at_nested(&self, indices: &[(usize, usize)]) -> Result<Value> {
        let mut current = self.clone();
        for (row, col) in indices {
            current = current.array_at(*row, *col)?;
        }
        Ok(current)
    }

    /// Number of rows
    pub fn array_height(&self) -> Result<usize> {
        match self {
            Value::Array(handle) => Ok(handle.data().map_or(0, |data| data.height())),
            _ => Err(not_an_array()),
        }
    }

    /// Number of cells in `row`
    ///
    /// # Errors
    ///
    /// `UnspecifiedLegacyBehavior` when the row does not exist.
    pub fn array_length(&self, row: usize) -> Result<usize> {
        let Value::Array(handle) = self else {
            return Err(not_an_array());
        };
        handle
            .data()
            .and_then(|data| data.row(row).map(<[Value]>::len))
            .ok_or_else(|| VmError::unspecified(format!("length of nonexistent row {row}")))
    }

    /// Anchor this value's array as a GC root.
    ///
    /// Used for long-lived owners (fields, globals). No-op for non-arrays.
    pub fn make_root(&mut self, gc: &mut Collector) {
        if let Value::Array(handle) = self {
            handle.make_root(gc);
        }
    }

    /// Undo [`Value::make_root`] before the value is overwritten or discarded
    pub fn release_root(&mut self, gc: &mut Collector) {
        if let Value::Array(handle) = self {
            handle.release_root(gc);
        }
    }

    /// Whether this value anchors an array as a GC root
    pub fn is_gc_root(&self) -> bool {
        matches!(self, Value::Array(handle) if handle.is_rooted())
    }
}
