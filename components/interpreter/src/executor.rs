//! Execution state of the VM
//!
//! There are no frame objects: a call's arguments, argument count, saved
//! locals base and locals all live on the one operand stack.
//!
//! ```text
//!   ... arg0 .. argN-1  argc  saved_locals_start | local0 .. localK-1  temporaries
//!                                                ^ locals_start
//! ```

use bytecode_system::{Bytecode, BytecodeStream};
use core_types::{Pointer, Result, Value, VmError};

use crate::frame::InstanceId;
use crate::with_iterator::WithIterator;

/// Name of the placeholder section the program counter rests in between
/// calls
pub const HOST_SECTION: &str = "<host>";

fn underflow() -> VmError {
    VmError::misc("Operand stack underflow")
}

/// Operand stack, program counter and status flags
pub struct Executor {
    /// Operand and locals stack
    pub stack: Vec<Value>,
    /// Index of local 0 of the running call
    pub locals_start: usize,
    /// Program counters of the callers, outermost first
    pub return_addresses: Vec<BytecodeStream>,
    /// Program counter
    pub pc: BytecodeStream,
    /// Open `with` iterators, innermost last
    pub with_iterators: Vec<WithIterator>,
    /// Branch condition flag
    pub status_cond: bool,
    /// Whether array writes copy shared data
    pub status_cow: bool,
    /// Current instance
    pub self_id: Option<InstanceId>,
    /// Previous instance
    pub other_id: Option<InstanceId>,
}

impl Executor {
    /// Idle executor with stack room for `capacity` values
    pub fn new(capacity: usize, copy_on_write: bool) -> Self {
        Self {
            stack: Vec::with_capacity(capacity),
            locals_start: 0,
            return_addresses: Vec::new(),
            pc: host_stream(),
            with_iterators: Vec::new(),
            status_cond: false,
            status_cow: copy_on_write,
            self_id: None,
            other_id: None,
        }
    }

    /// Discard all call state, keeping the instance bindings and flags
    pub fn reset(&mut self) {
        self.stack.clear();
        self.locals_start = 0;
        self.return_addresses.clear();
        self.pc = host_stream();
        self.with_iterators.clear();
    }

    /// Current call depth
    pub fn depth(&self) -> usize {
        self.return_addresses.len()
    }

    /// Push a value
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop the top value
    pub fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or_else(underflow)
    }

    /// The value `depth` slots below the top (0 is the top)
    pub fn peek(&self, depth: usize) -> Result<&Value> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|index| self.stack.get(index))
            .ok_or_else(underflow)
    }

    /// Mutable access to the top value
    pub fn top_mut(&mut self) -> Result<&mut Value> {
        self.stack.last_mut().ok_or_else(underflow)
    }

    /// Local slot `index` of the running call
    pub fn local(&mut self, index: u32) -> Result<&mut Value> {
        let slot = self.locals_start + index as usize;
        self.stack
            .get_mut(slot)
            .ok_or_else(|| VmError::misc(format!("Local {index} out of range")))
    }

    /// Slot `index` below the locals base: 0 is the saved locals base, 1 the
    /// argument count, then the arguments last to first
    pub fn prelocal(&self, index: usize) -> Result<&Value> {
        self.locals_start
            .checked_sub(index + 1)
            .and_then(|slot| self.stack.get(slot))
            .ok_or_else(underflow)
    }

    /// Number of arguments passed to the running call
    pub fn argument_count(&self) -> Result<usize> {
        self.prelocal(1)?.cast_exact()
    }

    /// Argument `index` of the running call
    pub fn argument(&self, index: usize) -> Result<&Value> {
        let argc = self.argument_count()?;
        if index >= argc {
            return Err(VmError::misc(format!(
                "Argument {index} requested but only {argc} passed"
            )));
        }
        self.prelocal(argc - index + 1)
    }

    /// Enter a new instance scope: `other` is saved on the stack, the old
    /// `self` becomes `other` and `id` becomes `self`
    pub fn push_self(&mut self, id: Option<InstanceId>) {
        self.stack.push(encode_instance(self.other_id));
        self.other_id = self.self_id;
        self.self_id = id;
    }

    /// Leave the scope entered by [`Executor::push_self`]
    pub fn pop_self(&mut self) -> Result<()> {
        let saved = self.pop()?;
        self.self_id = self.other_id;
        self.other_id = decode_instance(&saved)?;
        Ok(())
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(0, true)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("stack_len", &self.stack.len())
            .field("locals_start", &self.locals_start)
            .field("depth", &self.return_addresses.len())
            .field("pc", &self.pc)
            .field("with_depth", &self.with_iterators.len())
            .field("status_cond", &self.status_cond)
            .field("status_cow", &self.status_cow)
            .field("self_id", &self.self_id)
            .field("other_id", &self.other_id)
            .finish()
    }
}

fn host_stream() -> BytecodeStream {
    BytecodeStream::new(Bytecode::new(Vec::<u8>::new(), 0, Some(0)).with_name(HOST_SECTION))
}

fn encode_instance(id: Option<InstanceId>) -> Value {
    match id {
        Some(id) => Value::Pointer(Pointer(id.0 as usize)),
        None => Value::Undefined,
    }
}

fn decode_instance(value: &Value) -> Result<Option<InstanceId>> {
    match value {
        Value::Undefined => Ok(None),
        Value::Pointer(Pointer(raw)) => u32::try_from(*raw)
            .map(|raw| Some(InstanceId(raw)))
            .map_err(|_| VmError::misc("Corrupt saved instance")),
        other => Err(VmError::misc(format!(
            "Expected a saved instance, found {}",
            other.kind()
        ))),
    }
}
