//! Dispatch loop for bytecode execution
//!
//! Handles individual opcode execution. Operands are read straight from the
//! program counter; values move through the executor's operand stack.

use smallvec::SmallVec;

use bytecode_system::Opcode;
use core_types::{ArrayHandle, Result, Value, VmError};
use memory_manager::{Collector, NodeId};

use crate::error::Failure;
use crate::frame::{Frame, Instance, InstanceId, OwnerTarget, VariableId, ALL, GLOBAL, NOONE, OTHER, SELF};
use crate::native::{VARIADIC, VOID_UNARY};
use crate::vm::{check_argc, Vm};
use crate::with_iterator::WithIterator;

/// What the loop does after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Fetch the next instruction
    Continue,
    /// The running section returned
    Return,
    /// A `sus` instruction was reached
    Suspend,
}

type Indices = SmallVec<[(usize, usize); 4]>;

const ONE: Value = Value::Int32(1);

fn no_instance() -> VmError {
    VmError::misc("Attempted to load variable from non-existent instance.")
}

fn missing_instance(id: InstanceId) -> VmError {
    VmError::misc(format!("Instance {} does not exist", id.0))
}

fn unset_variable(id: VariableId) -> VmError {
    VmError::misc(format!("Variable {id} is not set"))
}

fn global_builtin(id: VariableId) -> VmError {
    VmError::misc(format!("Global has no built-in variable {id}"))
}

/// Replace a field or global, keeping GC anchoring in step: owned slots
/// mirror the value as an edge from `owner`, unowned slots root it.
fn store_owned(gc: Option<&mut Collector>, slot: &mut Value, owner: Option<NodeId>, mut value: Value) {
    if let Some(gc) = gc {
        match owner {
            Some(node) => {
                gc.remove_reference(Some(node), slot.array_node());
                gc.add_reference(Some(node), value.array_node());
            }
            None => {
                slot.release_root(gc);
                value.make_root(gc);
            }
        }
    }
    *slot = value;
}

/// Store into a (possibly nested) array cell of a field or global
fn store_owned_cell(
    mut gc: Option<&mut Collector>,
    slot: &mut Value,
    owner: Option<NodeId>,
    indices: &[(usize, usize)],
    value: Value,
    copy: bool,
) {
    if !slot.is_array() {
        *slot = Value::Array(ArrayHandle::null());
    }
    if owner.is_none() {
        if let Some(gc) = gc.as_deref_mut() {
            slot.make_root(gc);
        }
    }
    slot.array_store_nested(indices, value, copy, gc, owner);
}

impl<F: Frame> Vm<F> {
    /// Execute one instruction
    pub(crate) fn step(&mut self) -> std::result::Result<Flow, Failure> {
        let address = self.executor.pc.position();
        let op = self.executor.pc.read_opcode()?;
        if self.config.trace_dispatch {
            tracing::trace!(
                address,
                opcode = op.mnemonic(),
                depth = self.executor.depth(),
                stack = self.executor.stack.len(),
                "dispatch"
            );
        }

        match op {
            // constants
            Opcode::LdiFalse => self.executor.push(Value::Bool(false)),
            Opcode::LdiTrue => self.executor.push(Value::Bool(true)),
            Opcode::LdiUndef => self.executor.push(Value::Undefined),
            Opcode::LdiF32 => {
                let value = self.executor.pc.read_f32()?;
                self.executor.push(Value::Real(value as f64));
            }
            Opcode::LdiF64 => {
                let value = self.executor.pc.read_f64()?;
                self.executor.push(Value::Real(value));
            }
            Opcode::LdiS32 => {
                let value = self.executor.pc.read_i32()?;
                self.executor.push(Value::Int32(value));
            }
            Opcode::LdiU64 => {
                let value = self.executor.pc.read_u64()?;
                self.executor.push(Value::UInt64(value));
            }
            Opcode::LdiString => {
                let value = self.executor.pc.read_string()?;
                self.executor.push(Value::from(value));
            }
            Opcode::LdiZero => self.executor.push(Value::Real(0.0)),
            Opcode::LdiSelf => {
                let id = instance_number(self.executor.self_id);
                self.executor.push(id);
            }
            Opcode::LdiOther => {
                let id = instance_number(self.executor.other_id);
                self.executor.push(id);
            }
            Opcode::LdiArr => {
                let mut array = Value::Undefined;
                array.array_ensure(self.gc.as_mut(), None);
                self.executor.push(array);
            }

            // arithmetic
            Opcode::Inc => self.executor.top_mut()?.add_assign(&ONE)?,
            Opcode::Dec => self.executor.top_mut()?.sub_assign(&ONE)?,
            Opcode::Incl => {
                let index = self.executor.pc.read_u32()?;
                self.executor.local(index)?.add_assign(&ONE)?;
            }
            Opcode::Decl => {
                let index = self.executor.pc.read_u32()?;
                self.executor.local(index)?.sub_assign(&ONE)?;
            }
            Opcode::Add2 => self.binary(Value::add_assign)?,
            Opcode::Sub2 => self.binary(Value::sub_assign)?,
            Opcode::Mult2 => self.binary(Value::mul_assign)?,
            Opcode::Fdiv2 => self.binary(Value::div_assign)?,
            Opcode::Idiv2 => self.binary(Value::idiv_assign)?,
            Opcode::Mod2 => self.binary(Value::rem_assign)?,
            Opcode::Lsh2 => self.binary(Value::shl_assign)?,
            Opcode::Rsh2 => self.binary(Value::shr_assign)?,

            // comparison
            Opcode::Gt => self.compare(|a, b| a.gt(b))?,
            Opcode::Lt => self.compare(|a, b| a.lt(b))?,
            Opcode::Gte => self.compare(|a, b| a.ge(b))?,
            Opcode::Lte => self.compare(|a, b| a.le(b))?,
            Opcode::Eq => self.compare(|a, b| Ok(a == b))?,
            Opcode::Neq => self.compare(|a, b| Ok(a != b))?,

            // logic
            Opcode::Bland => self.logical(|a, b| a && b)?,
            Opcode::Blor => self.logical(|a, b| a || b)?,
            Opcode::Blxor => self.logical(|a, b| a != b)?,
            Opcode::Band => self.binary(Value::bitand_assign)?,
            Opcode::Bor => self.binary(Value::bitor_assign)?,
            Opcode::Bxor => self.binary(Value::bitxor_assign)?,
            Opcode::Bnot => self.executor.top_mut()?.invert()?,

            // status flags
            Opcode::Cond => self.executor.status_cond = self.executor.pop()?.cond()?,
            Opcode::Ncond => self.executor.status_cond = !self.executor.pop()?.cond()?,
            Opcode::Pcond => {
                let flag = self.executor.status_cond;
                self.executor.push(Value::Bool(flag));
            }
            Opcode::Sfx => self.executor.status_cow = false,
            Opcode::Ufx => self.executor.status_cow = true,

            // locals
            Opcode::All => {
                let count = self.executor.pc.read_u32()? as usize;
                let ex = &mut self.executor;
                ex.push(Value::UInt64(ex.locals_start as u64));
                ex.locals_start = ex.stack.len();
                ex.stack.resize(ex.locals_start + count, Value::Undefined);
            }
            Opcode::Stl => {
                let index = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                *self.executor.local(index)? = value;
            }
            Opcode::Ldl => {
                let index = self.executor.pc.read_u32()?;
                let value = self.executor.local(index)?.clone();
                self.executor.push(value);
            }

            // instance and global variables
            Opcode::Sts => {
                let id = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let target = self.owner_target(SELF);
                self.store_variable(target, id, value)?;
            }
            Opcode::Lds => {
                let id = self.executor.pc.read_u32()?;
                let target = self.owner_target(SELF);
                let value = self.load_variable(target, id)?;
                self.executor.push(value);
            }
            Opcode::Sto => {
                let id = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let target = self.pop_owner()?;
                self.store_variable(target, id, value)?;
            }
            Opcode::Ldo => {
                let id = self.executor.pc.read_u32()?;
                let target = self.pop_owner()?;
                let value = self.load_variable(target, id)?;
                self.executor.push(value);
            }
            Opcode::Stg => {
                let id = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                self.store_variable(OwnerTarget::Global, id, value)?;
            }
            Opcode::Ldg => {
                let id = self.executor.pc.read_u32()?;
                let value = self.load_variable(OwnerTarget::Global, id)?;
                self.executor.push(value);
            }
            Opcode::Stt => {
                let id = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let target = self.owner_target(SELF);
                self.store_builtin(target, id, None, value)?;
            }
            Opcode::Ldt => {
                let id = self.executor.pc.read_u32()?;
                let target = self.owner_target(SELF);
                let value = self.load_builtin(target, id, None)?;
                self.executor.push(value);
            }
            Opcode::Stp => {
                let id = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let target = self.pop_owner()?;
                self.store_builtin(target, id, None, value)?;
            }
            Opcode::Ldp => {
                let id = self.executor.pc.read_u32()?;
                let target = self.pop_owner()?;
                let value = self.load_builtin(target, id, None)?;
                self.executor.push(value);
            }

            // array cells
            Opcode::Stla => {
                let index = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let (row, col) = self.pop_row_col()?;
                let copy = self.executor.status_cow;
                self.executor
                    .local(index)?
                    .array_store(row, col, value, copy, self.gc.as_mut(), None);
            }
            Opcode::Ldla => {
                let index = self.executor.pc.read_u32()?;
                let (row, col) = self.pop_row_col()?;
                let value = self.executor.local(index)?.array_at(row, col)?;
                self.executor.push(value);
            }
            Opcode::Stsa => {
                let id = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let (row, col) = self.pop_row_col()?;
                let target = self.owner_target(SELF);
                self.store_variable_cell(target, id, &[(row, col)], value)?;
            }
            Opcode::Ldsa => {
                let id = self.executor.pc.read_u32()?;
                let (row, col) = self.pop_row_col()?;
                let target = self.owner_target(SELF);
                let value = self.load_variable(target, id)?.array_at(row, col)?;
                self.executor.push(value);
            }
            Opcode::Stoa => {
                let id = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let target = self.pop_owner()?;
                let (row, col) = self.pop_row_col()?;
                self.store_variable_cell(target, id, &[(row, col)], value)?;
            }
            Opcode::Ldoa => {
                let id = self.executor.pc.read_u32()?;
                let target = self.pop_owner()?;
                let (row, col) = self.pop_row_col()?;
                let value = self.load_variable(target, id)?.array_at(row, col)?;
                self.executor.push(value);
            }
            Opcode::Stga => {
                let id = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let (row, col) = self.pop_row_col()?;
                self.store_variable_cell(OwnerTarget::Global, id, &[(row, col)], value)?;
            }
            Opcode::Ldga => {
                let id = self.executor.pc.read_u32()?;
                let (row, col) = self.pop_row_col()?;
                let value = self.load_variable(OwnerTarget::Global, id)?.array_at(row, col)?;
                self.executor.push(value);
            }
            Opcode::Stpa => {
                let id = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let target = self.pop_owner()?;
                let cell = self.pop_row_col()?;
                self.store_builtin(target, id, Some(cell), value)?;
            }
            Opcode::Ldpa => {
                let id = self.executor.pc.read_u32()?;
                let target = self.pop_owner()?;
                let cell = self.pop_row_col()?;
                let value = self.load_builtin(target, id, Some(cell))?;
                self.executor.push(value);
            }

            // nested array cells
            Opcode::Stlax => {
                let index = self.executor.pc.read_u32()?;
                let depth = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let indices = self.pop_indices(depth)?;
                let copy = self.executor.status_cow;
                self.executor.local(index)?.array_store_nested(
                    &indices,
                    value,
                    copy,
                    self.gc.as_mut(),
                    None,
                );
            }
            Opcode::Ldlax => {
                let index = self.executor.pc.read_u32()?;
                let depth = self.executor.pc.read_u32()?;
                let indices = self.pop_indices(depth)?;
                let value = self.executor.local(index)?.array_at_nested(&indices)?;
                self.executor.push(value);
            }
            Opcode::Stoax => {
                let id = self.executor.pc.read_u32()?;
                let depth = self.executor.pc.read_u32()?;
                let value = self.executor.pop()?;
                let target = self.pop_owner()?;
                let indices = self.pop_indices(depth)?;
                self.store_variable_cell(target, id, &indices, value)?;
            }
            Opcode::Ldoax => {
                let id = self.executor.pc.read_u32()?;
                let depth = self.executor.pc.read_u32()?;
                let target = self.pop_owner()?;
                let indices = self.pop_indices(depth)?;
                let value = self.load_variable(target, id)?.array_at_nested(&indices)?;
                self.executor.push(value);
            }

            // stack manipulation
            Opcode::Pop => {
                self.executor.pop()?;
            }
            Opcode::Dup => self.dup(1)?,
            Opcode::Dup2 => self.dup(2)?,
            Opcode::Dup3 => self.dup(3)?,
            Opcode::Dupn => {
                let count = self.executor.pc.read_u8()?;
                self.dup(count as usize)?;
            }
            Opcode::Dupi => {
                let depth = self.executor.pc.read_u8()?;
                let value = self.executor.peek(depth as usize)?.clone();
                self.executor.push(value);
            }
            Opcode::Deli => {
                let depth = self.executor.pc.read_u8()? as usize;
                self.executor.peek(depth)?;
                let index = self.executor.stack.len() - 1 - depth;
                self.executor.stack.remove(index);
            }
            Opcode::Swap => {
                self.executor.peek(1)?;
                let len = self.executor.stack.len();
                self.executor.stack.swap(len - 1, len - 2);
            }

            Opcode::Nat => {
                let index = self.executor.pc.read_u32()?;
                let arity = self.executor.pc.read_i8()?;
                self.call_native(index, arity)?;
            }

            // with-iteration
            Opcode::Wti => {
                let target = self.pop_owner()?;
                let ex = &mut self.executor;
                ex.with_iterators.push(WithIterator::from_target(target));
                let index = ex.with_iterators.len() - 1;
                ex.push_self(ex.self_id);
                ex.push(Value::UInt64(index as u64));
            }
            Opcode::Wty => {
                let index: usize = self.executor.peek(0)?.cast_exact()?;
                let ex = &mut self.executor;
                let iterator = ex
                    .with_iterators
                    .get_mut(index)
                    .ok_or_else(|| VmError::misc(format!("No with-iterator at index {index}")))?;
                match iterator.current() {
                    Some(id) => {
                        iterator.advance();
                        ex.self_id = Some(id);
                        ex.status_cond = false;
                    }
                    None => {
                        ex.pop()?;
                        ex.pop_self()?;
                        ex.with_iterators.pop();
                        ex.status_cond = true;
                    }
                }
            }
            Opcode::Wtd => {
                let ex = &mut self.executor;
                ex.pop()?;
                ex.pop_self()?;
                ex.with_iterators.pop();
            }

            // control flow
            Opcode::Jmp => {
                let target = self.executor.pc.read_i32()?;
                self.executor.pc.seek(target)?;
            }
            Opcode::Bcond => {
                let target = self.executor.pc.read_i32()?;
                if self.executor.status_cond {
                    self.executor.pc.seek(target)?;
                }
            }
            Opcode::Call => {
                let section = self.executor.pc.read_u32()?;
                let argc = self.executor.pc.read_u8()?;
                check_argc(self.bytecode.get(section)?, argc as usize)?;
                self.executor.push(Value::Int32(argc as i32));
                self.enter_section(section)?;
                if self.run()? {
                    return Err(VmError::misc("Cannot suspend inside a nested call").into());
                }
            }
            Opcode::Ret => {
                let retc = self.executor.pc.read_u8()?;
                self.ret(retc as usize)?;
                return Ok(Flow::Return);
            }
            Opcode::Sus => {
                if self.run_depth > 1 {
                    return Err(VmError::misc("Cannot suspend inside a nested call").into());
                }
                tracing::debug!(pc = ?self.executor.pc, "suspended");
                return Ok(Flow::Suspend);
            }
            Opcode::Nop => {}
            Opcode::Eof => return Err(VmError::misc("Execution reached end of unit").into()),
        }
        Ok(Flow::Continue)
    }

    fn binary(&mut self, op: fn(&mut Value, &Value) -> Result<()>) -> Result<()> {
        let rhs = self.executor.pop()?;
        op(self.executor.top_mut()?, &rhs)
    }

    fn compare(&mut self, op: impl FnOnce(&Value, &Value) -> Result<bool>) -> Result<()> {
        let rhs = self.executor.pop()?;
        let lhs = self.executor.pop()?;
        self.executor.status_cond = op(&lhs, &rhs)?;
        Ok(())
    }

    fn logical(&mut self, op: impl FnOnce(bool, bool) -> bool) -> Result<()> {
        let rhs = self.executor.pop()?.cond()?;
        let lhs = self.executor.pop()?.cond()?;
        self.executor.push(Value::Bool(op(lhs, rhs)));
        Ok(())
    }

    fn dup(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        self.executor.peek(count - 1)?;
        let start = self.executor.stack.len() - count;
        self.executor.stack.extend_from_within(start..);
        Ok(())
    }

    fn ret(&mut self, retc: usize) -> Result<()> {
        let ex = &mut self.executor;
        let len = ex.stack.len();
        if len < ex.locals_start + retc {
            return Err(VmError::misc("Operand stack underflow"));
        }
        let results: SmallVec<[Value; 2]> = ex.stack.drain(len - retc..).collect();
        ex.stack.truncate(ex.locals_start);
        ex.locals_start = ex.pop()?.cast_exact()?;
        let argc: usize = ex.pop()?.cast_exact()?;
        let base = ex
            .stack
            .len()
            .checked_sub(argc)
            .ok_or_else(|| VmError::misc("Operand stack underflow"))?;
        ex.stack.truncate(base);
        ex.stack.extend(results);
        ex.pc = ex
            .return_addresses
            .pop()
            .ok_or_else(|| VmError::misc("Return without a caller"))?;
        tracing::debug!(depth = ex.depth(), "return from section");
        Ok(())
    }

    fn call_native(&mut self, index: u32, arity: i8) -> Result<()> {
        let entry = self.natives.get(index)?.clone();
        if entry.function.arity() != arity {
            return Err(VmError::misc(format!(
                "Native {} has arity {} but was called with {}",
                entry.name,
                entry.function.arity(),
                arity
            )));
        }
        let argc = match arity {
            VARIADIC => self.executor.pop()?.cast_exact::<usize>()?,
            VOID_UNARY => 1,
            fixed => fixed as usize,
        };
        let len = self.executor.stack.len();
        let start = len
            .checked_sub(argc)
            .ok_or_else(|| VmError::misc("Operand stack underflow"))?;
        let args: SmallVec<[Value; 8]> = self.executor.stack.drain(start..).collect();
        if let Some(result) = entry.function.invoke(self, &args)? {
            self.executor.push(result);
        }
        Ok(())
    }

    fn pop_row_col(&mut self) -> Result<(usize, usize)> {
        let col: i32 = self.executor.pop()?.cast_coerce()?;
        let row: i32 = self.executor.pop()?.cast_coerce()?;
        match (usize::try_from(row), usize::try_from(col)) {
            (Ok(row), Ok(col)) => Ok((row, col)),
            _ => Err(VmError::misc(format!("Invalid array index {row},{col}"))),
        }
    }

    /// Pop `depth + 1` index pairs; the first popped addresses the
    /// outermost array
    fn pop_indices(&mut self, depth: u32) -> Result<Indices> {
        (0..=depth).map(|_| self.pop_row_col()).collect()
    }

    /// Resolve a dynamic owner id
    pub(crate) fn owner_target(&self, id: i64) -> OwnerTarget {
        let single = |id: Option<InstanceId>| id.map_or(OwnerTarget::Noone, OwnerTarget::Single);
        match id {
            SELF => single(self.executor.self_id),
            OTHER => single(self.executor.other_id),
            ALL => OwnerTarget::Multi(self.frame.all_instances()),
            NOONE => OwnerTarget::Noone,
            GLOBAL => OwnerTarget::Global,
            id if id >= 0 => self.frame.resolve_owner(id),
            _ => OwnerTarget::Noone,
        }
    }

    fn pop_owner(&mut self) -> Result<OwnerTarget> {
        let id: i64 = self.executor.pop()?.cast_coerce()?;
        Ok(self.owner_target(id))
    }

    fn store_variable(&mut self, target: OwnerTarget, id: VariableId, value: Value) -> Result<()> {
        match target {
            OwnerTarget::Noone => Ok(()),
            OwnerTarget::Global => {
                store_owned(self.gc.as_mut(), self.frame.global(id), None, value);
                Ok(())
            }
            OwnerTarget::Single(instance) => self.store_instance_variable(instance, id, value),
            OwnerTarget::Multi(instances) => instances
                .into_iter()
                .try_for_each(|instance| self.store_instance_variable(instance, id, value.clone())),
        }
    }

    fn store_instance_variable(&mut self, instance: InstanceId, id: VariableId, value: Value) -> Result<()> {
        let target = self
            .frame
            .instance(instance)
            .ok_or_else(|| missing_instance(instance))?;
        let owner = target.gc_node();
        store_owned(self.gc.as_mut(), target.variable(id), owner, value);
        Ok(())
    }

    fn store_variable_cell(
        &mut self,
        target: OwnerTarget,
        id: VariableId,
        indices: &[(usize, usize)],
        value: Value,
    ) -> Result<()> {
        let copy = self.executor.status_cow;
        let instances = match target {
            OwnerTarget::Noone => return Ok(()),
            OwnerTarget::Global => {
                store_owned_cell(self.gc.as_mut(), self.frame.global(id), None, indices, value, copy);
                return Ok(());
            }
            OwnerTarget::Single(instance) => vec![instance],
            OwnerTarget::Multi(instances) => instances,
        };
        for instance in instances {
            let target = self
                .frame
                .instance(instance)
                .ok_or_else(|| missing_instance(instance))?;
            let owner = target.gc_node();
            store_owned_cell(self.gc.as_mut(), target.variable(id), owner, indices, value.clone(), copy);
        }
        Ok(())
    }

    fn load_variable(&mut self, target: OwnerTarget, id: VariableId) -> Result<Value> {
        let instance = match target {
            OwnerTarget::Noone => return Err(no_instance()),
            OwnerTarget::Global => return Ok(self.frame.global(id).clone()),
            OwnerTarget::Single(instance) => instance,
            OwnerTarget::Multi(instances) => *instances
                .first()
                .ok_or_else(|| VmError::misc("No instances to read value from."))?,
        };
        self.frame
            .instance(instance)
            .ok_or_else(no_instance)?
            .find_variable(id)
            .cloned()
            .ok_or_else(|| unset_variable(id))
    }

    fn store_builtin(
        &mut self,
        target: OwnerTarget,
        id: VariableId,
        cell: Option<(usize, usize)>,
        value: Value,
    ) -> Result<()> {
        let instances = match target {
            OwnerTarget::Noone => return Ok(()),
            OwnerTarget::Global => return Err(global_builtin(id)),
            OwnerTarget::Single(instance) => vec![instance],
            OwnerTarget::Multi(instances) => instances,
        };
        for instance in instances {
            let target = self
                .frame
                .instance(instance)
                .ok_or_else(|| missing_instance(instance))?;
            match cell {
                Some((row, col)) => target.set_value_array(id, row, col, value.clone())?,
                None => target.set_value(id, value.clone())?,
            }
        }
        Ok(())
    }

    fn load_builtin(
        &mut self,
        target: OwnerTarget,
        id: VariableId,
        cell: Option<(usize, usize)>,
    ) -> Result<Value> {
        let instance = match target {
            OwnerTarget::Noone => return Err(no_instance()),
            OwnerTarget::Global => return Err(global_builtin(id)),
            OwnerTarget::Single(instance) => instance,
            OwnerTarget::Multi(instances) => *instances
                .first()
                .ok_or_else(|| VmError::misc("No instances to read value from."))?,
        };
        let target = self.frame.instance(instance).ok_or_else(no_instance)?;
        match cell {
            Some((row, col)) => target.get_value_array(id, row, col),
            None => target.get_value(id),
        }
    }
}

/// `self`/`other` as pushed by `ldi_self`/`ldi_other`
fn instance_number(id: Option<InstanceId>) -> Value {
    Value::Real(id.map_or(NOONE as f64, |id| id.0 as f64))
}
