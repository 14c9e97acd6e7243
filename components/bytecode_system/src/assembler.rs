//! Bytecode builder with forward labels
//!
//! Hosts and tests use the assembler to produce sections without a compiler.
//! Branches to labels that are not yet bound are patched when the label is
//! bound.
//!
//! # Examples
//!
//! ```
//! use bytecode_system::{Assembler, Opcode};
//!
//! let mut asm = Assembler::new();
//! let done = asm.label();
//! asm.ldi_s32(1).op(Opcode::Cond).bcond(done);
//! asm.ldi_s32(2).op(Opcode::Pop);
//! asm.bind(done);
//! asm.op(Opcode::Eof);
//! let bytecode = asm.finish(0, Some(0)).unwrap();
//! assert_eq!(bytecode.len(), 18);
//! ```

use core_types::Value;

use crate::bytecode::{Bytecode, DebugSymbols};
use crate::error::BytecodeError;
use crate::opcode::{Opcode, Operand};

/// A branch target handed out by [`Assembler::label`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Incremental bytecode encoder
#[derive(Debug, Default)]
pub struct Assembler {
    code: Vec<u8>,
    labels: Vec<Option<usize>>,
    fixups: Vec<(usize, Label)>,
    symbols: DebugSymbols,
    name: Option<String>,
    error: Option<BytecodeError>,
}

impl Assembler {
    /// Empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty assembler for a named section
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Address the next instruction will occupy
    pub fn position(&self) -> usize {
        self.code.len()
    }

    /// Allocate an unbound label
    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the current position
    pub fn bind(&mut self, label: Label) -> &mut Self {
        self.labels[label.0] = Some(self.code.len());
        self
    }

    /// Allocate a label bound to the current position
    pub fn here(&mut self) -> Label {
        let label = self.label();
        self.bind(label);
        label
    }

    /// Mark the start of a statement on source `line`
    pub fn statement(&mut self, line: u32) -> &mut Self {
        self.symbols.add_statement(self.code.len(), line);
        self
    }

    fn opcode(&mut self, op: Opcode, layout: &[Operand]) {
        debug_assert_eq!(op.operands(), layout, "operand layout of {op}");
        self.code.push(op as u8);
    }

    fn fail(&mut self, err: BytecodeError) {
        self.error.get_or_insert(err);
    }

    /// Emit an instruction without operands
    pub fn op(&mut self, op: Opcode) -> &mut Self {
        self.opcode(op, &[]);
        self
    }

    /// Emit an instruction with one u32 operand (a local, variable id or count)
    pub fn op_u32(&mut self, op: Opcode, operand: u32) -> &mut Self {
        self.opcode(op, &[Operand::U32]);
        self.code.extend_from_slice(&operand.to_le_bytes());
        self
    }

    /// Emit a nested array accessor with its variable id and depth
    pub fn op_nested(&mut self, op: Opcode, id: u32, depth: u32) -> &mut Self {
        self.opcode(op, &[Operand::U32, Operand::U32]);
        self.code.extend_from_slice(&id.to_le_bytes());
        self.code.extend_from_slice(&depth.to_le_bytes());
        self
    }

    /// Emit an instruction with one byte operand (`dupn`, `dupi`, `deli`)
    pub fn op_u8(&mut self, op: Opcode, operand: u8) -> &mut Self {
        self.opcode(op, &[Operand::U8]);
        self.code.push(operand);
        self
    }

    /// `ldi_f32`
    pub fn ldi_f32(&mut self, value: f32) -> &mut Self {
        self.opcode(Opcode::LdiF32, &[Operand::F32]);
        self.code.extend_from_slice(&value.to_ne_bytes());
        self
    }

    /// `ldi_f64`
    pub fn ldi_f64(&mut self, value: f64) -> &mut Self {
        self.opcode(Opcode::LdiF64, &[Operand::F64]);
        self.code.extend_from_slice(&value.to_ne_bytes());
        self
    }

    /// `ldi_s32`
    pub fn ldi_s32(&mut self, value: i32) -> &mut Self {
        self.opcode(Opcode::LdiS32, &[Operand::I32]);
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// `ldi_u64`
    pub fn ldi_u64(&mut self, value: u64) -> &mut Self {
        self.opcode(Opcode::LdiU64, &[Operand::U64]);
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// `ldi_string`; a string containing NUL fails at [`Assembler::finish`]
    pub fn ldi_string(&mut self, value: &str) -> &mut Self {
        if value.contains('\0') {
            let address = self.code.len() + 1;
            self.fail(BytecodeError::InvalidString { address });
        }
        self.opcode(Opcode::LdiString, &[Operand::Str]);
        self.code.extend_from_slice(value.as_bytes());
        self.code.push(0);
        self
    }

    /// Push a constant value with the matching `ldi_*` instruction.
    ///
    /// Arrays and pointers have no immediate form and fail at
    /// [`Assembler::finish`].
    pub fn ldi(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::Undefined => self.op(Opcode::LdiUndef),
            Value::Bool(true) => self.op(Opcode::LdiTrue),
            Value::Bool(false) => self.op(Opcode::LdiFalse),
            Value::Int32(i) => self.ldi_s32(*i),
            Value::UInt64(u) => self.ldi_u64(*u),
            Value::Real(r) => self.ldi_f64(*r),
            Value::String(s) => self.ldi_string(s),
            Value::Array(_) | Value::Pointer(_) => {
                self.fail(BytecodeError::NoImmediate {
                    kind: value.kind().name(),
                });
                self
            }
        }
    }

    fn address_operand(&mut self, label: Label) {
        let target = self.labels[label.0];
        match target {
            Some(address) => self.code.extend_from_slice(&(address as i32).to_le_bytes()),
            None => {
                self.fixups.push((self.code.len(), label));
                self.code.extend_from_slice(&[0; 4]);
            }
        }
    }

    /// `jmp label`
    pub fn jmp(&mut self, label: Label) -> &mut Self {
        self.opcode(Opcode::Jmp, &[Operand::Address]);
        self.address_operand(label);
        self
    }

    /// `bcond label`
    pub fn bcond(&mut self, label: Label) -> &mut Self {
        self.opcode(Opcode::Bcond, &[Operand::Address]);
        self.address_operand(label);
        self
    }

    /// `nat index arity`
    pub fn nat(&mut self, index: u32, arity: i8) -> &mut Self {
        self.opcode(Opcode::Nat, &[Operand::Native, Operand::I8]);
        self.code.extend_from_slice(&index.to_le_bytes());
        self.code.push(arity as u8);
        self
    }

    /// `call section argc`
    pub fn call(&mut self, section: u32, argc: u8) -> &mut Self {
        self.opcode(Opcode::Call, &[Operand::Section, Operand::U8]);
        self.code.extend_from_slice(&section.to_le_bytes());
        self.code.push(argc);
        self
    }

    /// `ret retc`
    pub fn ret(&mut self, retc: u8) -> &mut Self {
        self.op_u8(Opcode::Ret, retc)
    }

    /// Resolve labels and produce the section.
    ///
    /// # Errors
    ///
    /// The first recorded encoding error, or [`BytecodeError::UnboundLabel`]
    /// for a branch to a label that was never bound.
    pub fn finish(mut self, retc: u8, argc: Option<u8>) -> Result<Bytecode, BytecodeError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        for (at, label) in std::mem::take(&mut self.fixups) {
            let address = self.labels[label.0].ok_or(BytecodeError::UnboundLabel(label.0))?;
            self.code[at..at + 4].copy_from_slice(&(address as i32).to_le_bytes());
        }

        let mut bytecode = Bytecode::new(self.code, retc, argc);
        if let Some(name) = self.name {
            bytecode = bytecode.with_name(name);
        }
        if !self.symbols.statements().is_empty() {
            bytecode = bytecode.with_symbols(self.symbols);
        }
        Ok(bytecode)
    }
}
