//! Bytecode format for the interpreter
//!
//! This crate defines the encoded instruction set the dispatch loop reads,
//! plus the tooling around it.
//!
//! # Features
//!
//! - Dense one-byte opcode numbering with per-opcode operand layouts
//! - Shared, cheaply cloned bytecode sections with debug symbols
//! - Seekable stream cursor used for program counters and return addresses
//! - Assembler with forward labels, and a disassembler
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Assembler, BytecodeStream, BytecodeTable, Opcode};
//!
//! let mut asm = Assembler::named("main");
//! asm.ldi_s32(40).ldi_s32(2).op(Opcode::Add2).ret(1);
//!
//! let mut table = BytecodeTable::new();
//! let index = table.add(asm.finish(1, Some(0)).unwrap());
//!
//! let mut stream = BytecodeStream::new(table.get(index).unwrap().clone());
//! assert_eq!(stream.read_opcode().unwrap(), Opcode::LdiS32);
//! assert_eq!(stream.read_i32().unwrap(), 40);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod assembler;
pub mod bytecode;
pub mod disassembler;
mod error;
pub mod instruction;
pub mod opcode;
pub mod stream;

pub use assembler::{Assembler, Label};
pub use bytecode::{Bytecode, BytecodeTable, DebugSymbols};
pub use disassembler::{disassemble, disassemble_at, NativeNames};
pub use error::BytecodeError;
pub use instruction::{Immediate, Instruction};
pub use opcode::{Opcode, Operand};
pub use stream::BytecodeStream;
