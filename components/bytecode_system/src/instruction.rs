//! Decoded instructions
//!
//! The dispatch loop reads operands straight from the stream; this form is
//! for tools (disassembler, debugger listings) that want whole instructions.

use std::fmt;

use crate::error::BytecodeError;
use crate::opcode::{Opcode, Operand};
use crate::stream::BytecodeStream;

/// One decoded operand value
#[derive(Debug, Clone, PartialEq)]
pub enum Immediate {
    /// Unsigned byte
    U8(u8),
    /// Signed byte
    I8(i8),
    /// 32-bit unsigned integer
    U32(u32),
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit unsigned integer
    U64(u64),
    /// Single-precision float
    F32(f32),
    /// Double-precision float
    F64(f64),
    /// Inline string
    Str(String),
    /// Branch target
    Address(i32),
    /// Native table index
    Native(u32),
    /// Bytecode section index
    Section(u32),
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::U8(n) => write!(f, "{n}"),
            Immediate::I8(n) => write!(f, "{n}"),
            Immediate::U32(n) => write!(f, "{n}"),
            Immediate::I32(n) => write!(f, "{n}"),
            Immediate::U64(n) => write!(f, "{n}"),
            Immediate::F32(r) => write!(f, "{r}"),
            Immediate::F64(r) => write!(f, "{r}"),
            Immediate::Str(s) => write!(f, "{s:?}"),
            Immediate::Address(a) => write!(f, "@{a}"),
            Immediate::Native(i) => write!(f, "native#{i}"),
            Immediate::Section(i) => write!(f, "#{i}"),
        }
    }
}

/// An opcode with its operands and address
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Address of the opcode byte
    pub address: usize,
    /// The opcode
    pub opcode: Opcode,
    /// Operands in encoding order
    pub immediates: Vec<Immediate>,
}

impl Instruction {
    /// Decode the instruction at the stream's position, advancing past it
    pub fn decode(stream: &mut BytecodeStream) -> Result<Self, BytecodeError> {
        let address = stream.position();
        let opcode = stream.read_opcode()?;
        let immediates = opcode
            .operands()
            .iter()
            .map(|operand| read_operand(stream, *operand))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            address,
            opcode,
            immediates,
        })
    }

    /// Decode every instruction in the section
    pub fn decode_all(mut stream: BytecodeStream) -> Result<Vec<Self>, BytecodeError> {
        let mut out = Vec::new();
        while !stream.at_end() {
            out.push(Self::decode(&mut stream)?);
        }
        Ok(out)
    }
}

fn read_operand(stream: &mut BytecodeStream, operand: Operand) -> Result<Immediate, BytecodeError> {
    Ok(match operand {
        Operand::U8 => Immediate::U8(stream.read_u8()?),
        Operand::I8 => Immediate::I8(stream.read_i8()?),
        Operand::U32 => Immediate::U32(stream.read_u32()?),
        Operand::I32 => Immediate::I32(stream.read_i32()?),
        Operand::U64 => Immediate::U64(stream.read_u64()?),
        Operand::F32 => Immediate::F32(stream.read_f32()?),
        Operand::F64 => Immediate::F64(stream.read_f64()?),
        Operand::Str => Immediate::Str(stream.read_string()?),
        Operand::Address => Immediate::Address(stream.read_i32()?),
        Operand::Native => Immediate::Native(stream.read_u32()?),
        Operand::Section => Immediate::Section(stream.read_u32()?),
    })
}
