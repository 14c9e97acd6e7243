//! Text listing of a bytecode section

use std::fmt::Write as _;

use crate::bytecode::Bytecode;
use crate::error::BytecodeError;
use crate::instruction::{Immediate, Instruction};
use crate::stream::BytecodeStream;

/// Lookup of native function names for `nat` call sites
pub trait NativeNames {
    /// Display name of the native at `index`
    fn native_name(&self, index: u32) -> Option<&str>;
}

impl NativeNames for [&str] {
    fn native_name(&self, index: u32) -> Option<&str> {
        self.get(index as usize).copied()
    }
}

impl<const N: usize> NativeNames for [&str; N] {
    fn native_name(&self, index: u32) -> Option<&str> {
        self.as_slice().native_name(index)
    }
}

impl NativeNames for Vec<String> {
    fn native_name(&self, index: u32) -> Option<&str> {
        self.get(index as usize).map(String::as_str)
    }
}

fn render(instruction: &Instruction, natives: &(impl NativeNames + ?Sized)) -> String {
    let mut line = format!("{:>4}: {}", instruction.address, instruction.opcode);
    for immediate in &instruction.immediates {
        let _ = match immediate {
            Immediate::Native(index) => match natives.native_name(*index) {
                Some(name) => write!(line, " {name}"),
                None => write!(line, " {immediate}"),
            },
            other => write!(line, " {other}"),
        };
    }
    line
}

/// Render `bytecode` one instruction per line as `address: mnemonic operands`.
///
/// # Errors
///
/// Decoding errors from malformed code.
///
/// # Examples
///
/// ```
/// use bytecode_system::{disassemble, Assembler, Opcode};
///
/// let mut asm = Assembler::new();
/// asm.ldi_s32(3).nat(0, 1).ret(1);
/// let bc = asm.finish(1, Some(0)).unwrap();
/// let text = disassemble(&bc, &["sqrt"]).unwrap();
/// assert_eq!(text, "   0: ldi_s32 3\n   5: nat sqrt 1\n  11: ret 1\n");
/// ```
pub fn disassemble(
    bytecode: &Bytecode,
    natives: &(impl NativeNames + ?Sized),
) -> Result<String, BytecodeError> {
    let mut out = String::new();
    for instruction in Instruction::decode_all(BytecodeStream::new(bytecode.clone()))? {
        out.push_str(&render(&instruction, natives));
        out.push('\n');
    }
    Ok(out)
}

/// Render the single instruction at `address`
pub fn disassemble_at(
    bytecode: &Bytecode,
    address: usize,
    natives: &(impl NativeNames + ?Sized),
) -> Result<String, BytecodeError> {
    let mut stream = BytecodeStream::at(bytecode.clone(), address);
    Ok(render(&Instruction::decode(&mut stream)?, natives))
}
