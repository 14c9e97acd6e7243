//! Seekable cursor over one bytecode section

use std::fmt;

use crate::bytecode::Bytecode;
use crate::error::BytecodeError;
use crate::opcode::Opcode;

/// Read position within a [`Bytecode`] section.
///
/// Cloning is cheap, which makes a stream usable as a saved return address.
#[derive(Clone)]
pub struct BytecodeStream {
    bytecode: Bytecode,
    pos: usize,
}

impl BytecodeStream {
    /// Cursor at the start of `bytecode`
    pub fn new(bytecode: Bytecode) -> Self {
        Self { bytecode, pos: 0 }
    }

    /// Cursor at `pos` within `bytecode`
    pub fn at(bytecode: Bytecode, pos: usize) -> Self {
        Self { bytecode, pos }
    }

    /// Section being read
    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    /// Current address
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether the cursor is past the last byte
    pub fn at_end(&self) -> bool {
        self.pos >= self.bytecode.len()
    }

    /// Move to an absolute branch target.
    ///
    /// # Errors
    ///
    /// [`BytecodeError::InvalidAddress`] when the target lies outside the
    /// section.
    pub fn seek(&mut self, target: i32) -> Result<(), BytecodeError> {
        let len = self.bytecode.len();
        match usize::try_from(target) {
            Ok(address) if address <= len => {
                self.pos = address;
                Ok(())
            }
            _ => Err(BytecodeError::InvalidAddress {
                target: target as i64,
                len,
            }),
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BytecodeError> {
        let end = self.pos + N;
        let bytes = self
            .bytecode
            .code()
            .get(self.pos..end)
            .ok_or(BytecodeError::UnexpectedEnd { address: self.pos })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    /// Read an opcode byte
    pub fn read_opcode(&mut self) -> Result<Opcode, BytecodeError> {
        let address = self.pos;
        let [byte] = self.read_array::<1>()?;
        Opcode::from_u8(byte).ok_or(BytecodeError::UnknownOpcode {
            byte,
            address: Some(address),
        })
    }

    /// Read a `u8`
    pub fn read_u8(&mut self) -> Result<u8, BytecodeError> {
        self.read_array::<1>().map(|[b]| b)
    }

    /// Read an `i8`
    pub fn read_i8(&mut self) -> Result<i8, BytecodeError> {
        self.read_array::<1>().map(|[b]| b as i8)
    }

    /// Read a little-endian `u32`
    pub fn read_u32(&mut self) -> Result<u32, BytecodeError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian `i32`
    pub fn read_i32(&mut self) -> Result<i32, BytecodeError> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Read a little-endian `u64`
    pub fn read_u64(&mut self) -> Result<u64, BytecodeError> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Read a native-endian `f32`
    pub fn read_f32(&mut self) -> Result<f32, BytecodeError> {
        self.read_array().map(f32::from_ne_bytes)
    }

    /// Read a native-endian `f64`
    pub fn read_f64(&mut self) -> Result<f64, BytecodeError> {
        self.read_array().map(f64::from_ne_bytes)
    }

    /// Read a NUL-terminated UTF-8 string
    pub fn read_string(&mut self) -> Result<String, BytecodeError> {
        let address = self.pos;
        let rest = self.bytecode.code().get(address..).unwrap_or_default();
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(BytecodeError::UnexpectedEnd { address })?;
        let s = std::str::from_utf8(&rest[..len])
            .map_err(|_| BytecodeError::InvalidString { address })?
            .to_owned();
        self.pos = address + len + 1;
        Ok(s)
    }
}

impl fmt::Debug for BytecodeStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.bytecode.display_name(), self.pos)
    }
}
