//! Bit-exact persistence codec for values.
//!
//! Layout: one tag byte, then the tag's payload. Every scalar tag, undefined
//! included, carries one 8-byte slot.
//!
//! | Tag | Kind | Payload |
//! |---|---|---|
//! | 0 | undefined | 8 bytes, zero |
//! | 1 | bool | 8 bytes LE (0 or 1) |
//! | 2 | int | 8 bytes LE, sign-extended |
//! | 3 | uint64 | 8 bytes LE |
//! | 4 | real | 8 bytes LE IEEE bits |
//! | 5 | string | u64 LE length + UTF-8 bytes |
//! | 6 | array | canary, u64 height, per row u64 length + cells, canary |
//! | 7 | pointer | 8 bytes LE address |
//!
//! Canaries bracket array payloads so that a desynchronised stream is
//! detected instead of misread. Decoding rejects arrays nested deeper than
//! [`MAX_ARRAY_NESTING`].

use std::io::{Read, Write};

use memory_manager::Collector;

use crate::array::ArrayHandle;
use crate::error::{Result, VmError};
use crate::value::{Pointer, Value};

/// Marker written before an array's dimensions
pub const ARRAY_OPEN_CANARY: u64 = 0xDEAD_BEEF_AE1D_5A5A;
/// Marker written after an array's last cell
pub const ARRAY_CLOSE_CANARY: u64 = 0xF4DB_EED1_3A1D_EAD7;

/// Deepest array nesting accepted by [`Value::deserialize`]
pub const MAX_ARRAY_NESTING: usize = 256;

const TAG_UNDEFINED: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_UINT64: u8 = 3;
const TAG_REAL: u8 = 4;
const TAG_STRING: u8 = 5;
const TAG_ARRAY: u8 = 6;
const TAG_POINTER: u8 = 7;

fn io_error(err: std::io::Error) -> VmError {
    VmError::misc(format!("Value stream error: {err}"))
}

fn write_tag(out: &mut impl Write, tag: u8) -> Result<()> {
    out.write_all(&[tag]).map_err(io_error)
}

fn write_u64(out: &mut impl Write, n: u64) -> Result<()> {
    out.write_all(&n.to_le_bytes()).map_err(io_error)
}

fn read_u64(input: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf).map_err(io_error)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_len(input: &mut impl Read) -> Result<usize> {
    let n = read_u64(input)?;
    usize::try_from(n).map_err(|_| VmError::misc(format!("Serialized length {n} too large")))
}

fn expect_canary(input: &mut impl Read, expected: u64) -> Result<()> {
    let found = read_u64(input)?;
    if found != expected {
        return Err(VmError::misc(format!(
            "Array canary mismatch: expected {expected:#018x}, found {found:#018x}"
        )));
    }
    Ok(())
}

impl Value {
    /// Write this value to `out`
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// let mut buf = Vec::new();
    /// Value::Int32(-2).serialize(&mut buf).unwrap();
    /// assert_eq!(buf[0], 2);
    /// assert_eq!(Value::deserialize(&mut buf.as_slice(), None).unwrap(), Value::Int32(-2));
    /// ```
    pub fn serialize(&self, out: &mut impl Write) -> Result<()> {
        match self {
            Value::Undefined => {
                write_tag(out, TAG_UNDEFINED)?;
                write_u64(out, 0)
            }
            Value::Bool(b) => {
                write_tag(out, TAG_BOOL)?;
                write_u64(out, *b as u64)
            }
            Value::Int32(i) => {
                write_tag(out, TAG_INT)?;
                write_u64(out, *i as i64 as u64)
            }
            Value::UInt64(u) => {
                write_tag(out, TAG_UINT64)?;
                write_u64(out, *u)
            }
            Value::Real(r) => {
                write_tag(out, TAG_REAL)?;
                write_u64(out, r.to_bits())
            }
            Value::String(s) => {
                write_tag(out, TAG_STRING)?;
                write_u64(out, s.len() as u64)?;
                out.write_all(s.as_bytes()).map_err(io_error)
            }
            Value::Pointer(p) => {
                write_tag(out, TAG_POINTER)?;
                write_u64(out, p.0 as u64)
            }
            Value::Array(handle) => {
                write_tag(out, TAG_ARRAY)?;
                write_u64(out, ARRAY_OPEN_CANARY)?;
                match handle.data() {
                    None => write_u64(out, 0)?,
                    Some(data) => {
                        write_u64(out, data.height() as u64)?;
                        for row in data.rows() {
                            write_u64(out, row.len() as u64)?;
                            for cell in row {
                                cell.serialize(out)?;
                            }
                        }
                    }
                }
                write_u64(out, ARRAY_CLOSE_CANARY)
            }
        }
    }

    /// Read one value from `input`.
    ///
    /// Arrays are registered with `gc` when one is given.
    ///
    /// # Errors
    ///
    /// `Misc` on an unknown tag, a canary mismatch, invalid UTF-8,
    /// truncated input or arrays nested past [`MAX_ARRAY_NESTING`].
    pub fn deserialize(input: &mut impl Read, gc: Option<&mut Collector>) -> Result<Value> {
        Self::deserialize_at(input, gc, 0)
    }

    fn deserialize_at(
        input: &mut impl Read,
        mut gc: Option<&mut Collector>,
        depth: usize,
    ) -> Result<Value> {
        let mut tag = [0u8; 1];
        input.read_exact(&mut tag).map_err(io_error)?;
        Ok(match tag[0] {
            TAG_UNDEFINED => {
                read_u64(input)?;
                Value::Undefined
            }
            TAG_BOOL => Value::Bool(read_u64(input)? != 0),
            TAG_INT => Value::Int32(read_u64(input)? as i64 as i32),
            TAG_UINT64 => Value::UInt64(read_u64(input)?),
            TAG_REAL => Value::Real(f64::from_bits(read_u64(input)?)),
            TAG_STRING => {
                let len = read_len(input)?;
                let mut bytes = Vec::new();
                input
                    .by_ref()
                    .take(len as u64)
                    .read_to_end(&mut bytes)
                    .map_err(io_error)?;
                if bytes.len() != len {
                    return Err(VmError::misc("Truncated string in value stream"));
                }
                let s = String::from_utf8(bytes)
                    .map_err(|_| VmError::misc("Invalid UTF-8 in serialized string"))?;
                Value::from(s)
            }
            TAG_POINTER => Value::Pointer(Pointer(read_u64(input)? as usize)),
            TAG_ARRAY => {
                if depth >= MAX_ARRAY_NESTING {
                    return Err(VmError::misc("Serialized array nesting too deep"));
                }
                expect_canary(input, ARRAY_OPEN_CANARY)?;
                let height = read_len(input)?;
                let mut rows = Vec::new();
                for _ in 0..height {
                    let len = read_len(input)?;
                    let mut row = Vec::new();
                    for _ in 0..len {
                        row.push(Value::deserialize_at(input, gc.as_deref_mut(), depth + 1)?);
                    }
                    rows.push(row);
                }
                expect_canary(input, ARRAY_CLOSE_CANARY)?;
                Value::Array(ArrayHandle::from_rows(rows, gc))
            }
            other => return Err(VmError::misc(format!("Unknown value tag {other}"))),
        })
    }
}
