//! Opcode numbering and operand layouts
//!
//! Every instruction is one opcode byte followed by the inline operands listed
//! by [`Opcode::operands`]. Opcodes are numbered densely from zero in
//! declaration order.

use crate::error::BytecodeError;

/// Kind of one inline operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Unsigned byte
    U8,
    /// Signed byte
    I8,
    /// Little-endian u32
    U32,
    /// Little-endian i32
    I32,
    /// Little-endian u64
    U64,
    /// Native-endian f32
    F32,
    /// Native-endian f64
    F64,
    /// NUL-terminated UTF-8 string
    Str,
    /// Absolute branch target (little-endian i32)
    Address,
    /// Native table index (little-endian u32)
    Native,
    /// Bytecode section index (little-endian u32)
    Section,
}

impl Operand {
    /// Encoded width in bytes, `None` for variable-length strings
    pub fn width(self) -> Option<usize> {
        match self {
            Operand::U8 | Operand::I8 => Some(1),
            Operand::U32
            | Operand::I32
            | Operand::F32
            | Operand::Address
            | Operand::Native
            | Operand::Section => Some(4),
            Operand::U64 | Operand::F64 => Some(8),
            Operand::Str => None,
        }
    }
}

macro_rules! opcodes {
    ($($(#[$doc:meta])* $name:ident = $mnemonic:literal [$($operand:ident),*];)*) => {
        /// Instruction opcodes
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($(#[$doc])* $name,)*
        }

        impl Opcode {
            /// Every opcode, indexed by its byte value
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name,)*];

            /// Assembly mnemonic
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => $mnemonic,)*
                }
            }

            /// Inline operands following the opcode byte
            pub fn operands(self) -> &'static [Operand] {
                match self {
                    $(Opcode::$name => &[$(Operand::$operand),*],)*
                }
            }
        }
    };
}

opcodes! {
    /// Push `false`
    LdiFalse = "ldi_false" [];
    /// Push `true`
    LdiTrue = "ldi_true" [];
    /// Push undefined
    LdiUndef = "ldi_undef" [];
    /// Push an f32 immediate as a real
    LdiF32 = "ldi_f32" [F32];
    /// Push an f64 immediate
    LdiF64 = "ldi_f64" [F64];
    /// Push an i32 immediate
    LdiS32 = "ldi_s32" [I32];
    /// Push a u64 immediate
    LdiU64 = "ldi_u64" [U64];
    /// Push a string immediate
    LdiString = "ldi_string" [Str];
    /// Push real zero
    LdiZero = "ldi_zero" [];
    /// Push the id of `self`
    LdiSelf = "ldi_self" [];
    /// Push the id of `other`
    LdiOther = "ldi_other" [];
    /// Push a fresh empty array
    LdiArr = "ldi_arr" [];
    /// Increment the top of stack
    Inc = "inc" [];
    /// Decrement the top of stack
    Dec = "dec" [];
    /// Increment a local
    Incl = "incl" [U32];
    /// Decrement a local
    Decl = "decl" [U32];
    /// `a + b`
    Add2 = "add2" [];
    /// `a - b`
    Sub2 = "sub2" [];
    /// `a * b`
    Mult2 = "mult2" [];
    /// `a / b`
    Fdiv2 = "fdiv2" [];
    /// `a div b`
    Idiv2 = "idiv2" [];
    /// `a % b`
    Mod2 = "mod2" [];
    /// `a << b`
    Lsh2 = "lsh2" [];
    /// `a >> b`
    Rsh2 = "rsh2" [];
    /// Condition flag := `a > b`
    Gt = "gt" [];
    /// Condition flag := `a < b`
    Lt = "lt" [];
    /// Condition flag := `a >= b`
    Gte = "gte" [];
    /// Condition flag := `a <= b`
    Lte = "lte" [];
    /// Condition flag := `a == b`
    Eq = "eq" [];
    /// Condition flag := `a != b`
    Neq = "neq" [];
    /// Push `a && b`
    Bland = "bland" [];
    /// Push `a || b`
    Blor = "blor" [];
    /// Push `a ^^ b`
    Blxor = "blxor" [];
    /// `a & b`
    Band = "band" [];
    /// `a | b`
    Bor = "bor" [];
    /// `a ^ b`
    Bxor = "bxor" [];
    /// `~a`
    Bnot = "bnot" [];
    /// Condition flag := truth of the popped value
    Cond = "cond" [];
    /// Condition flag := falsity of the popped value
    Ncond = "ncond" [];
    /// Push the condition flag
    Pcond = "pcond" [];
    /// Array stores write through shared data
    Sfx = "sfx" [];
    /// Array stores copy shared data first
    Ufx = "ufx" [];
    /// Allocate locals
    All = "all" [U32];
    /// Store local
    Stl = "stl" [U32];
    /// Load local
    Ldl = "ldl" [U32];
    /// Store field of self
    Sts = "sts" [U32];
    /// Load field of self
    Lds = "lds" [U32];
    /// Store field of the owner id below the value
    Sto = "sto" [U32];
    /// Load field of the popped owner id
    Ldo = "ldo" [U32];
    /// Store global
    Stg = "stg" [U32];
    /// Load global
    Ldg = "ldg" [U32];
    /// Store built-in property of self
    Stt = "stt" [U32];
    /// Load built-in property of self
    Ldt = "ldt" [U32];
    /// Store built-in property of an owner id
    Stp = "stp" [U32];
    /// Load built-in property of an owner id
    Ldp = "ldp" [U32];
    /// Store into a local array
    Stla = "stla" [U32];
    /// Load from a local array
    Ldla = "ldla" [U32];
    /// Store into an array field of self
    Stsa = "stsa" [U32];
    /// Load from an array field of self
    Ldsa = "ldsa" [U32];
    /// Store into an array field of an owner id
    Stoa = "stoa" [U32];
    /// Load from an array field of an owner id
    Ldoa = "ldoa" [U32];
    /// Store into a global array
    Stga = "stga" [U32];
    /// Load from a global array
    Ldga = "ldga" [U32];
    /// Store into a built-in array property of an owner id
    Stpa = "stpa" [U32];
    /// Load from a built-in array property of an owner id
    Ldpa = "ldpa" [U32];
    /// Store into a nested local array
    Stlax = "stlax" [U32, U32];
    /// Load from a nested local array
    Ldlax = "ldlax" [U32, U32];
    /// Store into a nested array field of an owner id
    Stoax = "stoax" [U32, U32];
    /// Load from a nested array field of an owner id
    Ldoax = "ldoax" [U32, U32];
    /// Discard the top of stack
    Pop = "pop" [];
    /// Duplicate the top value
    Dup = "dup" [];
    /// Duplicate the top two values
    Dup2 = "dup2" [];
    /// Duplicate the top three values
    Dup3 = "dup3" [];
    /// Duplicate the top n values
    Dupn = "dupn" [U8];
    /// Push a copy of the value n below the top
    Dupi = "dupi" [U8];
    /// Remove the value n below the top
    Deli = "deli" [U8];
    /// Swap the top two values
    Swap = "swap" [];
    /// Call a native function
    Nat = "nat" [Native, I8];
    /// Enter a with-iteration over the popped owner id
    Wti = "wti" [];
    /// Advance the innermost with-iteration
    Wty = "wty" [];
    /// Abandon the innermost with-iteration
    Wtd = "wtd" [];
    /// Jump
    Jmp = "jmp" [Address];
    /// Jump when the condition flag is set
    Bcond = "bcond" [Address];
    /// Call a bytecode section
    Call = "call" [Section, U8];
    /// Return from the current section
    Ret = "ret" [U8];
    /// Suspend execution
    Sus = "sus" [];
    /// Do nothing
    Nop = "nop" [];
    /// End of section
    Eof = "eof" [];
}

impl Opcode {
    /// Decode an opcode byte
    pub fn from_u8(byte: u8) -> Option<Opcode> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Whether execution never falls through to the next instruction
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Ret | Opcode::Eof)
    }

    /// Whether the instruction transfers control to a branch target
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Bcond)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = BytecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::from_u8(byte).ok_or(BytecodeError::UnknownOpcode { byte, address: None })
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
