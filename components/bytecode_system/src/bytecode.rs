//! Bytecode sections and the table that indexes them

use std::fmt;
use std::rc::Rc;

use crate::error::BytecodeError;

/// Source positions of statement starts within one section.
///
/// Used by the debugger to map a program counter back to a line and to
/// recognise the first instruction of a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugSymbols {
    /// Source text the section was compiled from
    pub source: Option<Rc<str>>,
    statements: Vec<(usize, u32)>,
}

impl DebugSymbols {
    /// Empty symbol table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a statement on `line` begins at `address`.
    ///
    /// Addresses must be added in increasing order; a repeated address
    /// replaces the earlier line.
    pub fn add_statement(&mut self, address: usize, line: u32) {
        match self.statements.last_mut() {
            Some(last) if last.0 == address => last.1 = line,
            _ => self.statements.push((address, line)),
        }
    }

    /// Line of the statement containing `address`
    pub fn line_at(&self, address: usize) -> Option<u32> {
        let idx = self.statements.partition_point(|(a, _)| *a <= address);
        idx.checked_sub(1).map(|i| self.statements[i].1)
    }

    /// Whether a statement begins exactly at `address`
    pub fn is_statement_start(&self, address: usize) -> bool {
        self.statements
            .binary_search_by_key(&address, |(a, _)| *a)
            .is_ok()
    }

    /// Statement starts as `(address, line)` pairs
    pub fn statements(&self) -> &[(usize, u32)] {
        &self.statements
    }
}

/// One compiled section: code plus calling metadata.
///
/// Cloning is cheap; the code and symbols are shared.
#[derive(Clone, PartialEq)]
pub struct Bytecode {
    code: Rc<[u8]>,
    /// Number of values left on the stack by `ret`
    pub retc: u8,
    /// Declared argument count, `None` when variadic
    pub argc: Option<u8>,
    /// Display name used in stack traces
    pub name: Option<Rc<str>>,
    /// Statement positions, when compiled with symbols
    pub debug_symbols: Option<Rc<DebugSymbols>>,
}

impl Bytecode {
    /// Wrap raw code
    pub fn new(code: impl Into<Rc<[u8]>>, retc: u8, argc: Option<u8>) -> Self {
        Self {
            code: code.into(),
            retc,
            argc,
            name: None,
            debug_symbols: None,
        }
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Some(Rc::from(name.as_ref()));
        self
    }

    /// Attach debug symbols
    pub fn with_symbols(mut self, symbols: DebugSymbols) -> Self {
        self.debug_symbols = Some(Rc::new(symbols));
        self
    }

    /// Encoded instructions
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Length of the code in bytes
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether the section has no code
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Name for stack traces, `<anonymous>` when unnamed
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Whether both handles share the same code
    pub fn same_section(&self, other: &Bytecode) -> bool {
        Rc::ptr_eq(&self.code, &other.code)
    }

    /// Source line at `address`, when symbols are present
    pub fn line_at(&self, address: usize) -> Option<u32> {
        self.debug_symbols.as_ref()?.line_at(address)
    }
}

impl fmt::Debug for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bytecode")
            .field("name", &self.display_name())
            .field("len", &self.code.len())
            .field("retc", &self.retc)
            .field("argc", &self.argc)
            .finish()
    }
}

/// Bytecode sections addressed by index
#[derive(Debug, Clone, Default)]
pub struct BytecodeTable {
    sections: Vec<Option<Bytecode>>,
}

impl BytecodeTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section, returning its index
    pub fn add(&mut self, bytecode: Bytecode) -> u32 {
        self.sections.push(Some(bytecode));
        (self.sections.len() - 1) as u32
    }

    /// Place a section at `index`, replacing any previous one
    pub fn insert(&mut self, index: u32, bytecode: Bytecode) {
        let index = index as usize;
        if self.sections.len() <= index {
            self.sections.resize(index + 1, None);
        }
        self.sections[index] = Some(bytecode);
    }

    /// Section at `index`
    ///
    /// # Errors
    ///
    /// [`BytecodeError::NoSuchSection`] when nothing is registered there.
    pub fn get(&self, index: u32) -> Result<&Bytecode, BytecodeError> {
        self.sections
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(BytecodeError::NoSuchSection(index))
    }

    /// Whether a section is registered at `index`
    pub fn contains(&self, index: u32) -> bool {
        self.get(index).is_ok()
    }

    /// Number of slots, including empty ones
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether no slots exist
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
