//! Native function table
//!
//! A `nat` instruction names an entry by index and states the arity it was
//! compiled against. Fixed arities take their operands by position, the
//! first argument being the deepest on the stack.

use std::fmt;
use std::rc::Rc;

use bytecode_system::NativeNames;
use core_types::{Result, Value, VmError};

use crate::frame::Frame;
use crate::vm::Vm;

/// Call-site arity of a variadic native; the count is the top operand
pub const VARIADIC: i8 = -1;
/// Call-site arity of a one-argument native returning nothing
pub const VOID_UNARY: i8 = -2;

macro_rules! native_arg {
    ($arg:ident) => {
        &Value
    };
}

macro_rules! one {
    ($arg:ident) => {
        1
    };
}

macro_rules! native_fns {
    ($($variant:ident => [$($arg:ident),*]),* $(,)?) => {
        /// Function pointer for a native, tagged with its arity
        pub enum NativeFn<F: Frame> {
            $(
                #[allow(missing_docs)]
                $variant(fn(&mut Vm<F>, $(native_arg!($arg)),*) -> Result<Value>),
            )*
            /// Any number of arguments, first argument first
            Variadic(fn(&mut Vm<F>, &[Value]) -> Result<Value>),
            /// One argument, no result
            Void1(fn(&mut Vm<F>, &Value) -> Result<()>),
        }

        impl<F: Frame> NativeFn<F> {
            /// Arity as encoded at `nat` call sites
            pub fn arity(&self) -> i8 {
                match self {
                    $(NativeFn::$variant(_) => 0 $(+ one!($arg))*,)*
                    NativeFn::Variadic(_) => VARIADIC,
                    NativeFn::Void1(_) => VOID_UNARY,
                }
            }

            /// Call with `args`; `None` for natives without a result
            pub fn invoke(self, vm: &mut Vm<F>, args: &[Value]) -> Result<Option<Value>> {
                match (self, args) {
                    $(
                        (NativeFn::$variant(f), [$($arg),*]) => f(vm, $($arg),*).map(Some),
                    )*
                    (NativeFn::Variadic(f), args) => f(vm, args).map(Some),
                    (NativeFn::Void1(f), [arg]) => f(vm, arg).map(|()| None),
                    (native, args) => Err(VmError::misc(format!(
                        "Native of arity {} given {} arguments",
                        native.arity(),
                        args.len()
                    ))),
                }
            }
        }
    };
}

native_fns! {
    Arity0 => [],
    Arity1 => [a0],
    Arity2 => [a0, a1],
    Arity3 => [a0, a1, a2],
    Arity4 => [a0, a1, a2, a3],
    Arity5 => [a0, a1, a2, a3, a4],
    Arity6 => [a0, a1, a2, a3, a4, a5],
    Arity7 => [a0, a1, a2, a3, a4, a5, a6],
    Arity8 => [a0, a1, a2, a3, a4, a5, a6, a7],
    Arity9 => [a0, a1, a2, a3, a4, a5, a6, a7, a8],
    Arity10 => [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9],
    Arity11 => [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10],
    Arity12 => [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11],
    Arity13 => [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12],
    Arity14 => [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13],
    Arity15 => [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14],
    Arity16 => [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14, a15],
}

impl<F: Frame> Clone for NativeFn<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: Frame> Copy for NativeFn<F> {}

impl<F: Frame> fmt::Debug for NativeFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn(arity {})", self.arity())
    }
}

/// A named native
pub struct NativeEntry<F: Frame> {
    /// Display name
    pub name: Rc<str>,
    /// Implementation
    pub function: NativeFn<F>,
}

impl<F: Frame> Clone for NativeEntry<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            function: self.function,
        }
    }
}

/// Natives addressable from `nat` instructions
pub struct NativeTable<F: Frame> {
    entries: Vec<NativeEntry<F>>,
}

impl<F: Frame> NativeTable<F> {
    /// Empty table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a native and return its index
    pub fn register(&mut self, name: impl AsRef<str>, function: NativeFn<F>) -> u32 {
        self.entries.push(NativeEntry {
            name: Rc::from(name.as_ref()),
            function,
        });
        (self.entries.len() - 1) as u32
    }

    /// Entry at `index`
    pub fn get(&self, index: u32) -> Result<&NativeEntry<F>> {
        self.entries
            .get(index as usize)
            .ok_or_else(|| VmError::misc(format!("No native function with index {index}")))
    }

    /// Index of the native called `name`
    pub fn find(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .position(|entry| &*entry.name == name)
            .map(|index| index as u32)
    }

    /// Number of natives
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: Frame> Default for NativeTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Frame> fmt::Debug for NativeTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| &*entry.name))
            .finish()
    }
}

impl<F: Frame> NativeNames for NativeTable<F> {
    fn native_name(&self, index: u32) -> Option<&str> {
        self.entries.get(index as usize).map(|entry| &*entry.name)
    }
}
