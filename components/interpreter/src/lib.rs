//! Bytecode interpreter
//!
//! This crate drives execution of [`bytecode_system`] sections over
//! [`core_types`] values:
//! - A single operand stack holding arguments, locals and temporaries
//! - An opcode dispatch loop with call, return and suspension
//! - Instance and global variable access through a host [`Frame`]
//! - Native function calls by table index
//! - With-iteration over instance sets
//! - Optional debugger hooks and line stepping
//! - Garbage collection of arrays reachable from the stack and host
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Assembler, Opcode};
//! use core_types::Value;
//! use interpreter::{BasicFrame, Execution, Vm};
//!
//! let mut asm = Assembler::named("add");
//! asm.op_u32(Opcode::All, 0);
//! asm.ldi_s32(40).ldi_s32(2).op(Opcode::Add2).ret(1);
//!
//! let mut vm = Vm::new(BasicFrame::new());
//! let index = vm.add_bytecode(asm.finish(1, Some(0)).unwrap());
//!
//! match vm.call_bytecode(index, &[]).unwrap() {
//!     Execution::Finished(values) => assert_eq!(values, vec![Value::Int32(42)]),
//!     Execution::Suspended => unreachable!(),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod debugger;
mod dispatch;
pub mod error;
pub mod executor;
pub mod frame;
pub mod host;
pub mod native;
pub mod vm;
pub mod with_iterator;

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

// Re-export main types at crate root
pub use config::VmConfig;
pub use debugger::{Debugger, StepIntent, StepTracker};
pub use error::{format_trace, ExecutionError, TraceEntry};
pub use executor::{Executor, HOST_SECTION};
pub use frame::{
    Frame, Instance, InstanceId, OwnerTarget, VariableId, ALL, GLOBAL, NOONE, OTHER, SELF,
};
pub use host::{BasicFrame, BasicInstance, FIRST_INSTANCE_ID};
pub use native::{NativeEntry, NativeFn, NativeTable, VARIADIC, VOID_UNARY};
pub use vm::{Execution, Vm};
pub use with_iterator::WithIterator;

static TRACING: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset or a subscriber is already
/// installed. Safe to call repeatedly.
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .try_init();
    });
}
