//! Memory Manager - graph-tracing garbage collector
//!
//! This component provides:
//! - An arena of collectible nodes addressed by generational [`NodeId`]s
//! - Root anchoring and weighted reference edges maintained by owners
//! - Stop-the-world mark-sweep passes with two-phase reclamation
//! - An integrity check that cross-checks edges against payload contents
//!
//! The collector knows nothing about the payloads it tracks. Owners report
//! edges explicitly, which lets the same graph manage interpreter arrays,
//! host objects, or anything else implementing [`Collectible`].
//!
//! # Examples
//!
//! ```
//! use memory_manager::Collector;
//!
//! let mut gc = Collector::new();
//! let root = gc.construct_node_with(Box::new(|| {}), Box::new(|| {}));
//! let leaf = gc.construct_node_with(Box::new(|| {}), Box::new(|| {}));
//! gc.make_root(root);
//! gc.add_reference(Some(root), Some(leaf));
//!
//! assert_eq!(gc.process(), 0);
//! assert!(gc.contains(leaf));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
pub mod gc;
pub mod object;

pub use error::GcError;
pub use gc::{Collector, CollectorStats};
pub use object::{CallbackPayload, CleanupFn, Collectible, DeleteFn, NodeId};
