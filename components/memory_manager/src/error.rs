//! Collector error types.

use thiserror::Error;

use crate::NodeId;

/// Failures reported by the collector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GcError {
    /// A recorded edge multiplicity disagrees with what the payload holds
    #[error(
        "Integrity check failed on node {node}: records {recorded} reference(s) to {target}, payload holds {observed}"
    )]
    IntegrityCheckFailed {
        /// Owner of the inconsistent edge
        node: NodeId,
        /// Target of the inconsistent edge
        target: NodeId,
        /// Multiplicity recorded by the collector
        recorded: u32,
        /// Multiplicity reported by the payload's trace
        observed: u32,
    },
}
