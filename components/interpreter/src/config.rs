//! VM configuration

use serde::{Deserialize, Serialize};

/// Tunables for a [`Vm`](crate::Vm).
///
/// Missing fields take their defaults when loading from JSON.
///
/// # Examples
///
/// ```
/// use interpreter::VmConfig;
///
/// let config = VmConfig::from_json(r#"{ "max_call_depth": 64 }"#).unwrap();
/// assert_eq!(config.max_call_depth, 64);
/// assert!(config.copy_on_write);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Maximum nesting of bytecode calls
    pub max_call_depth: usize,
    /// Operand stack slots reserved up front
    pub initial_stack_capacity: usize,
    /// Track arrays in the garbage collector
    pub garbage_collection: bool,
    /// Log every dispatched instruction at trace level
    pub trace_dispatch: bool,
    /// Initial copy-on-write flag for array writes
    pub copy_on_write: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 4096,
            initial_stack_capacity: 1024,
            garbage_collection: true,
            trace_dispatch: false,
            copy_on_write: true,
        }
    }
}

impl VmConfig {
    /// Parse a JSON configuration object
    ///
    /// # Errors
    ///
    /// Malformed JSON or fields of the wrong type.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
