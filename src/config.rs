//! Configuration for configuration-driven machines
//!
//! State tables can be described in JSON instead of being assembled in code.
//! Handlers are referenced by name and resolved against a
//! [`HandlerRegistry`](crate::fsm::HandlerRegistry) when the table is built.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::streaming::DEFAULT_CAPACITY;

/// Machine configuration
#[derive(Clone, Debug, Deserialize)]
pub struct MachineConfig {
    /// State the machine starts in
    pub initial_state: String,

    /// Outgoing transitions per state, in declaration order
    #[serde(default)]
    pub states: HashMap<String, Vec<TransitionConfig>>,

    /// Read window size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Whether to log every state switch at debug level
    #[serde(default)]
    pub log_transitions: bool,
}

/// One outgoing transition
#[derive(Clone, Debug, Deserialize)]
pub struct TransitionConfig {
    /// Destination state
    pub target: String,

    /// Byte sequence triggering the switch (must not be empty)
    pub trigger: String,

    #[serde(default)]
    pub delimiters: DelimiterConfig,

    /// Ignore triggers preceded by an odd run of `\`
    #[serde(default)]
    pub escape: bool,

    /// Registered handler name; pass-through when absent
    #[serde(default)]
    pub handler: Option<String>,
}

/// Allowed bytes around a trigger, empty means unconstrained
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DelimiterConfig {
    #[serde(default)]
    pub left: String,
    #[serde(default)]
    pub right: String,
}

fn default_buffer_size() -> usize {
    DEFAULT_CAPACITY
}

impl MachineConfig {
    /// Parse configuration from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config_str = std::str::from_utf8(bytes).map_err(|e| ConfigError::InvalidUtf8(e.to_string()))?;

        serde_json::from_str(config_str).map_err(|e| ConfigError::InvalidJson(e.to_string()))
    }
}
