//! Telemetry variable schema types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::VariableType;

/// Name-indexed descriptor table for one capture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableSchema {
    /// Map of variable names to their descriptors (O(1) lookup)
    pub variables: HashMap<String, VariableDescriptor>,
    /// Bytes per sample
    pub sample_stride: usize,
}

impl VariableSchema {
    pub fn new(variables: HashMap<String, VariableDescriptor>, sample_stride: usize) -> Self {
        Self { variables, sample_stride }
    }

    /// Get variable descriptor by name.
    pub fn get_variable(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.get(name)
    }

    /// Check if a variable exists.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Get the number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Look up a variable that the caller cannot work without.
    pub fn require(&self, name: &str) -> crate::Result<&VariableDescriptor> {
        self.get_variable(name).ok_or_else(|| crate::TelemetryError::missing_variable(name))
    }
}

/// Information about a specific telemetry channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    /// Channel name as recorded by the simulator
    pub name: String,
    /// Scalar type of the channel
    pub data_type: VariableType,
    /// Byte offset within a sample
    pub offset: usize,
}

impl VariableDescriptor {
    pub fn new(name: impl Into<String>, data_type: VariableType, offset: usize) -> Self {
        Self { name: name.into(), data_type, offset }
    }
}
