//! Telemetry variable type definitions

use serde::{Deserialize, Serialize};

/// Scalar channel types decoded from IBT samples.
/// Maps to the subset of the SDK's irsdk_VarType enum used for lap timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    /// 32-bit signed integer (irsdk_int)
    Int32,
    /// 32-bit floating point (irsdk_float)
    Float32,
    /// 64-bit floating point (irsdk_double)
    Float64,
}

impl VariableType {
    /// Map an on-disk type tag to a decodable type.
    ///
    /// Chars, bools and bitfields are not needed for timing and yield `None`.
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            2 => Some(VariableType::Int32),
            4 => Some(VariableType::Float32),
            5 => Some(VariableType::Float64),
            _ => None,
        }
    }

    /// Returns the size in bytes of this data type.
    pub const fn size(&self) -> usize {
        match self {
            VariableType::Int32 | VariableType::Float32 => 4,
            VariableType::Float64 => 8,
        }
    }
}

/// A single decoded channel value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int32(i32),
    Float32(f32),
    Float64(f64),
}

impl Value {
    /// Widen to f64 without loss.
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int32(v) => v as f64,
            Value::Float32(v) => v as f64,
            Value::Float64(v) => v,
        }
    }

    /// Integer view; floats truncate toward zero (saturating at the i32 range).
    pub fn as_i32(self) -> i32 {
        match self {
            Value::Int32(v) => v,
            Value::Float32(v) => v as i32,
            Value::Float64(v) => v as i32,
        }
    }
}
