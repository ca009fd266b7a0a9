//! Core types for decoded telemetry channels.
//!
//! - [`VariableType`] maps the on-disk type tag to the scalar types used for timing
//! - [`VariableSchema`] is the per-capture name → [`VariableDescriptor`] table
//! - [`SampleAccessor`] decodes a descriptor at a sample index, returning `None`
//!   for positions outside the buffer
//!
//! ```rust
//! use pitlog::types::{SampleAccessor, Value, VariableDescriptor, VariableType};
//!
//! let data = 4500.0f32.to_le_bytes();
//! let rpm = VariableDescriptor::new("RPM", VariableType::Float32, 0);
//! let accessor = SampleAccessor::new(&data, 0, 4, 1);
//!
//! assert_eq!(accessor.read(&rpm, 0), Some(Value::Float32(4500.0)));
//! assert_eq!(accessor.read(&rpm, 1), None);
//! ```

mod accessor;
mod schema;
mod variable_type;

pub use accessor::SampleAccessor;
pub use schema::{VariableDescriptor, VariableSchema};
pub use variable_type::{Value, VariableType};
