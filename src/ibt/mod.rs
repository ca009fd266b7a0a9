//! IBT capture decoding
//!
//! [`format`] holds the fixed-offset header and descriptor table parsing,
//! [`reader`] loads captures (fully, or as a bounded prefix for oversized files).

pub mod format;
pub mod reader;

pub use format::{CaptureHeader, DiskSubHeader};
pub use reader::{CapturePrefix, CaptureReader};
