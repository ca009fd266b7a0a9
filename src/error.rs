//! Error types for capture decoding and analysis.
//!
//! Every error is scoped to a single capture file. The batch driver turns an
//! error into a failed outcome for that file and keeps going, so nothing in
//! this module is ever retried or propagated across files.
//!
//! ## Error Categories
//!
//! - **File Errors**: the capture could not be opened or read
//! - **Malformed Captures**: header fields or offsets point outside the buffer
//! - **Missing Variables**: a channel required for lap timing is absent
//! - **Configuration Errors**: an analysis configuration document was rejected
//!
//! Values that cannot be decoded for a single sample are not errors at all;
//! the accessor reports them as `None`.
//!
//! ```rust
//! use pitlog::TelemetryError;
//!
//! let error = TelemetryError::malformed("Header", "sample stride must be positive");
//! assert!(error.is_malformed());
//! assert!(error.to_string().contains("sample stride"));
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for capture operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for capture operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("IBT file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed capture in {context}: {details}")]
    MalformedCapture { context: String, details: String },

    #[error("Required variable '{name}' not found in capture")]
    MissingVariable { name: String },

    #[error("Invalid analysis configuration: {details}")]
    Config { details: String },
}

impl TelemetryError {
    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for malformed capture errors.
    pub fn malformed(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::MalformedCapture { context: context.into(), details: details.into() }
    }

    /// Helper constructor for missing channel errors.
    pub fn missing_variable(name: impl Into<String>) -> Self {
        TelemetryError::MissingVariable { name: name.into() }
    }

    /// Returns true when the capture bytes themselves are unusable.
    pub fn is_malformed(&self) -> bool {
        matches!(self, TelemetryError::MalformedCapture { .. })
    }

    /// Short machine-friendly label for the failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryError::File { .. } => "file",
            TelemetryError::MalformedCapture { .. } => "malformed_capture",
            TelemetryError::MissingVariable { .. } => "missing_variable",
            TelemetryError::Config { .. } => "config",
        }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            context in "[A-Za-z ]{1,20}",
            details in ".*",
            name in "\\w+"
          ) {
            let malformed = TelemetryError::malformed(context.clone(), details.clone());
            let msg = malformed.to_string();
            prop_assert!(msg.contains(&context));
            prop_assert!(msg.contains(&details));

            let missing = TelemetryError::missing_variable(name.clone());
            prop_assert!(missing.to_string().contains(&name));
            prop_assert!(!missing.is_malformed());
          }

          #[test]
          fn io_conversion_preserves_the_source_message(reason in ".*") {
            let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, reason.clone());
            let converted: TelemetryError = io_err.into();
            match converted {
              TelemetryError::File { source, .. } => {
                prop_assert_eq!(source.to_string(), reason);
              }
              _ => prop_assert!(false, "Expected File error from io::Error conversion"),
            }
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();

        let error = TelemetryError::missing_variable("Lap");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn kinds_are_distinct() {
        let file = TelemetryError::file_error(
            PathBuf::from("/test.ibt"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let kinds = [
            file.kind(),
            TelemetryError::malformed("a", "b").kind(),
            TelemetryError::missing_variable("Lap").kind(),
            TelemetryError::Config { details: "x".into() }.kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
