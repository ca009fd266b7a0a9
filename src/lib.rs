//! Lap, sector and personal-best analysis for iRacing IBT telemetry captures.
//!
//! pitlog decodes recorded `.ibt` captures, rebuilds lap and sector times from
//! the raw sample stream and aggregates them across a history of sessions.
//!
//! # Features
//!
//! - **IBT decoding**: fixed-layout header, variable table and session metadata
//! - **Sector reconstruction**: crossings inferred from lap distance, with
//!   validation and incident exclusion
//! - **Purple sectors**: per-car personal-best sectors across captures
//! - **Statistics**: per-car and per-day medians, consistency and outlier filtering
//!
//! ## Example
//!
//! ```rust,no_run
//! use pitlog::{AnalysisConfig, BatchProcessor};
//! use std::path::PathBuf;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::load("pitlog.yaml")?;
//!     let paths = vec![PathBuf::from("captures/ferrari296gt3_monza 2024-09-13 11-43-43.ibt")];
//!
//!     let report = BatchProcessor::new(config).process_concurrent(&paths).await;
//!     println!("{}", report.to_yaml()?);
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;
mod yaml_utils;

// Capture decoding
pub mod config;
pub mod ibt;
pub mod session;
pub mod timestamp;

// Analysis and batch processing
pub mod analysis;
pub mod batch;
pub mod capture;
pub mod report;

// Core exports
pub use error::*;
pub use types::*;

pub use batch::BatchProcessor;
pub use capture::{
    CaptureOutcome, CaptureResult, EstimatedCapture, FailedCapture, analyze_capture,
    process_bytes, process_capture,
};
pub use config::{AnalysisConfig, ChannelNames, SectorValidation};
pub use ibt::{CapturePrefix, CaptureReader};
pub use report::{BatchReport, BestLap};
pub use session::{SessionContext, parse_metadata};
