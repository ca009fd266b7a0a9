//! Single-capture processing
//!
//! [`process_capture`] runs one file end to end and always yields a
//! [`CaptureOutcome`]:
//!
//! - **Full**: laps, validated sector sets and capture-local purple laps
//! - **Estimated**: oversized file, only metadata and an estimated duration
//! - **Failed**: unreadable or malformed file, or missing lap channels. A
//!   missing channel still carries the session context and duration
//!
//! ```rust,no_run
//! use pitlog::{AnalysisConfig, CaptureOutcome, process_capture};
//!
//! let outcome = process_capture("session 2024-09-13 11-43-43.ibt", &AnalysisConfig::default());
//! match outcome {
//!     CaptureOutcome::Full(result) => println!("{} laps", result.laps.len()),
//!     CaptureOutcome::Estimated(estimate) => println!("~{}s", estimate.duration_seconds),
//!     CaptureOutcome::Failed(failure) => eprintln!("{}: {}", failure.file_name, failure.reason),
//! }
//! ```

use crate::analysis::{
    LapRecord, PurpleLap, SectorSet, SessionObservation, detect_purple_laps, format_duration,
    format_lap_time, reconstruct_sectors, segment_laps,
};
use crate::ibt::{CapturePrefix, CaptureReader};
use crate::session::{SessionContext, parse_metadata};
use crate::timestamp::capture_timestamp;
use crate::{AnalysisConfig, TelemetryError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of processing one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaptureOutcome {
    Full(CaptureResult),
    Estimated(EstimatedCapture),
    Failed(FailedCapture),
}

/// Fully analyzed capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub file_name: String,
    pub timestamp: Option<NaiveDateTime>,
    pub context: SessionContext,
    pub duration_seconds: f64,
    pub duration_formatted: String,
    pub laps: Vec<LapRecord>,
    pub best_lap_time: Option<f64>,
    pub best_lap_formatted: Option<String>,
    /// Validated sector sets keyed by lap number
    pub sector_sets: BTreeMap<i32, SectorSet>,
    /// Laps that set a capture-local best sector
    pub notable_laps: Vec<PurpleLap>,
    pub best_sectors: Vec<Option<f64>>,
    pub theoretical_best: Option<f64>,
}

/// Oversized capture described from its prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedCapture {
    pub file_name: String,
    pub timestamp: Option<NaiveDateTime>,
    pub context: SessionContext,
    pub file_size: u64,
    pub estimated_samples: u64,
    pub duration_seconds: f64,
    pub duration_formatted: String,
}

/// Capture that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedCapture {
    pub file_name: String,
    pub timestamp: Option<NaiveDateTime>,
    /// Error category, see [`TelemetryError::kind`]
    pub kind: String,
    pub reason: String,
    /// Present when the file decoded but lap channels were missing
    pub context: Option<SessionContext>,
    pub duration_seconds: Option<f64>,
}

impl CaptureOutcome {
    pub fn file_name(&self) -> &str {
        match self {
            CaptureOutcome::Full(result) => &result.file_name,
            CaptureOutcome::Estimated(estimate) => &estimate.file_name,
            CaptureOutcome::Failed(failure) => &failure.file_name,
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            CaptureOutcome::Full(result) => result.timestamp,
            CaptureOutcome::Estimated(estimate) => estimate.timestamp,
            CaptureOutcome::Failed(failure) => failure.timestamp,
        }
    }

    pub fn context(&self) -> Option<&SessionContext> {
        match self {
            CaptureOutcome::Full(result) => Some(&result.context),
            CaptureOutcome::Estimated(estimate) => Some(&estimate.context),
            CaptureOutcome::Failed(failure) => failure.context.as_ref(),
        }
    }

    /// Completed laps; empty for estimated and failed captures.
    pub fn laps(&self) -> &[LapRecord] {
        match self {
            CaptureOutcome::Full(result) => &result.laps,
            _ => &[],
        }
    }

    pub fn best_lap_time(&self) -> Option<f64> {
        match self {
            CaptureOutcome::Full(result) => result.best_lap_time,
            _ => None,
        }
    }

    /// Track time contributed to batch totals. Failed captures contribute none.
    pub fn track_time_seconds(&self) -> f64 {
        match self {
            CaptureOutcome::Full(result) => result.duration_seconds,
            CaptureOutcome::Estimated(estimate) => estimate.duration_seconds,
            CaptureOutcome::Failed(_) => 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CaptureOutcome::Failed(_))
    }

    /// View for the statistics aggregator; `None` for failed or undated captures.
    pub fn observation(&self) -> Option<SessionObservation<'_>> {
        if self.is_failed() {
            return None;
        }
        let date = self.timestamp()?.date();
        let context = self.context()?;
        Some(SessionObservation {
            date,
            car: &context.car,
            track: &context.track,
            is_wet: context.is_wet(),
            duration_seconds: self.track_time_seconds(),
            laps: self.laps(),
            best_lap_time: self.best_lap_time(),
        })
    }
}

/// Process one capture file.
///
/// Never fails: every error becomes a [`CaptureOutcome::Failed`].
pub fn process_capture<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> CaptureOutcome {
    let path = path.as_ref();
    let file_name = file_name_of(path);
    let name_timestamp = capture_timestamp(&file_name, None);

    let file_size = match std::fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            let error = TelemetryError::file_error(path.to_path_buf(), e);
            return failed(file_name, name_timestamp, &error);
        }
    };

    if file_size > config.max_file_size {
        info!(
            file = %file_name,
            file_size,
            limit = config.max_file_size,
            "Capture exceeds size limit, estimating from prefix"
        );
        return match CaptureReader::open_prefix(path, config.prefix_bytes) {
            Ok(prefix) => estimate_capture(&prefix, &file_name),
            Err(error) => failed(file_name, name_timestamp, &error),
        };
    }

    match CaptureReader::open(path) {
        Ok(reader) => analyze_capture(&reader, &file_name, config),
        Err(error) => failed(file_name, name_timestamp, &error),
    }
}

/// Process a capture already in memory.
pub fn process_bytes(data: Vec<u8>, file_name: &str, config: &AnalysisConfig) -> CaptureOutcome {
    let size = data.len() as u64;
    if size > config.max_file_size {
        let prefix_len = data.len().min(config.prefix_bytes);
        return match CapturePrefix::from_prefix(&data[..prefix_len], size, file_name.into()) {
            Ok(prefix) => estimate_capture(&prefix, file_name),
            Err(error) => failed(file_name.to_string(), capture_timestamp(file_name, None), &error),
        };
    }

    match CaptureReader::from_vec(data, file_name.into()) {
        Ok(reader) => analyze_capture(&reader, file_name, config),
        Err(error) => failed(file_name.to_string(), capture_timestamp(file_name, None), &error),
    }
}

/// Analyze a loaded capture.
pub fn analyze_capture(
    reader: &CaptureReader,
    file_name: &str,
    config: &AnalysisConfig,
) -> CaptureOutcome {
    let timestamp = capture_timestamp(file_name, reader.disk_header());
    let duration_seconds = reader.duration_seconds();

    let context = match reader.session_metadata() {
        Ok(text) => parse_metadata(text.as_deref()),
        Err(error) => return failed(file_name.to_string(), timestamp, &error),
    };

    let accessor = reader.accessor();
    let summary = match segment_laps(reader.variables(), &accessor, config) {
        Ok(summary) => summary,
        Err(error) => {
            warn!(file = file_name, %error, "Capture cannot be segmented into laps");
            return CaptureOutcome::Failed(FailedCapture {
                file_name: file_name.to_string(),
                timestamp,
                kind: error.kind().to_string(),
                reason: error.to_string(),
                context: Some(context),
                duration_seconds: Some(duration_seconds),
            });
        }
    };

    let sector_sets =
        reconstruct_sectors(reader.variables(), &accessor, &context.sector_starts, config);
    let (notable_laps, bests) = detect_purple_laps(&sector_sets, context.sector_count());

    debug!(
        file = file_name,
        laps = summary.lap_count(),
        sector_sets = sector_sets.len(),
        notable = notable_laps.len(),
        "Capture analyzed"
    );

    CaptureOutcome::Full(CaptureResult {
        file_name: file_name.to_string(),
        timestamp,
        duration_formatted: format_duration(duration_seconds),
        duration_seconds,
        best_lap_formatted: summary.best_lap_time.and_then(format_lap_time),
        best_lap_time: summary.best_lap_time,
        laps: summary.laps,
        theoretical_best: bests.theoretical_best(),
        best_sectors: bests.bests().to_vec(),
        sector_sets,
        notable_laps,
        context,
    })
}

fn estimate_capture(prefix: &CapturePrefix, file_name: &str) -> CaptureOutcome {
    let duration_seconds = prefix.estimated_duration_seconds();
    CaptureOutcome::Estimated(EstimatedCapture {
        file_name: file_name.to_string(),
        timestamp: capture_timestamp(file_name, prefix.disk_header()),
        context: parse_metadata(prefix.session_metadata()),
        file_size: prefix.file_len(),
        estimated_samples: prefix.estimated_samples(),
        duration_formatted: format_duration(duration_seconds),
        duration_seconds,
    })
}

fn failed(
    file_name: String,
    timestamp: Option<NaiveDateTime>,
    error: &TelemetryError,
) -> CaptureOutcome {
    warn!(file = %file_name, %error, "Capture failed");
    CaptureOutcome::Failed(FailedCapture {
        file_name,
        timestamp,
        kind: error.kind().to_string(),
        reason: error.to_string(),
        context: None,
        duration_seconds: None,
    })
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
