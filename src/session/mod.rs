//! # Session Metadata
//!
//! Every capture embeds a YAML-like text block describing the session. This
//! module reduces it to a [`SessionContext`]: track, car, driver, weather and
//! the sector layout used for split timing.
//!
//! ## Parsing Strategy
//!
//! ```text
//! metadata text ──► serde_yaml_ng ──► SessionMetadata ──┐
//!        │               (error)                        ├──► SessionContext
//!        └─────────────► line scanner ──────────────────┘
//! ```
//!
//! The typed path picks the driver whose `CarIdx` equals `DriverCarIdx`. The
//! scanner takes the first occurrence of each key. Anything missing is
//! `"Unknown"`, precipitation defaults to 0.
//!
//! ```rust
//! use pitlog::session::parse_metadata;
//!
//! let text = "WeekendInfo:\n TrackDisplayName: Spa\n TrackPrecipitation: 20 %\n";
//! let context = parse_metadata(Some(text));
//! assert_eq!(context.track, "Spa");
//! assert!(context.is_wet());
//! assert_eq!(context.car, "Unknown");
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod driver;
pub mod scan;
pub mod timing;
pub mod weekend;

pub use driver::{Driver, DriverInfo};
pub use scan::{ScannedMetadata, scan_metadata};
pub use timing::{Sector, SplitTimeInfo};
pub use weekend::WeekendInfo;

const UNKNOWN: &str = "Unknown";

/// Typed view of the parts of the metadata document we read
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct SessionMetadata {
    /// Weekend and track information
    pub weekend_info: WeekendInfo,
    /// Driver information
    pub driver_info: DriverInfo,
    /// Split timing information
    pub split_time_info: SplitTimeInfo,
}

impl SessionMetadata {
    /// Deserialize cleaned metadata text.
    pub fn parse(yaml: &str) -> crate::Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| {
            crate::TelemetryError::malformed("Session metadata deserialization", e.to_string())
        })
    }
}

/// Descriptive context of one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub track: String,
    pub track_short: String,
    pub car: String,
    pub driver: String,
    /// Integer precipitation percentage
    pub precipitation: i32,
    pub skies: String,
    /// Sector start fractions, first is normally 0.0
    pub sector_starts: Vec<f64>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            track: UNKNOWN.to_string(),
            track_short: UNKNOWN.to_string(),
            car: UNKNOWN.to_string(),
            driver: UNKNOWN.to_string(),
            precipitation: 0,
            skies: UNKNOWN.to_string(),
            sector_starts: Vec::new(),
        }
    }
}

impl SessionContext {
    /// Any precipitation marks the session as wet.
    pub fn is_wet(&self) -> bool {
        self.precipitation > 0
    }

    pub fn sector_count(&self) -> usize {
        self.sector_starts.len()
    }

    fn from_typed(metadata: &SessionMetadata) -> Self {
        let weekend = &metadata.weekend_info;
        let player = metadata.driver_info.player();

        Self {
            track: or_unknown(weekend.track_display_name.as_deref()),
            track_short: or_unknown(weekend.track_display_short_name.as_deref()),
            car: or_unknown(player.and_then(|d| d.car_screen_name.as_deref())),
            driver: or_unknown(player.and_then(|d| d.user_name.as_deref())),
            precipitation: weekend.precipitation_percent(),
            skies: or_unknown(weekend.track_skies.as_deref()),
            sector_starts: metadata.split_time_info.sector_starts(),
        }
    }

    fn from_scanned(scanned: ScannedMetadata) -> Self {
        Self {
            track: or_unknown(scanned.track_display_name.as_deref()),
            track_short: or_unknown(scanned.track_display_short_name.as_deref()),
            car: or_unknown(scanned.car_screen_name.as_deref()),
            driver: or_unknown(scanned.user_name.as_deref()),
            precipitation: scanned
                .track_precipitation
                .as_deref()
                .map_or(0, weekend::leading_integer),
            skies: or_unknown(scanned.track_skies.as_deref()),
            sector_starts: scanned.sector_starts,
        }
    }
}

/// Build a [`SessionContext`] from cleaned metadata text.
///
/// Never fails: text that does not deserialize goes through the line scanner,
/// and a capture without metadata gets the all-unknown context.
pub fn parse_metadata(text: Option<&str>) -> SessionContext {
    let Some(text) = text else {
        debug!("Capture has no metadata block");
        return SessionContext::default();
    };

    match SessionMetadata::parse(text) {
        Ok(metadata) => SessionContext::from_typed(&metadata),
        Err(e) => {
            debug!("Metadata is not valid YAML, scanning lines instead: {}", e);
            SessionContext::from_scanned(scan_metadata(text))
        }
    }
}

fn or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}
