//! Analysis configuration
//!
//! Every threshold the analysis applies lives here with its default. A
//! configuration document is YAML; any field left out keeps its default.
//!
//! ```rust
//! use pitlog::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_yaml_str("workers: 8\nexclude_wet_sessions: false\n")?;
//! assert_eq!(config.workers, 8);
//! assert!(!config.exclude_wet_sessions);
//! assert_eq!(config.sector_validation.max_sector_time, 60.0);
//! # Ok::<(), pitlog::TelemetryError>(())
//! ```

use crate::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Files above this size are only estimated from a prefix.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Tunables for capture decoding, validation and aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Captures larger than this (bytes) take the estimated path
    pub max_file_size: u64,
    /// Bytes read from an oversized capture
    pub prefix_bytes: usize,
    /// Lap times at or above this (seconds) are ignored
    pub lap_time_ceiling: f64,
    /// Fraction above the best lap beyond which a lap is an outlier
    pub outlier_threshold: f64,
    /// Keep wet sessions out of lap statistics and global bests
    pub exclude_wet_sessions: bool,
    /// Concurrent decodes in [`BatchProcessor::process_concurrent`](crate::BatchProcessor::process_concurrent)
    pub workers: usize,
    pub channels: ChannelNames,
    pub sector_validation: SectorValidation,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            prefix_bytes: 500_000,
            lap_time_ceiling: 600.0,
            outlier_threshold: 0.15,
            exclude_wet_sessions: true,
            workers: 4,
            channels: ChannelNames::default(),
            sector_validation: SectorValidation::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a YAML document, filling omitted fields with defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| TelemetryError::Config { details: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TelemetryError::Config { details: "workers must be at least 1".into() });
        }
        if self.lap_time_ceiling <= 0.0 {
            return Err(TelemetryError::Config {
                details: format!("lap_time_ceiling must be positive, got {}", self.lap_time_ceiling),
            });
        }
        if self.outlier_threshold < 0.0 {
            return Err(TelemetryError::Config {
                details: format!(
                    "outlier_threshold cannot be negative, got {}",
                    self.outlier_threshold
                ),
            });
        }
        Ok(())
    }
}

/// Channel names looked up in the descriptor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelNames {
    pub lap: String,
    pub lap_dist_pct: String,
    pub current_lap_time: String,
    pub last_lap_time: String,
    pub best_lap_time: String,
    pub incident_count: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            lap: "Lap".to_string(),
            lap_dist_pct: "LapDistPct".to_string(),
            current_lap_time: "LapCurrentLapTime".to_string(),
            last_lap_time: "LapLastLapTime".to_string(),
            best_lap_time: "LapBestLapTime".to_string(),
            incident_count: "PlayerCarMyIncidentCount".to_string(),
        }
    }
}

/// Acceptance window for reconstructed sector sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorValidation {
    /// Exclusive lower bound on the reported and summed lap time
    pub min_lap_time: f64,
    /// Exclusive upper bound on the reported and summed lap time
    pub max_lap_time: f64,
    pub max_sector_time: f64,
    /// Sector floor for tracks with few sectors
    pub min_sector_time_few: f64,
    /// Sector floor for tracks with many sectors
    pub min_sector_time_many: f64,
    /// Sector counts up to this use `min_sector_time_few`
    pub few_sectors_threshold: usize,
    /// Largest accepted gap between summed sectors and the reported lap time
    pub sum_tolerance: f64,
}

impl Default for SectorValidation {
    fn default() -> Self {
        Self {
            min_lap_time: 75.0,
            max_lap_time: 130.0,
            max_sector_time: 60.0,
            min_sector_time_few: 20.0,
            min_sector_time_many: 14.0,
            few_sectors_threshold: 3,
            sum_tolerance: 0.5,
        }
    }
}

impl SectorValidation {
    /// Lower bound for a single sector on a track with `sector_count` sectors.
    pub fn min_sector_time(&self, sector_count: usize) -> f64 {
        if sector_count <= self.few_sectors_threshold {
            self.min_sector_time_few
        } else {
            self.min_sector_time_many
        }
    }

    pub fn lap_time_in_range(&self, seconds: f64) -> bool {
        seconds > self.min_lap_time && seconds < self.max_lap_time
    }
}
