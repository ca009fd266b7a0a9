//! Lap, sector and statistics analysis
//!
//! - [`laps`]: lap segmentation from the lap counter
//! - [`sectors`]: sector reconstruction from lap distance, with validation
//! - [`purple`]: personal-best sector tracking, per capture and across captures
//! - [`stats`]: per-car and per-day aggregates
//! - [`format`]: display strings for lap times and durations

pub mod format;
pub mod laps;
pub mod purple;
pub mod sectors;
pub mod stats;

pub use format::{format_duration, format_lap_time, format_range};
pub use laps::{LapRecord, LapSegmenter, LapSummary, segment_laps};
pub use purple::{
    CarBestSectors, CarSectorBests, PurpleClassification, PurpleLap, PurpleReport, PurpleSession,
    PurpleTracker, SessionPurpleLap, detect_purple_laps,
};
pub use sectors::{SectorRejection, SectorReconstructor, SectorSample, SectorSet, reconstruct_sectors};
pub use stats::{
    AggregateReport, AggregateStats, CarStats, DailyKey, DailyStats, SessionObservation,
    StatisticsAggregator,
};
