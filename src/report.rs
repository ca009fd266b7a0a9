//! Batch report schema

use crate::analysis::{CarStats, DailyStats, PurpleReport};
use crate::capture::CaptureOutcome;
use serde::{Deserialize, Serialize};

/// Fastest lap over a batch and the capture it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestLap {
    pub time_seconds: f64,
    pub formatted: Option<String>,
    pub file_name: String,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Every processed path, failures included
    pub total_sessions: usize,
    pub total_laps: usize,
    /// Recorded or estimated time of non-failed captures
    pub total_track_time_seconds: f64,
    pub total_track_time_formatted: String,
    pub best_overall: Option<BestLap>,
    /// Sorted by session count, most driven car first
    pub car_stats: Vec<CarStats>,
    /// Sorted by date, then car
    pub daily_stats: Vec<DailyStats>,
    pub wet_sessions: usize,
    pub outliers_filtered: usize,
    /// Per-capture outcomes in chronological order
    pub sessions: Vec<CaptureOutcome>,
    pub purple: PurpleReport,
}

impl BatchReport {
    pub fn failed_sessions(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_failed()).count()
    }

    /// Render the report as YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_empty_report_renders() -> Result<()> {
        let report = BatchReport::default();
        let yaml = report.to_yaml()?;
        assert!(yaml.contains("total_sessions: 0"));
        assert!(yaml.contains("best_overall: null"));
        assert_eq!(report.failed_sessions(), 0);
        Ok(())
    }
}
