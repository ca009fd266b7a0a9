//! Lap segmentation
//!
//! Laps are closed when the `Lap` channel changes value. The time recorded
//! for the closing lap is the `LapLastLapTime` value on the first sample of
//! the following lap, so the lap still open when the capture ends has no
//! record.

use super::format::format_lap_time;
use crate::{AnalysisConfig, Result, SampleAccessor, VariableSchema};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// A completed lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap_number: i32,
    pub time_seconds: f64,
    pub time_formatted: Option<String>,
}

impl LapRecord {
    pub fn new(lap_number: i32, time_seconds: f64) -> Self {
        Self { lap_number, time_seconds, time_formatted: format_lap_time(time_seconds) }
    }
}

/// All completed laps of a capture and the session best.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapSummary {
    pub laps: Vec<LapRecord>,
    pub best_lap_time: Option<f64>,
}

impl LapSummary {
    pub fn lap_count(&self) -> usize {
        self.laps.len()
    }

    pub fn best_lap_formatted(&self) -> Option<String> {
        self.best_lap_time.and_then(format_lap_time)
    }
}

/// Incremental lap segmenter.
///
/// ```rust
/// use pitlog::analysis::LapSegmenter;
///
/// let mut laps = LapSegmenter::new(600.0);
/// laps.observe(Some(1), Some(0.0));
/// laps.observe(Some(2), Some(91.5));
/// laps.observe(Some(3), Some(90.8));
/// let summary = laps.finish(None);
/// assert_eq!(summary.lap_count(), 2);
/// assert_eq!(summary.best_lap_time, Some(90.8));
/// ```
#[derive(Debug, Clone)]
pub struct LapSegmenter {
    lap_time_ceiling: f64,
    previous_lap: Option<i32>,
    laps: Vec<LapRecord>,
    best: Option<f64>,
}

impl LapSegmenter {
    pub fn new(lap_time_ceiling: f64) -> Self {
        Self { lap_time_ceiling, previous_lap: None, laps: Vec::new(), best: None }
    }

    /// Feed one sample. Samples without a lap number are ignored.
    pub fn observe(&mut self, lap: Option<i32>, last_lap_time: Option<f64>) {
        let Some(lap) = lap else {
            return;
        };

        if let Some(previous) = self.previous_lap.filter(|&previous| previous != lap) {
            match last_lap_time {
                Some(time) if time > 0.0 && time < self.lap_time_ceiling => {
                    trace!(lap = previous, time, "Lap completed");
                    self.laps.push(LapRecord::new(previous, time));
                    if self.best.is_none_or(|best| time < best) {
                        self.best = Some(time);
                    }
                }
                other => trace!(lap = previous, ?other, "Lap closed without a usable time"),
            }
        }

        self.previous_lap = Some(lap);
    }

    /// Close the segmenter. `final_best` is the best-lap channel on the last sample.
    pub fn finish(self, final_best: Option<f64>) -> LapSummary {
        let mut best = self.best;
        if let Some(reported) = final_best {
            if reported > 0.0 && best.is_none_or(|current| reported < current) {
                debug!(reported, ?best, "Adopting best lap reported by the sim");
                best = Some(reported);
            }
        }
        LapSummary { laps: self.laps, best_lap_time: best }
    }
}

/// Segment every sample of a capture into laps.
///
/// Fails with [`MissingVariable`](crate::TelemetryError::MissingVariable)
/// when the lap or last-lap-time channel is absent.
pub fn segment_laps(
    schema: &VariableSchema,
    accessor: &SampleAccessor<'_>,
    config: &AnalysisConfig,
) -> Result<LapSummary> {
    let channels = &config.channels;
    let lap = schema.require(&channels.lap)?;
    let last_lap_time = schema.require(&channels.last_lap_time)?;
    let best_lap_time = schema.get_variable(&channels.best_lap_time);

    let mut segmenter = LapSegmenter::new(config.lap_time_ceiling);
    for index in 0..accessor.sample_count() {
        let lap_number = accessor.read_i32(Some(lap), index);
        let last = accessor.read_f64(Some(last_lap_time), index);
        segmenter.observe(lap_number, last);
    }

    let final_best = accessor
        .sample_count()
        .checked_sub(1)
        .and_then(|last| accessor.read_f64(best_lap_time, last));

    let summary = segmenter.finish(final_best);
    debug!(laps = summary.lap_count(), best = ?summary.best_lap_time, "Segmented laps");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TelemetryError;
    use crate::ibt::CaptureReader;
    use crate::test_utils::{CaptureBuilder, TimingSample};
    use anyhow::Result;

    #[test]
    fn test_lap_recorded_under_closing_number() {
        let mut laps = LapSegmenter::new(600.0);
        laps.observe(Some(4), Some(0.0));
        laps.observe(Some(4), Some(0.0));
        laps.observe(Some(5), Some(92.25));
        let summary = laps.finish(None);
        assert_eq!(summary.laps, vec![LapRecord::new(4, 92.25)]);
        assert_eq!(summary.laps[0].time_formatted.as_deref(), Some("1:32.250"));
    }

    #[test]
    fn test_out_of_range_times_are_not_recorded() {
        let mut laps = LapSegmenter::new(600.0);
        laps.observe(Some(0), None);
        laps.observe(Some(1), Some(-1.0));
        laps.observe(Some(2), Some(600.0));
        laps.observe(None, Some(95.0));
        laps.observe(Some(3), Some(0.0));
        let summary = laps.finish(None);
        assert!(summary.laps.is_empty());
        assert_eq!(summary.best_lap_time, None);
    }

    #[test]
    fn test_final_best_only_replaces_when_lower() {
        let mut laps = LapSegmenter::new(600.0);
        laps.observe(Some(1), None);
        laps.observe(Some(2), Some(91.0));
        let summary = laps.clone().finish(Some(92.0));
        assert_eq!(summary.best_lap_time, Some(91.0));
        let summary = laps.clone().finish(Some(-1.0));
        assert_eq!(summary.best_lap_time, Some(91.0));
        let summary = laps.finish(Some(90.5));
        assert_eq!(summary.best_lap_time, Some(90.5));

        let summary = LapSegmenter::new(600.0).finish(Some(88.0));
        assert_eq!(summary.best_lap_time, Some(88.0));
        assert_eq!(summary.lap_count(), 0);
    }

    #[test]
    fn test_segment_capture() -> Result<()> {
        let mut builder = CaptureBuilder::timing();
        builder.lap(1, &[30.0, 30.5, 30.0]).lap(2, &[29.5, 30.0, 30.0]).lap(3, &[31.0, 31.0, 31.0]);
        builder.finish();
        let reader = CaptureReader::from_bytes(&builder.build())?;

        let summary = segment_laps(reader.variables(), &reader.accessor(), &AnalysisConfig::default())?;
        let numbers: Vec<i32> = summary.laps.iter().map(|l| l.lap_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!((summary.laps[0].time_seconds - 90.5).abs() < 1e-4);
        assert!((summary.best_lap_time.unwrap_or_default() - 89.5).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_open_lap_has_no_record() -> Result<()> {
        let mut builder = CaptureBuilder::timing();
        builder.lap(1, &[30.0, 30.0, 30.0]).lap(2, &[30.0, 30.0, 30.0]);
        let reader = CaptureReader::from_bytes(&builder.build())?;
        let summary = segment_laps(reader.variables(), &reader.accessor(), &AnalysisConfig::default())?;
        assert_eq!(summary.lap_count(), 1);
        Ok(())
    }

    #[test]
    fn test_reported_best_is_adopted() -> Result<()> {
        let mut builder = CaptureBuilder::timing();
        builder.lap(1, &[30.0, 30.0, 30.0]);
        builder.push(TimingSample {
            lap: 2,
            dist_pct: 0.01,
            current_lap_time: 0.5,
            last_lap_time: 90.0,
            best_lap_time: 88.75,
            incidents: 0,
        });
        let reader = CaptureReader::from_bytes(&builder.build())?;
        let summary = segment_laps(reader.variables(), &reader.accessor(), &AnalysisConfig::default())?;
        assert_eq!(summary.lap_count(), 1);
        assert_eq!(summary.best_lap_time, Some(88.75));
        Ok(())
    }

    #[test]
    fn test_missing_lap_channel_is_reported() -> Result<()> {
        let builder = CaptureBuilder::timing().without_variable("LapLastLapTime");
        let reader = CaptureReader::from_bytes(&builder.build())?;
        let result = segment_laps(reader.variables(), &reader.accessor(), &AnalysisConfig::default());
        assert!(matches!(
            result,
            Err(TelemetryError::MissingVariable { ref name }) if name == "LapLastLapTime"
        ));
        Ok(())
    }
}
