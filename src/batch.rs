//! Batch driver
//!
//! Processes an explicit list of capture paths, orders the outcomes
//! chronologically and folds them into the global purple tracker and the
//! statistics aggregator.
//!
//! ```rust,no_run
//! use pitlog::{AnalysisConfig, BatchProcessor};
//! use std::path::PathBuf;
//!
//! # async fn run() {
//! let paths = vec![PathBuf::from("captures/porsche 2024-09-13 11-43-43.ibt")];
//! let processor = BatchProcessor::new(AnalysisConfig::default());
//! let report = processor.process_concurrent(&paths).await;
//! println!("{} sessions, {} laps", report.total_sessions, report.total_laps);
//! # }
//! ```

use crate::analysis::{
    PurpleSession, PurpleTracker, StatisticsAggregator, format_duration, format_lap_time,
};
use crate::capture::{CaptureOutcome, FailedCapture, file_name_of, process_capture};
use crate::report::{BatchReport, BestLap};
use crate::timestamp::capture_timestamp;
use crate::AnalysisConfig;
use futures::{StreamExt, stream};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs captures through analysis and builds a [`BatchReport`].
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    config: Arc<AnalysisConfig>,
}

impl BatchProcessor {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Process captures one after another on the calling thread.
    pub fn process(&self, paths: &[PathBuf]) -> BatchReport {
        info!(files = paths.len(), "Processing captures sequentially");
        let outcomes = paths.iter().map(|path| process_capture(path, &self.config)).collect();
        self.summarize(outcomes)
    }

    /// Process captures on blocking tasks, at most `workers` at a time.
    ///
    /// Produces the same report as [`process`](Self::process).
    pub async fn process_concurrent(&self, paths: &[PathBuf]) -> BatchReport {
        let workers = self.config.workers.max(1);
        info!(files = paths.len(), workers, "Processing captures concurrently");

        let outcomes = stream::iter(paths.iter().cloned())
            .map(|path| {
                let config = Arc::clone(&self.config);
                async move {
                    let file_name = file_name_of(&path);
                    match tokio::task::spawn_blocking(move || process_capture(&path, &config)).await
                    {
                        Ok(outcome) => outcome,
                        Err(e) => CaptureOutcome::Failed(FailedCapture {
                            timestamp: capture_timestamp(&file_name, None),
                            file_name,
                            kind: "task".to_string(),
                            reason: format!("Capture task did not complete: {e}"),
                            context: None,
                            duration_seconds: None,
                        }),
                    }
                }
            })
            .buffered(workers)
            .collect()
            .await;

        self.summarize(outcomes)
    }

    /// Order outcomes and fold them into a report.
    pub fn summarize(&self, mut outcomes: Vec<CaptureOutcome>) -> BatchReport {
        outcomes.sort_by(chronological);

        let mut purple = PurpleTracker::new(self.config.exclude_wet_sessions);
        let mut stats = StatisticsAggregator::new(&self.config);
        let mut total_laps = 0;
        let mut total_track_time = 0.0;
        let mut best_overall: Option<BestLap> = None;

        for outcome in &outcomes {
            total_laps += outcome.laps().len();
            total_track_time += outcome.track_time_seconds();

            if let Some(time) = outcome.best_lap_time() {
                if best_overall.as_ref().is_none_or(|best| time < best.time_seconds) {
                    best_overall = Some(BestLap {
                        time_seconds: time,
                        formatted: format_lap_time(time),
                        file_name: outcome.file_name().to_string(),
                    });
                }
            }

            if let Some(observation) = outcome.observation() {
                stats.observe(&observation);
            } else {
                debug!(file = outcome.file_name(), "Capture left out of statistics");
            }

            if let CaptureOutcome::Full(result) = outcome {
                purple.observe(PurpleSession {
                    file_name: &result.file_name,
                    date: result.timestamp.map(|t| t.date()),
                    car: &result.context.car,
                    is_wet: result.context.is_wet(),
                    sector_count: result.context.sector_count(),
                    sets: &result.sector_sets,
                });
            }
        }

        let aggregates = stats.finish();
        let purple = purple.finish();
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();

        info!(
            sessions = outcomes.len(),
            failed,
            laps = total_laps,
            all_purple = purple.all_purple_laps.len(),
            almost_purple = purple.almost_purple_laps.len(),
            "Batch complete"
        );

        BatchReport {
            total_sessions: outcomes.len(),
            total_laps,
            total_track_time_seconds: total_track_time,
            total_track_time_formatted: format_duration(total_track_time),
            best_overall,
            car_stats: aggregates.car_stats,
            daily_stats: aggregates.daily_stats,
            wet_sessions: aggregates.wet_sessions,
            outliers_filtered: aggregates.outliers_filtered,
            sessions: outcomes,
            purple,
        }
    }
}

/// Timestamped captures first, oldest first, then by file name.
fn chronological(a: &CaptureOutcome, b: &CaptureOutcome) -> Ordering {
    let by_time = match (a.timestamp(), b.timestamp()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_time.then_with(|| a.file_name().cmp(b.file_name()))
}
