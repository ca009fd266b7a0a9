//! Cross-session statistics
//!
//! Aggregates are collected in two phases. An [`Accumulator`] is folded once
//! per capture, then [`Accumulator::finalize`] derives the immutable
//! [`AggregateStats`] in one pass after every capture is in.
//!
//! Two families are kept by [`StatisticsAggregator`]: per car, and per
//! [`DailyKey`] (calendar date and car).

use super::format::{format_duration, format_lap_time, format_range};
use super::laps::LapRecord;
use crate::AnalysisConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Composite key of the daily family.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DailyKey {
    pub date: NaiveDate,
    pub car: String,
}

/// One capture as seen by the aggregator.
#[derive(Debug, Clone, Copy)]
pub struct SessionObservation<'a> {
    pub date: NaiveDate,
    pub car: &'a str,
    pub track: &'a str,
    pub is_wet: bool,
    pub duration_seconds: f64,
    pub laps: &'a [LapRecord],
    pub best_lap_time: Option<f64>,
}

/// Running totals for one key.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    sessions: usize,
    total_laps: usize,
    track_time_seconds: f64,
    lap_times: Vec<f64>,
    best_time: Option<f64>,
}

impl Accumulator {
    /// Count a session and its track time.
    pub fn add_session(&mut self, duration_seconds: f64) {
        self.sessions += 1;
        self.track_time_seconds += duration_seconds;
    }

    /// Collect a session's laps; times outside `(0, ceiling)` are ignored.
    pub fn add_laps(&mut self, laps: &[LapRecord], best: Option<f64>, ceiling: f64) {
        self.total_laps += laps.len();
        self.lap_times.extend(
            laps.iter().map(|lap| lap.time_seconds).filter(|&t| t > 0.0 && t < ceiling),
        );
        if let Some(best) = best.filter(|&b| b > 0.0) {
            if self.best_time.is_none_or(|current| best < current) {
                self.best_time = Some(best);
            }
        }
    }

    /// Derive the statistics.
    pub fn finalize(self, outlier_threshold: f64) -> AggregateStats {
        let laps_raw = self.lap_times.len();
        let clean = filter_outliers(&self.lap_times, self.best_time, outlier_threshold);
        let outliers_filtered = laps_raw - clean.len();

        let median_time = median(&clean);
        let slowest_time = clean.iter().copied().reduce(f64::max);
        let range = slowest_time.zip(self.best_time).map(|(slowest, best)| slowest - best);

        AggregateStats {
            sessions: self.sessions,
            total_laps: self.total_laps,
            track_time_seconds: self.track_time_seconds,
            track_time_formatted: format_duration(self.track_time_seconds),
            best_time: self.best_time,
            best_time_formatted: self.best_time.and_then(format_lap_time),
            median_time,
            median_time_formatted: median_time.and_then(format_lap_time),
            slowest_time,
            slowest_time_formatted: slowest_time.and_then(format_lap_time),
            range,
            range_formatted: range.and_then(format_range),
            consistency_score: consistency_score(&clean),
            laps_raw,
            laps_clean: clean.len(),
            outliers_filtered,
        }
    }
}

/// Finalized statistics for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub sessions: usize,
    /// Laps recorded in dry sessions
    pub total_laps: usize,
    /// Track time of every session, wet included
    pub track_time_seconds: f64,
    pub track_time_formatted: String,
    pub best_time: Option<f64>,
    pub best_time_formatted: Option<String>,
    pub median_time: Option<f64>,
    pub median_time_formatted: Option<String>,
    pub slowest_time: Option<f64>,
    pub slowest_time_formatted: Option<String>,
    /// Slowest clean lap minus best
    pub range: Option<f64>,
    pub range_formatted: Option<String>,
    pub consistency_score: Option<u8>,
    pub laps_raw: usize,
    pub laps_clean: usize,
    pub outliers_filtered: usize,
}

/// Per-car aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarStats {
    pub car: String,
    #[serde(flatten)]
    pub stats: AggregateStats,
}

/// Per-day, per-car aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub car: String,
    /// Track of the first session folded into this entry
    pub track: String,
    #[serde(flatten)]
    pub stats: AggregateStats,
}

/// Finished output of a [`StatisticsAggregator`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Sorted by session count, most used first
    pub car_stats: Vec<CarStats>,
    /// Sorted by date, then car
    pub daily_stats: Vec<DailyStats>,
    pub wet_sessions: usize,
    /// Outliers removed across the daily family
    pub outliers_filtered: usize,
}

#[derive(Debug, Clone)]
struct DailyAccumulator {
    track: String,
    totals: Accumulator,
}

/// Per-car and per-day statistics over a batch.
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    exclude_wet_sessions: bool,
    lap_time_ceiling: f64,
    outlier_threshold: f64,
    by_car: HashMap<String, Accumulator>,
    by_day: BTreeMap<DailyKey, DailyAccumulator>,
    wet_sessions: usize,
}

impl StatisticsAggregator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            exclude_wet_sessions: config.exclude_wet_sessions,
            lap_time_ceiling: config.lap_time_ceiling,
            outlier_threshold: config.outlier_threshold,
            by_car: HashMap::new(),
            by_day: BTreeMap::new(),
            wet_sessions: 0,
        }
    }

    pub fn observe(&mut self, session: &SessionObservation<'_>) {
        if session.is_wet {
            self.wet_sessions += 1;
        }
        let include_laps = !(session.is_wet && self.exclude_wet_sessions);

        let key = DailyKey { date: session.date, car: session.car.to_string() };
        let daily = self.by_day.entry(key).or_insert_with(|| DailyAccumulator {
            track: session.track.to_string(),
            totals: Accumulator::default(),
        });
        let car = self.by_car.entry(session.car.to_string()).or_default();

        for totals in [&mut daily.totals, car] {
            totals.add_session(session.duration_seconds);
            if include_laps {
                totals.add_laps(session.laps, session.best_lap_time, self.lap_time_ceiling);
            }
        }
    }

    pub fn finish(self) -> AggregateReport {
        let threshold = self.outlier_threshold;

        let mut car_stats: Vec<CarStats> = self
            .by_car
            .into_iter()
            .map(|(car, totals)| CarStats { car, stats: totals.finalize(threshold) })
            .collect();
        car_stats.sort_by(|a, b| {
            b.stats.sessions.cmp(&a.stats.sessions).then_with(|| a.car.cmp(&b.car))
        });

        let daily_stats: Vec<DailyStats> = self
            .by_day
            .into_iter()
            .map(|(key, daily)| DailyStats {
                date: key.date,
                car: key.car,
                track: daily.track,
                stats: daily.totals.finalize(threshold),
            })
            .collect();

        let outliers_filtered = daily_stats.iter().map(|d| d.stats.outliers_filtered).sum();
        debug!(
            cars = car_stats.len(),
            days = daily_stats.len(),
            outliers_filtered,
            "Finalized statistics"
        );

        AggregateReport { car_stats, daily_stats, wet_sessions: self.wet_sessions, outliers_filtered }
    }
}

/// Keep times no slower than `best × (1 + threshold)`. Without a best nothing is removed.
pub fn filter_outliers(times: &[f64], best: Option<f64>, threshold: f64) -> Vec<f64> {
    match best.filter(|&b| b > 0.0) {
        Some(best) => {
            let limit = best * (1.0 + threshold);
            times.iter().copied().filter(|&t| t <= limit).collect()
        }
        None => times.to_vec(),
    }
}

/// Median, averaging the middle pair for even counts.
pub fn median(times: &[f64]) -> Option<f64> {
    if times.is_empty() {
        return None;
    }
    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] })
}

/// 0-100 score from the coefficient of variation; `None` below two samples.
///
/// A CV of 0 scores 100, each 0.01 of CV costs 5 points, 0.2 and above
/// score 0. Halves round to even.
pub fn consistency_score(times: &[f64]) -> Option<u8> {
    if times.len() < 2 {
        return None;
    }
    let n = times.len() as f64;
    let mean = times.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return Some(100);
    }
    let variance = times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(score_from_cv(variance.sqrt() / mean))
}

/// Map a coefficient of variation to the 0-100 consistency scale.
pub fn score_from_cv(cv: f64) -> u8 {
    (100.0 * (1.0 - 5.0 * cv)).clamp(0.0, 100.0).round_ties_even() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn laps(times: &[f64]) -> Vec<LapRecord> {
        times.iter().enumerate().map(|(i, &t)| LapRecord::new(i as i32 + 1, t)).collect()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).expect("valid date")
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_outlier_filter() {
        let times = [90.0, 95.0, 103.4, 103.6, 120.0];
        assert_eq!(filter_outliers(&times, Some(90.0), 0.15), vec![90.0, 95.0, 103.4]);
        assert_eq!(filter_outliers(&times, None, 0.15), times.to_vec());
        assert!(filter_outliers(&[], Some(90.0), 0.15).is_empty());
    }

    #[test]
    fn test_consistency_score() {
        assert_eq!(consistency_score(&[90.0]), None);
        assert_eq!(consistency_score(&[90.0, 90.0, 90.0]), Some(100));
        assert_eq!(consistency_score(&[0.0, 0.0]), Some(100));
        assert_eq!(score_from_cv(0.0), 100);
        assert_eq!(score_from_cv(0.05), 75);
        assert_eq!(score_from_cv(0.2), 0);
        assert_eq!(score_from_cv(0.5), 0);
        assert_eq!(score_from_cv(0.125), 38);
        assert_eq!(score_from_cv(0.1), 50);
    }

    #[test]
    fn test_finalize_derives_statistics() {
        let mut totals = Accumulator::default();
        totals.add_session(1800.0);
        totals.add_laps(&laps(&[92.0, 90.0, 91.0, 120.0]), Some(90.0), 600.0);
        let stats = totals.finalize(0.15);

        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.total_laps, 4);
        assert_eq!(stats.laps_raw, 4);
        assert_eq!(stats.laps_clean, 3);
        assert_eq!(stats.outliers_filtered, 1);
        assert_eq!(stats.median_time, Some(91.0));
        assert_eq!(stats.slowest_time, Some(92.0));
        assert_eq!(stats.range, Some(2.0));
        assert_eq!(stats.range_formatted.as_deref(), Some("2.000s"));
        assert_eq!(stats.best_time_formatted.as_deref(), Some("1:30.000"));
        assert_eq!(stats.track_time_formatted, "0:30:00");
        assert!(stats.consistency_score.is_some_and(|s| s > 90));
    }

    #[test]
    fn test_empty_accumulator_finalizes_to_none() {
        let stats = Accumulator::default().finalize(0.15);
        assert_eq!(stats.median_time, None);
        assert_eq!(stats.consistency_score, None);
        assert_eq!(stats.range, None);
        assert_eq!(stats.track_time_formatted, "0:00:00");
    }

    #[test]
    fn test_wet_sessions_count_time_but_not_laps() {
        let mut aggregator = StatisticsAggregator::new(&AnalysisConfig::default());
        let dry = laps(&[90.0, 91.0]);
        let wet = laps(&[100.0, 101.0, 102.0]);

        aggregator.observe(&SessionObservation {
            date: day(13),
            car: "GT3",
            track: "Monza",
            is_wet: false,
            duration_seconds: 600.0,
            laps: &dry,
            best_lap_time: Some(90.0),
        });
        aggregator.observe(&SessionObservation {
            date: day(13),
            car: "GT3",
            track: "Spa",
            is_wet: true,
            duration_seconds: 900.0,
            laps: &wet,
            best_lap_time: Some(100.0),
        });

        let report = aggregator.finish();
        assert_eq!(report.wet_sessions, 1);
        assert_eq!(report.daily_stats.len(), 1);
        let daily = &report.daily_stats[0];
        assert_eq!(daily.track, "Monza");
        assert_eq!(daily.stats.sessions, 2);
        assert_eq!(daily.stats.total_laps, 2);
        assert_eq!(daily.stats.track_time_seconds, 1500.0);
        assert_eq!(daily.stats.best_time, Some(90.0));
    }

    #[test]
    fn test_wet_laps_included_when_not_excluded() {
        let config = AnalysisConfig { exclude_wet_sessions: false, ..AnalysisConfig::default() };
        let mut aggregator = StatisticsAggregator::new(&config);
        let wet = laps(&[100.0]);
        aggregator.observe(&SessionObservation {
            date: day(1),
            car: "GT3",
            track: "Spa",
            is_wet: true,
            duration_seconds: 100.0,
            laps: &wet,
            best_lap_time: Some(100.0),
        });
        let report = aggregator.finish();
        assert_eq!(report.car_stats[0].stats.total_laps, 1);
        assert_eq!(report.wet_sessions, 1);
    }

    #[test]
    fn test_ordering_of_families() {
        let mut aggregator = StatisticsAggregator::new(&AnalysisConfig::default());
        let none: Vec<LapRecord> = Vec::new();
        for (d, car) in [(14, "LMP2"), (13, "GT3"), (14, "GT3"), (13, "LMP2"), (15, "LMP2")] {
            aggregator.observe(&SessionObservation {
                date: day(d),
                car,
                track: "Monza",
                is_wet: false,
                duration_seconds: 60.0,
                laps: &none,
                best_lap_time: None,
            });
        }
        let report = aggregator.finish();
        let cars: Vec<&str> = report.car_stats.iter().map(|c| c.car.as_str()).collect();
        assert_eq!(cars, vec!["LMP2", "GT3"]);
        let days: Vec<(u32, &str)> = report
            .daily_stats
            .iter()
            .map(|d| (chrono::Datelike::day(&d.date), d.car.as_str()))
            .collect();
        assert_eq!(days, vec![(13, "GT3"), (13, "LMP2"), (14, "GT3"), (14, "LMP2"), (15, "LMP2")]);
    }

    proptest! {
        #[test]
        fn prop_score_non_increasing_in_cv(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(score_from_cv(low) >= score_from_cv(high));
        }

        #[test]
        fn prop_filter_removes_exactly_slow_laps(
            times in proptest::collection::vec(60.0f64..200.0, 0..50),
            best in 60.0f64..120.0,
        ) {
            let kept = filter_outliers(&times, Some(best), 0.15);
            let limit = best * 1.15;
            prop_assert!(kept.iter().all(|&t| t <= limit));
            prop_assert_eq!(kept.len(), times.iter().filter(|&&t| t <= limit).count());
        }

        #[test]
        fn prop_median_within_bounds(times in proptest::collection::vec(1.0f64..600.0, 1..40)) {
            let m = median(&times).expect("non-empty");
            let min = times.iter().copied().fold(f64::INFINITY, f64::min);
            let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(m >= min && m <= max);
        }
    }
}
