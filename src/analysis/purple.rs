//! Personal-best ("purple") sector tracking
//!
//! A [`CarBestSectors`] keeps the best time per sector for one car. Each lap
//! is compared sector by sector in ascending lap order. A sector is purple
//! when it is strictly faster than the best so far, or the first time that
//! sector is reached. Ties do not count.
//!
//! Two scopes use the same tracker:
//! - capture-local: [`detect_purple_laps`] over one capture's sector sets
//! - global: [`PurpleTracker`] across every capture of a batch, per car,
//!   skipping wet sessions

use super::format::format_lap_time;
use super::sectors::SectorSet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How many sectors of a lap were purple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PurpleClassification {
    /// Every sector improved
    AllPurple,
    /// All but one sector improved
    Almost { missed_sector: usize },
    /// Some sectors improved
    Partial,
}

/// A lap that set at least one personal-best sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurpleLap {
    pub lap_number: i32,
    pub classification: PurpleClassification,
    pub purple_count: usize,
    pub purple_sectors: Vec<usize>,
    pub sector_times: Vec<f64>,
    pub lap_time: f64,
}

/// Best time per sector for one car. `None` until a sector is first reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarBestSectors {
    bests: Vec<Option<f64>>,
}

impl CarBestSectors {
    pub fn new(sector_count: usize) -> Self {
        Self { bests: vec![None; sector_count] }
    }

    pub fn sector_count(&self) -> usize {
        self.bests.len()
    }

    pub fn bests(&self) -> &[Option<f64>] {
        &self.bests
    }

    /// All sectors reached at least once.
    pub fn is_complete(&self) -> bool {
        self.bests.iter().all(Option::is_some)
    }

    /// Sum of the best sectors, once every sector has been reached.
    pub fn theoretical_best(&self) -> Option<f64> {
        if self.bests.is_empty() {
            return None;
        }
        self.bests.iter().copied().sum()
    }

    /// Compare a lap against the bests, updating them.
    ///
    /// Returns `None` when no sector improved or when the lap has a different
    /// sector count than the tracker.
    pub fn record(&mut self, set: &SectorSet) -> Option<PurpleLap> {
        if set.sectors.len() != self.bests.len() {
            return None;
        }

        let mut purple_sectors = Vec::new();
        for (sector, (&time, best)) in set.sectors.iter().zip(self.bests.iter_mut()).enumerate() {
            if best.is_none_or(|current| time < current) {
                *best = Some(time);
                purple_sectors.push(sector);
            }
        }

        let classification = classify(&purple_sectors, self.bests.len())?;
        Some(PurpleLap {
            lap_number: set.lap_number,
            classification,
            purple_count: purple_sectors.len(),
            purple_sectors,
            sector_times: set.sectors.clone(),
            lap_time: set.lap_time,
        })
    }
}

fn classify(purple_sectors: &[usize], sector_count: usize) -> Option<PurpleClassification> {
    let count = purple_sectors.len();
    if count == 0 {
        return None;
    }
    if count == sector_count {
        return Some(PurpleClassification::AllPurple);
    }
    if count + 1 == sector_count {
        let missed_sector = (0..sector_count).find(|s| !purple_sectors.contains(s))?;
        return Some(PurpleClassification::Almost { missed_sector });
    }
    Some(PurpleClassification::Partial)
}

/// Capture-local purple detection.
///
/// Walks `sets` in lap order with a fresh tracker of `sector_count` sectors
/// and returns the notable laps together with the final bests.
pub fn detect_purple_laps(
    sets: &BTreeMap<i32, SectorSet>,
    sector_count: usize,
) -> (Vec<PurpleLap>, CarBestSectors) {
    let mut bests = CarBestSectors::new(sector_count);
    let notable = sets.values().filter_map(|set| bests.record(set)).collect();
    (notable, bests)
}

/// A global purple lap with the capture it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPurpleLap {
    pub file_name: String,
    pub date: Option<NaiveDate>,
    pub car: String,
    pub lap_time_formatted: Option<String>,
    #[serde(flatten)]
    pub lap: PurpleLap,
}

/// Best sectors of one car once every sector has been reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSectorBests {
    pub car: String,
    pub sectors: Vec<f64>,
    pub sectors_formatted: Vec<String>,
    pub theoretical_best: f64,
    pub theoretical_best_formatted: Option<String>,
}

/// Everything the global tracker found over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurpleReport {
    pub all_purple_laps: Vec<SessionPurpleLap>,
    pub almost_purple_laps: Vec<SessionPurpleLap>,
    pub best_sectors: Vec<CarSectorBests>,
}

/// Cross-capture purple tracker, one [`CarBestSectors`] per car.
#[derive(Debug, Clone, Default)]
pub struct PurpleTracker {
    exclude_wet_sessions: bool,
    cars: BTreeMap<String, CarBestSectors>,
    all_purple_laps: Vec<SessionPurpleLap>,
    almost_purple_laps: Vec<SessionPurpleLap>,
}

/// One capture's contribution to the global tracker.
#[derive(Debug, Clone, Copy)]
pub struct PurpleSession<'a> {
    pub file_name: &'a str,
    pub date: Option<NaiveDate>,
    pub car: &'a str,
    pub is_wet: bool,
    pub sector_count: usize,
    pub sets: &'a BTreeMap<i32, SectorSet>,
}

impl PurpleTracker {
    pub fn new(exclude_wet_sessions: bool) -> Self {
        Self { exclude_wet_sessions, ..Default::default() }
    }

    /// Fold one capture's sector sets into the car's bests.
    ///
    /// Captures must be supplied in chronological order.
    pub fn observe(&mut self, session: PurpleSession<'_>) {
        if session.sets.is_empty() || session.sector_count == 0 {
            return;
        }
        if session.is_wet && self.exclude_wet_sessions {
            debug!(file = session.file_name, "Wet session excluded from purple tracking");
            return;
        }

        let bests = self
            .cars
            .entry(session.car.to_string())
            .or_insert_with(|| CarBestSectors::new(session.sector_count));

        for set in session.sets.values() {
            if set.sectors.len() != bests.sector_count() {
                warn!(
                    file = session.file_name,
                    car = session.car,
                    lap = set.lap_number,
                    "Lap has {} sectors but the car's bests track {}, skipping",
                    set.sectors.len(),
                    bests.sector_count()
                );
                continue;
            }

            let Some(lap) = bests.record(set) else {
                continue;
            };

            let target = match lap.classification {
                PurpleClassification::AllPurple => &mut self.all_purple_laps,
                PurpleClassification::Almost { .. } => &mut self.almost_purple_laps,
                PurpleClassification::Partial => continue,
            };
            target.push(SessionPurpleLap {
                file_name: session.file_name.to_string(),
                date: session.date,
                car: session.car.to_string(),
                lap_time_formatted: format_lap_time(lap.lap_time),
                lap,
            });
        }
    }

    pub fn car_bests(&self, car: &str) -> Option<&CarBestSectors> {
        self.cars.get(car)
    }

    pub fn finish(self) -> PurpleReport {
        let best_sectors = self
            .cars
            .into_iter()
            .filter_map(|(car, bests)| {
                let sectors: Vec<f64> = bests.bests().iter().copied().collect::<Option<_>>()?;
                let theoretical_best: f64 = sectors.iter().sum();
                Some(CarSectorBests {
                    car,
                    sectors_formatted: sectors.iter().map(|s| format!("{:.3}", s)).collect(),
                    sectors,
                    theoretical_best,
                    theoretical_best_formatted: format_lap_time(theoretical_best),
                })
            })
            .collect();

        PurpleReport {
            all_purple_laps: self.all_purple_laps,
            almost_purple_laps: self.almost_purple_laps,
            best_sectors,
        }
    }
}
