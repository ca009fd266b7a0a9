//! Sector reconstruction
//!
//! Sector times are not recorded by the sim. They are rebuilt from the lap
//! distance fraction by noting the current-lap time whenever a sector
//! boundary is crossed.
//!
//! ## Per-sample order
//!
//! 1. **Incidents**: a rise in the incident counter taints the sector the car
//!    is in for the open lap
//! 2. **Lap closure**: on a lap number change the recorded crossings are
//!    differenced into sectors, validated and stored under the closing lap
//! 3. **Crossings**: `prev < boundary <= pct` for intermediate boundaries, a
//!    wrap from above 0.9 for the finish line
//!
//! Only validated sets are stored. A set is rejected when a sector is
//! missing or implausible, when the sectors do not add up to the reported lap
//! time, or when the lap saw an incident.

use crate::config::SectorValidation;
use crate::{AnalysisConfig, SampleAccessor, VariableSchema};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, trace};

/// Wrap detection threshold for the finish line.
const FINISH_WRAP_FROM: f64 = 0.9;

/// Validated sector durations for one lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSet {
    pub lap_number: i32,
    /// Duration of each sector in seconds, by sector index
    pub sectors: Vec<f64>,
    /// Lap time reported by the sim
    pub lap_time: f64,
}

impl SectorSet {
    pub fn sector_sum(&self) -> f64 {
        self.sectors.iter().sum()
    }
}

/// Reasons a reconstructed lap is not stored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SectorRejection {
    #[error("reconstructed {found} sectors, track has {expected}")]
    SectorCount { found: usize, expected: usize },

    #[error("reported lap time {0:?} outside the accepted window")]
    ReportedLapTime(Option<f64>),

    #[error("sector {sector} time {time:.3}s outside the accepted window")]
    SectorTime { sector: usize, time: f64 },

    #[error("sector sum {0:.3}s outside the accepted window")]
    SectorSum(f64),

    #[error("sector sum {sum:.3}s differs from reported {reported:.3}s")]
    SumMismatch { sum: f64, reported: f64 },

    #[error("incident in sectors {0:?}")]
    Incident(Vec<usize>),
}

/// Channel values of one sample, as needed by the reconstructor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SectorSample {
    pub lap: Option<i32>,
    pub dist_pct: Option<f64>,
    pub current_lap_time: Option<f64>,
    pub last_lap_time: Option<f64>,
    pub incidents: Option<i32>,
}

/// Streaming sector reconstruction for one capture.
#[derive(Debug, Clone)]
pub struct SectorReconstructor {
    /// Sector end fractions, the last one is the finish line at 1.0
    boundaries: Vec<f64>,
    validation: SectorValidation,
    previous_pct: f64,
    previous_lap: Option<i32>,
    /// Highest incident count seen so far, starting from zero
    incident_baseline: i32,
    /// Boundary index -> current-lap time at crossing
    crossings: BTreeMap<usize, f64>,
    tainted: BTreeSet<usize>,
    completed: BTreeMap<i32, SectorSet>,
}

impl SectorReconstructor {
    /// `None` when the track defines fewer than two sectors.
    pub fn new(sector_starts: &[f64], validation: SectorValidation) -> Option<Self> {
        if sector_starts.len() < 2 {
            return None;
        }

        let boundaries = sector_starts[1..].iter().copied().chain(std::iter::once(1.0)).collect();

        Some(Self {
            boundaries,
            validation,
            previous_pct: 0.0,
            previous_lap: None,
            incident_baseline: 0,
            crossings: BTreeMap::new(),
            tainted: BTreeSet::new(),
            completed: BTreeMap::new(),
        })
    }

    pub fn sector_count(&self) -> usize {
        self.boundaries.len()
    }

    pub fn observe(&mut self, sample: SectorSample) {
        let (Some(lap), Some(pct), Some(lap_time)) =
            (sample.lap, sample.dist_pct, sample.current_lap_time)
        else {
            return;
        };

        if let Some(count) = sample.incidents.filter(|&count| count > self.incident_baseline) {
            let sector = self.sector_at(pct);
            trace!(lap, sector, count, "Incident recorded");
            self.tainted.insert(sector);
            self.incident_baseline = count;
        }

        if self.previous_lap.is_some_and(|previous| previous != lap) {
            self.close_lap(sample.last_lap_time);
        }
        self.previous_lap = Some(lap);

        let previous_pct = self.previous_pct;
        for (index, &boundary) in self.boundaries.iter().enumerate() {
            let crossed = if boundary < 1.0 {
                previous_pct < boundary && boundary <= pct
            } else {
                pct < previous_pct && previous_pct > FINISH_WRAP_FROM
            };
            if crossed {
                self.crossings.insert(index, lap_time);
            }
        }
        self.previous_pct = pct;
    }

    /// Validated sets keyed by lap number. The lap open at the end is dropped.
    pub fn finish(self) -> BTreeMap<i32, SectorSet> {
        self.completed
    }

    fn sector_at(&self, pct: f64) -> usize {
        self.boundaries.iter().position(|&bound| pct < bound).unwrap_or(0)
    }

    fn close_lap(&mut self, reported: Option<f64>) {
        let crossings = std::mem::take(&mut self.crossings);
        let tainted = std::mem::take(&mut self.tainted);
        let Some(lap_number) = self.previous_lap else {
            return;
        };
        if crossings.is_empty() {
            return;
        }

        let mut sectors = Vec::with_capacity(crossings.len());
        let mut previous = None;
        for &time in crossings.values() {
            sectors.push(match previous {
                Some(earlier) => time - earlier,
                None => time,
            });
            previous = Some(time);
        }

        match self.validate(sectors, reported, &tainted) {
            Ok((sectors, lap_time)) => {
                trace!(lap = lap_number, ?sectors, lap_time, "Sector set accepted");
                self.completed.insert(lap_number, SectorSet { lap_number, sectors, lap_time });
            }
            Err(reason) => debug!(lap = lap_number, %reason, "Sector set rejected"),
        }
    }

    fn validate(
        &self,
        sectors: Vec<f64>,
        reported: Option<f64>,
        tainted: &BTreeSet<usize>,
    ) -> Result<(Vec<f64>, f64), SectorRejection> {
        let expected = self.sector_count();
        if sectors.len() != expected {
            return Err(SectorRejection::SectorCount { found: sectors.len(), expected });
        }

        let limits = &self.validation;
        let reported = reported
            .filter(|&time| limits.lap_time_in_range(time))
            .ok_or(SectorRejection::ReportedLapTime(reported))?;

        let floor = limits.min_sector_time(expected);
        if let Some((sector, &time)) = sectors
            .iter()
            .enumerate()
            .find(|&(_, &time)| !(time > floor && time < limits.max_sector_time))
        {
            return Err(SectorRejection::SectorTime { sector, time });
        }

        let sum: f64 = sectors.iter().sum();
        if !limits.lap_time_in_range(sum) {
            return Err(SectorRejection::SectorSum(sum));
        }
        if (sum - reported).abs() >= limits.sum_tolerance {
            return Err(SectorRejection::SumMismatch { sum, reported });
        }
        if !tainted.is_empty() {
            return Err(SectorRejection::Incident(tainted.iter().copied().collect()));
        }

        Ok((sectors, reported))
    }
}

/// Rebuild validated sector sets for every closed lap of a capture.
///
/// Returns an empty map when the track has fewer than two sectors or a
/// position channel is absent.
pub fn reconstruct_sectors(
    schema: &VariableSchema,
    accessor: &SampleAccessor<'_>,
    sector_starts: &[f64],
    config: &AnalysisConfig,
) -> BTreeMap<i32, SectorSet> {
    let Some(mut reconstructor) =
        SectorReconstructor::new(sector_starts, config.sector_validation.clone())
    else {
        debug!(sectors = sector_starts.len(), "Too few sectors for split timing");
        return BTreeMap::new();
    };

    let channels = &config.channels;
    let lap = schema.get_variable(&channels.lap);
    let dist_pct = schema.get_variable(&channels.lap_dist_pct);
    let current_lap_time = schema.get_variable(&channels.current_lap_time);
    let last_lap_time = schema.get_variable(&channels.last_lap_time);
    let incidents = schema.get_variable(&channels.incident_count);

    if lap.is_none() || dist_pct.is_none() || current_lap_time.is_none() {
        debug!("Position channels missing, no sector data");
        return BTreeMap::new();
    }

    for index in 0..accessor.sample_count() {
        reconstructor.observe(SectorSample {
            lap: accessor.read_i32(lap, index),
            dist_pct: accessor.read_f64(dist_pct, index),
            current_lap_time: accessor.read_f64(current_lap_time, index),
            last_lap_time: accessor.read_f64(last_lap_time, index),
            incidents: accessor.read_i32(incidents, index),
        });
    }

    let sets = reconstructor.finish();
    debug!(laps = sets.len(), "Reconstructed sector sets");
    sets
}
