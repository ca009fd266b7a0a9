//! Split timing and sector information

use serde::{Deserialize, Serialize};

/// Split timing information
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct SplitTimeInfo {
    /// Sector information
    pub sectors: Vec<Sector>,
}

/// Individual sector timing information
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Sector {
    /// Sector number
    pub sector_num: Option<i32>,
    /// Sector start percentage along track
    pub sector_start_pct: Option<f64>,
}

impl SplitTimeInfo {
    /// Sector start fractions in document order.
    pub fn sector_starts(&self) -> Vec<f64> {
        self.sectors.iter().filter_map(|s| s.sector_start_pct).collect()
    }
}
