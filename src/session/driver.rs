//! Driver information structures

use serde::{Deserialize, Serialize};

/// Driver information: the recording driver's car index and the entry list
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct DriverInfo {
    /// Car index of the driver who recorded the capture
    pub driver_car_idx: Option<i32>,
    /// Drivers list
    pub drivers: Vec<Driver>,
}

/// Individual driver data (from Drivers list)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Driver {
    /// Car index number
    pub car_idx: i32,
    /// Driver name
    pub user_name: Option<String>,
    /// Car display name
    pub car_screen_name: Option<String>,
}

impl DriverInfo {
    /// The recording driver's entry, falling back to the first listed driver.
    pub fn player(&self) -> Option<&Driver> {
        self.driver_car_idx
            .and_then(|idx| self.drivers.iter().find(|d| d.car_idx == idx))
            .or_else(|| self.drivers.first())
    }
}
