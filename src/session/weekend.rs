//! Weekend and track information
//!
//! The subset of `WeekendInfo` used to label a capture and detect wet running.

use serde::{Deserialize, Serialize};

/// Weekend and track information from the metadata block
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct WeekendInfo {
    /// Internal track name
    pub track_name: Option<String>,
    /// Track display name
    pub track_display_name: Option<String>,
    /// Track short name
    pub track_display_short_name: Option<String>,
    /// Track skies condition
    pub track_skies: Option<String>,
    /// Precipitation as written by the sim, e.g. `"15 %"`
    pub track_precipitation: Option<String>,
}

impl WeekendInfo {
    /// Precipitation percentage, 0 when absent or unparseable.
    pub fn precipitation_percent(&self) -> i32 {
        self.track_precipitation.as_deref().map_or(0, leading_integer)
    }
}

/// Leading run of ASCII digits as an integer (`"15 %"` → 15), 0 without digits.
pub(crate) fn leading_integer(text: &str) -> i32 {
    let digits: String = text.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precipitation_percent() {
        let mut weekend = WeekendInfo::default();
        assert_eq!(weekend.precipitation_percent(), 0);

        weekend.track_precipitation = Some("15 %".to_string());
        assert_eq!(weekend.precipitation_percent(), 15);

        weekend.track_precipitation = Some("n/a".to_string());
        assert_eq!(weekend.precipitation_percent(), 0);
    }

    #[test]
    fn test_leading_integer_stops_at_first_non_digit() {
        assert_eq!(leading_integer("  42.5 %"), 42);
        assert_eq!(leading_integer(""), 0);
        assert_eq!(leading_integer("99999999999999"), 0);
    }
}
