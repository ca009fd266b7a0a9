//! Line scanner for metadata that does not parse as YAML
//!
//! Driver and team names occasionally contain characters that make the
//! block invalid YAML. The scanner walks the text line by line and picks up
//! `Key: value` pairs wherever they appear, first occurrence wins, with
//! `SectorStartPct` collected on every occurrence.

/// Values recovered by the line scanner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannedMetadata {
    pub track_display_name: Option<String>,
    pub track_display_short_name: Option<String>,
    pub car_screen_name: Option<String>,
    pub user_name: Option<String>,
    pub track_precipitation: Option<String>,
    pub track_skies: Option<String>,
    pub sector_starts: Vec<f64>,
}

/// Scan `text` for the metadata keys used to describe a session.
pub fn scan_metadata(text: &str) -> ScannedMetadata {
    let mut scanned = ScannedMetadata::default();

    for line in text.lines() {
        let Some((key, value)) = split_key_value(line) else {
            continue;
        };

        let slot = match key {
            "TrackDisplayName" => &mut scanned.track_display_name,
            "TrackDisplayShortName" => &mut scanned.track_display_short_name,
            "CarScreenName" => &mut scanned.car_screen_name,
            "UserName" => &mut scanned.user_name,
            "TrackPrecipitation" => &mut scanned.track_precipitation,
            "TrackSkies" => &mut scanned.track_skies,
            "SectorStartPct" => {
                if let Some(start) = parse_fraction(value) {
                    scanned.sector_starts.push(start);
                }
                continue;
            }
            _ => continue,
        };

        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    scanned
}

/// Split `  - Key: value` into `("Key", "value")`; `None` for empty values.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    let line = line.strip_prefix("- ").unwrap_or(line).trim_start();
    let (key, value) = line.split_once(':')?;
    let value = value.trim();
    if key.is_empty() || key.contains(char::is_whitespace) || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Leading `[0-9.]` run as a float.
fn parse_fraction(value: &str) -> Option<f64> {
    let end = value.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(value.len());
    value[..end].parse().ok()
}
