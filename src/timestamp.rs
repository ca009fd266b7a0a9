//! Capture timestamps
//!
//! The disk sub-header carries the session start as unix seconds. Captures
//! without it fall back to the name the sim gives the file, which ends in
//! `YYYY-MM-DD HH-MM-SS.ibt`.
//!
//! Both sources resolve to local wall-clock time, the clock the sim uses for
//! file names, so ordering and daily grouping never mix clocks.

use crate::ibt::DiskSubHeader;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

const FILE_EXTENSION: &str = ".ibt";

/// Start of the capture: disk sub-header first, then the file name.
pub fn capture_timestamp(file_name: &str, disk: Option<&DiskSubHeader>) -> Option<NaiveDateTime> {
    disk.and_then(disk_timestamp).or_else(|| parse_filename_timestamp(file_name))
}

/// Local start time from the disk sub-header, when recorded.
pub fn disk_timestamp(disk: &DiskSubHeader) -> Option<NaiveDateTime> {
    disk_timestamp_in(disk, &Local)
}

/// Start time from the disk sub-header as wall-clock time in `zone`.
pub fn disk_timestamp_in<Tz: TimeZone>(disk: &DiskSubHeader, zone: &Tz) -> Option<NaiveDateTime> {
    if disk.start_date <= 0 {
        return None;
    }
    let utc = DateTime::from_timestamp(disk.start_date, 0)?;
    Some(utc.with_timezone(zone).naive_local())
}

/// Parse the trailing `YYYY-MM-DD HH-MM-SS.ibt` of a file name.
///
/// ```rust
/// use pitlog::timestamp::parse_filename_timestamp;
///
/// let ts = parse_filename_timestamp("ferrari296gt3_monza full 2024-09-13 11-43-43.ibt");
/// assert_eq!(ts.map(|t| t.to_string()).as_deref(), Some("2024-09-13 11:43:43"));
/// assert!(parse_filename_timestamp("practice.ibt").is_none());
/// ```
pub fn parse_filename_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name.strip_suffix(FILE_EXTENSION)?;

    let time_start = stem.len().checked_sub(8)?;
    let time_text = stem.get(time_start..)?;
    let rest = &stem[..time_start];

    let trimmed = rest.trim_end();
    if trimmed.len() == rest.len() {
        return None;
    }
    let date_start = trimmed.len().checked_sub(10)?;
    let date_text = trimmed.get(date_start..)?;

    if !shape_matches(date_text, "dddd-dd-dd") || !shape_matches(time_text, "dd-dd-dd") {
        return None;
    }

    let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time_text, "%H-%M-%S").ok()?;
    Some(date.and_time(time))
}

/// `d` matches an ASCII digit, any other pattern byte matches itself.
fn shape_matches(text: &str, pattern: &str) -> bool {
    text.len() == pattern.len()
        && text.bytes().zip(pattern.bytes()).all(|(c, p)| match p {
            b'd' => c.is_ascii_digit(),
            _ => c == p,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(start_date: i64) -> DiskSubHeader {
        DiskSubHeader { start_date, start_time: 0.0, end_time: 0.0, lap_count: 0, record_count: 0 }
    }

    #[test]
    fn test_filename_timestamp() {
        let ts = parse_filename_timestamp("car_track 2024-01-05 09-07-03.ibt").expect("timestamp");
        assert_eq!(ts.to_string(), "2024-01-05 09:07:03");

        let ts = parse_filename_timestamp("2024-01-05   23-59-59.ibt").expect("timestamp");
        assert_eq!(ts.to_string(), "2024-01-05 23:59:59");
    }

    #[test]
    fn test_filename_without_timestamp() {
        for name in [
            "session.ibt",
            "2024-01-05 09-07-03.IBT",
            "2024-01-0509-07-03.ibt",
            "2024-13-05 09-07-03.ibt",
            "2024-01-05 9-07-03.ibt",
            "x 2024-01-05 09-07-03.ibt.bak",
        ] {
            assert!(parse_filename_timestamp(name).is_none(), "{name} should not parse");
        }
    }

    #[test]
    fn test_disk_header_takes_priority() {
        let name = "car_track 2024-01-05 09-07-03.ibt";
        let header = disk(1_726_227_823);
        let ts = capture_timestamp(name, Some(&header));
        assert!(ts.is_some());
        assert_eq!(ts, disk_timestamp(&header));

        let ts = capture_timestamp(name, Some(&disk(0))).expect("timestamp");
        assert_eq!(ts.to_string(), "2024-01-05 09:07:03");

        assert!(capture_timestamp("session.ibt", None).is_none());
    }

    #[test]
    fn test_disk_start_is_wall_clock_time() {
        use chrono::{FixedOffset, Utc};

        let header = disk(1_726_227_823);
        let utc = disk_timestamp_in(&header, &Utc).expect("timestamp");
        assert_eq!(utc.to_string(), "2024-09-13 11:43:43");

        // An evening session west of UTC stays on its local date
        let header = disk(1_726_272_000);
        let chicago = FixedOffset::west_opt(5 * 3600).expect("offset");
        let local = disk_timestamp_in(&header, &chicago).expect("timestamp");
        assert_eq!(local.to_string(), "2024-09-13 19:00:00");
        let utc_date = disk_timestamp_in(&header, &Utc).map(|t| t.date().to_string());
        assert_eq!(utc_date.as_deref(), Some("2024-09-14"));

        assert!(disk_timestamp_in(&disk(0), &Utc).is_none());
    }
}
