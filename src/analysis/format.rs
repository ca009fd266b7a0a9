//! Display formatting for lap times and durations

/// Longest time rendered as a lap time, in seconds.
const MAX_DISPLAY_LAP: f64 = 600.0;

/// Format seconds as `M:SS.mmm`; `None` outside `(0, 600]`.
///
/// ```rust
/// use pitlog::analysis::format_lap_time;
///
/// assert_eq!(format_lap_time(90.2).as_deref(), Some("1:30.200"));
/// assert_eq!(format_lap_time(0.0), None);
/// ```
pub fn format_lap_time(seconds: f64) -> Option<String> {
    if !(seconds > 0.0 && seconds <= MAX_DISPLAY_LAP) {
        return None;
    }
    let total_millis = (seconds * 1000.0).round() as u64;
    let minutes = total_millis / 60_000;
    let millis = total_millis % 60_000;
    Some(format!("{}:{:02}.{:03}", minutes, millis / 1000, millis % 1000))
}

/// Format seconds as `H:MM:SS`, truncating fractions; `"0:00:00"` for non-positive input.
pub fn format_duration(seconds: f64) -> String {
    if !(seconds > 0.0) {
        return "0:00:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}:{:02}", whole / 3600, (whole % 3600) / 60, whole % 60)
}

/// Format a spread in seconds as `1.234s`; `None` when there is no spread.
pub fn format_range(seconds: f64) -> Option<String> {
    (seconds != 0.0 && seconds.is_finite()).then(|| format!("{:.3}s", seconds))
}
