//! `HH:MM:SS` trim times.

use std::sync::OnceLock;

use clipforge_common::NO_TRIM;
use regex::Regex;

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{2}:[0-9]{2}:[0-9]{2}$").expect("static pattern"))
}

/// Whether `time` is strict `HH:MM:SS`.
pub fn is_well_formed(time: &str) -> bool {
    time_pattern().is_match(time)
}

/// Whether `time` is the "no trim" sentinel (or left empty).
pub fn is_unset(time: &str) -> bool {
    time.is_empty() || time == NO_TRIM
}

/// Whether `time` should produce a trim flag: set and well-formed.
pub fn is_trim_point(time: &str) -> bool {
    !is_unset(time) && is_well_formed(time)
}

/// Parse `HH:MM:SS` into seconds.
///
/// Returns `None` unless the text has exactly three numeric components.
///
/// # Examples
///
/// ```
/// use clipforge_av::trim::time_to_seconds;
///
/// assert_eq!(time_to_seconds("00:01:30"), Some(90));
/// assert_eq!(time_to_seconds("1:30"), None);
/// ```
pub fn time_to_seconds(time: &str) -> Option<u64> {
    let mut parts = time.split(':').map(|part| part.parse::<u64>().ok());
    let (h, m, s) = (parts.next()??, parts.next()??, parts.next()??);
    if parts.next().is_some() {
        return None;
    }
    Some(h * 3600 + m * 60 + s)
}

/// Render seconds as zero-padded `HH:MM:SS`.
///
/// # Examples
///
/// ```
/// use clipforge_av::trim::seconds_to_time;
///
/// assert_eq!(seconds_to_time(3725), "01:02:05");
/// ```
pub fn seconds_to_time(seconds: u64) -> String {
    let hrs = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hrs:02}:{mins:02}:{secs:02}")
}
