//! Human-readable byte counts.

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count with binary (1024) steps and up to two decimals.
///
/// Trailing zeros are dropped, so 1536 bytes is `1.5 KB` and 1024 is `1 KB`.
///
/// # Examples
///
/// ```
/// use clipforge_common::size::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{rendered} {}", UNITS[unit])
}
