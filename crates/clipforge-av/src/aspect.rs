//! Named aspect ratio → centered crop filter.
//!
//! The crop keeps the largest rectangle of the target ratio that fits inside
//! the source frame. Source dimensions are unknown when arguments are
//! compiled, so the filter is written in terms of ffmpeg's `iw`/`ih`:
//!
//! - source wider than the target: width becomes `ih * r`, height is kept
//! - otherwise: width is kept, height becomes `iw / r`
//!
//! `crop` centers the window by default.

/// Known ratio names and their width/height value.
const ASPECT_RATIOS: &[(&str, f64)] = &[
    ("16:9", 16.0 / 9.0),
    ("9:16", 9.0 / 16.0),
    ("4:3", 4.0 / 3.0),
    ("1:1", 1.0),
    ("4:5", 4.0 / 5.0),
    ("1.91:1", 1.91),
    ("21:9", 21.0 / 9.0),
];

/// Name meaning "keep the source aspect ratio".
pub const ORIGINAL: &str = "original";

/// All known ratio names.
pub fn names() -> impl Iterator<Item = &'static str> {
    ASPECT_RATIOS.iter().map(|(name, _)| *name)
}

/// Numeric `width / height` for a named ratio.
pub fn ratio_for(name: &str) -> Option<f64> {
    ASPECT_RATIOS
        .iter()
        .find(|(known, _)| *known == name.trim())
        .map(|(_, ratio)| *ratio)
}

/// Crop filter for a numeric ratio, rendered with four decimal places.
///
/// The commas inside `min()` are escaped so the expression survives inside a
/// comma-separated filter chain.
pub fn crop_filter(ratio: f64) -> String {
    format!("crop=min(iw\\,ih*{ratio:.4}):min(ih\\,iw/{ratio:.4})")
}

/// Resolve an optional ratio name to a crop filter.
///
/// Absent, `original` and unknown names all yield `None`: the compiler then
/// skips the crop stage instead of failing.
pub fn resolve(name: Option<&str>) -> Option<String> {
    let name = name?;
    if name.eq_ignore_ascii_case(ORIGINAL) {
        return None;
    }
    match ratio_for(name) {
        Some(ratio) => Some(crop_filter(ratio)),
        None => {
            tracing::debug!("Unknown aspect ratio {:?}; skipping crop", name);
            None
        }
    }
}
