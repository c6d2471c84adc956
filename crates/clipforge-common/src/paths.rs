//! Path utilities for input files.
//!
//! Helpers to pull extensions out of file names and map them to MIME types.
//! The session uses these to name the engine-side input file and to check the
//! input type before a run.

use std::path::Path;

use crate::types::Container;

/// Extension used when a name carries none.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Extensions that map to a MIME type even though they are not output containers.
const EXTRA_VIDEO_TYPES: &[(&str, &str)] = &[
    ("m4v", "video/mp4"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
];

/// Return the extension of a file name, without the dot.
///
/// # Examples
///
/// ```
/// use clipforge_common::paths::extension_of;
///
/// assert_eq!(extension_of("clip.MOV"), Some("MOV"));
/// assert_eq!(extension_of("/tmp/holiday.mp4"), Some("mp4"));
/// assert_eq!(extension_of("README"), None);
/// ```
pub fn extension_of(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}

/// Guess the MIME type of a file from its extension.
///
/// # Examples
///
/// ```
/// use clipforge_common::paths::mime_for_name;
///
/// assert_eq!(mime_for_name("a.mkv"), Some("video/x-matroska"));
/// assert_eq!(mime_for_name("notes.txt"), None);
/// ```
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let ext = extension_of(name)?;
    if let Some(container) = Container::from_extension(ext) {
        return Some(container.mime_type());
    }
    EXTRA_VIDEO_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
}

/// Name under which input bytes are stored in the engine's private storage.
///
/// Keeps the source extension so the engine can pick the right demuxer.
///
/// # Examples
///
/// ```
/// use clipforge_common::paths::engine_input_name;
///
/// assert_eq!(engine_input_name("My Holiday.mov"), "input.mov");
/// assert_eq!(engine_input_name("capture"), "input.mp4");
/// ```
pub fn engine_input_name(source_name: &str) -> String {
    let ext = extension_of(source_name).unwrap_or(DEFAULT_EXTENSION);
    format!("input.{ext}")
}
