//! The per-run option set.

use serde::{Deserialize, Serialize};

use crate::types::{Format, FrameRate, Resolution};

/// Trim sentinel meaning "from the beginning" / "to the end".
pub const NO_TRIM: &str = "00:00:00";

/// Human-facing options for a single run.
///
/// Built once, then handed by value to the session; nothing downstream
/// mutates it. The `with_*` methods consume and return the value so that
/// construction reads as a single expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    /// Output container, or [`Format::Original`] to keep the source container.
    pub format: Format,
    /// Rescale target.
    pub resolution: Resolution,
    /// Ordinal quality tier in `1..=4`; 1 is the smallest file, 4 the best.
    pub quality: u8,
    /// Output frame rate.
    pub frame_rate: FrameRate,
    /// Trim start as `HH:MM:SS`; [`NO_TRIM`] means no trim.
    pub start_time: String,
    /// Trim end as `HH:MM:SS`; [`NO_TRIM`] or empty means "to the end".
    pub end_time: String,
    /// Named aspect ratio such as `"16:9"`; `None` or unknown names mean no crop.
    pub aspect_ratio: Option<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            format: Format::Mp4,
            resolution: Resolution::Original,
            quality: 3,
            frame_rate: FrameRate::Original,
            start_time: NO_TRIM.to_string(),
            end_time: NO_TRIM.to_string(),
            aspect_ratio: None,
        }
    }
}

impl ProcessOptions {
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Set the trim window. Pass [`NO_TRIM`] for either end to leave it open.
    pub fn with_trim(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_time = start.into();
        self.end_time = end.into();
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }
}
