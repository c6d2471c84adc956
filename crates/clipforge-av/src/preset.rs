//! Named option presets for common destinations.

use std::fmt;
use std::str::FromStr;

use clipforge_common::{Format, FrameRate, ProcessOptions, Resolution};
use serde::{Deserialize, Serialize};

/// A bundle of format, resolution, quality and frame-rate settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Youtube,
    Instagram,
    Whatsapp,
    Custom,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Youtube,
        Preset::Instagram,
        Preset::Whatsapp,
        Preset::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Instagram => "instagram",
            Self::Whatsapp => "whatsapp",
            Self::Custom => "custom",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Youtube => "1080p, MP4, High quality",
            Self::Instagram => "Vertical 1080x1920",
            Self::Whatsapp => "Compressed, small size",
            Self::Custom => "Keep source settings",
        }
    }

    fn settings(self) -> (Format, Resolution, u8, FrameRate) {
        match self {
            Self::Youtube => (Format::Mp4, Resolution::Fhd1080, 3, FrameRate::Fps30),
            Self::Instagram => (Format::Mp4, Resolution::Vertical1080, 3, FrameRate::Fps30),
            Self::Whatsapp => (Format::Mp4, Resolution::Sd480, 2, FrameRate::Fps24),
            Self::Custom => (Format::Original, Resolution::Original, 3, FrameRate::Original),
        }
    }

    /// Apply the preset on top of `base`.
    ///
    /// Trim times are kept; the aspect ratio goes back to the source ratio.
    pub fn apply(self, base: ProcessOptions) -> ProcessOptions {
        let (format, resolution, quality, frame_rate) = self.settings();
        ProcessOptions {
            format,
            resolution,
            quality,
            frame_rate,
            aspect_ratio: None,
            ..base
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = clipforge_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| clipforge_common::Error::invalid_input(format!("unknown preset: {s}")))
    }
}
