//! Option enums shared by the compiler and the engine session.
//!
//! Every enum serializes to the same lowercase names accepted on the command
//! line, and round-trips through [`std::fmt::Display`] / [`std::str::FromStr`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Requested output format.
///
/// `Original` is the "keep source container" sentinel; it is resolved to a
/// concrete [`Container`] from the input file name at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Keep the source container.
    Original,
    /// MPEG-4 (H.264 + AAC).
    #[default]
    Mp4,
    /// WebM (VP9 + Opus).
    Webm,
    /// Matroska (H.264 + AAC).
    Mkv,
    /// AVI (H.264 + AAC).
    Avi,
    /// QuickTime (H.264 + AAC).
    Mov,
    /// Animated GIF.
    Gif,
}

impl Format {
    /// All formats, in presentation order.
    pub const ALL: [Format; 7] = [
        Format::Original,
        Format::Mp4,
        Format::Webm,
        Format::Mkv,
        Format::Avi,
        Format::Mov,
        Format::Gif,
    ];

    /// The option name of this format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
            Self::Avi => "avi",
            Self::Mov => "mov",
            Self::Gif => "gif",
        }
    }

    /// The concrete container, or `None` for the keep-source sentinel.
    pub fn container(self) -> Option<Container> {
        match self {
            Self::Original => None,
            Self::Mp4 => Some(Container::Mp4),
            Self::Webm => Some(Container::Webm),
            Self::Mkv => Some(Container::Mkv),
            Self::Avi => Some(Container::Avi),
            Self::Mov => Some(Container::Mov),
            Self::Gif => Some(Container::Gif),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_input(format!("unknown format: {s}")))
    }
}

/// Concrete output container once the keep-source sentinel has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
    Mkv,
    Avi,
    Mov,
    Gif,
}

impl Container {
    /// All containers.
    pub const ALL: [Container; 6] = [
        Container::Mp4,
        Container::Webm,
        Container::Mkv,
        Container::Avi,
        Container::Mov,
        Container::Gif,
    ];

    /// File extension (without the dot) used for output names.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
            Self::Avi => "avi",
            Self::Mov => "mov",
            Self::Gif => "gif",
        }
    }

    /// Parse a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.extension().eq_ignore_ascii_case(ext))
    }

    /// MIME type of files in this container.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Mkv => "video/x-matroska",
            Self::Avi => "video/x-msvideo",
            Self::Mov => "video/quicktime",
            Self::Gif => "image/gif",
        }
    }

    /// Animated-image output: no codec parameters, fixed sampling rate, no audio.
    pub fn is_animated_image(self) -> bool {
        matches!(self, Self::Gif)
    }

    /// The web-optimized container, encoded with the alternative codec family.
    pub fn is_web_optimized(self) -> bool {
        matches!(self, Self::Webm)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Target resolution preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// Keep the source dimensions.
    #[default]
    #[serde(rename = "original")]
    Original,
    /// 3840 wide, height follows the source aspect.
    #[serde(rename = "4k")]
    Uhd4k,
    /// 1920 wide, height follows the source aspect.
    #[serde(rename = "1080p")]
    Fhd1080,
    /// 1280 wide, height follows the source aspect.
    #[serde(rename = "720p")]
    Hd720,
    /// 854 wide, height follows the source aspect.
    #[serde(rename = "480p")]
    Sd480,
    /// Fixed 1080x1920 portrait frame.
    #[serde(rename = "1080p-vertical")]
    Vertical1080,
}

impl Resolution {
    /// All resolutions, in presentation order.
    pub const ALL: [Resolution; 6] = [
        Resolution::Original,
        Resolution::Uhd4k,
        Resolution::Fhd1080,
        Resolution::Hd720,
        Resolution::Sd480,
        Resolution::Vertical1080,
    ];

    /// The option name of this resolution.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Uhd4k => "4k",
            Self::Fhd1080 => "1080p",
            Self::Hd720 => "720p",
            Self::Sd480 => "480p",
            Self::Vertical1080 => "1080p-vertical",
        }
    }

    /// Scale filter arguments (`W:H`), or `None` when the source size is kept.
    ///
    /// A height of `-2` keeps the aspect ratio while rounding to an even
    /// number of rows, which most encoders require.
    pub fn scale(self) -> Option<&'static str> {
        match self {
            Self::Original => None,
            Self::Uhd4k => Some("3840:-2"),
            Self::Fhd1080 => Some("1920:-2"),
            Self::Hd720 => Some("1280:-2"),
            Self::Sd480 => Some("854:-2"),
            Self::Vertical1080 => Some("1080:1920"),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_input(format!("unknown resolution: {s}")))
    }
}

/// Output frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameRate {
    /// Keep the source frame rate.
    #[default]
    #[serde(rename = "original")]
    Original,
    #[serde(rename = "24")]
    Fps24,
    #[serde(rename = "30")]
    Fps30,
    #[serde(rename = "60")]
    Fps60,
}

impl FrameRate {
    /// All frame rates, in presentation order.
    pub const ALL: [FrameRate; 4] = [
        FrameRate::Original,
        FrameRate::Fps60,
        FrameRate::Fps30,
        FrameRate::Fps24,
    ];

    /// Frames per second, or `None` when the source rate is kept.
    pub fn fps(self) -> Option<u32> {
        match self {
            Self::Original => None,
            Self::Fps24 => Some(24),
            Self::Fps30 => Some(30),
            Self::Fps60 => Some(60),
        }
    }

    /// The option name of this frame rate.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Fps24 => "24",
            Self::Fps30 => "30",
            Self::Fps60 => "60",
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_suffix("fps").unwrap_or(s);
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_input(format!("unsupported frame rate: {s}")))
    }
}

/// Whether the loaded engine build supports multi-threaded execution.
///
/// `Unknown` until the session reaches `Ready`, fixed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    #[default]
    Unknown,
    MultiThreaded,
    SingleThreaded,
}

impl Capability {
    /// Thread-count hint passed to the encoder: `0` lets the encoder detect
    /// the core count, anything short of confirmed multi-threading forces one.
    pub fn thread_hint(self) -> &'static str {
        match self {
            Self::MultiThreaded => "0",
            Self::SingleThreaded | Self::Unknown => "1",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::MultiThreaded => write!(f, "multi-threaded"),
            Self::SingleThreaded => write!(f, "single-threaded"),
        }
    }
}
