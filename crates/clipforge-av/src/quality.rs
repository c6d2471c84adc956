//! Quality tier → codec and rate-control parameters.
//!
//! Tiers are ordinal (1 = smallest file, 4 = best) and never reach the engine
//! directly. Each codec family has its own CRF scale because the numeric
//! ranges of x264 and VP9 are not comparable 1:1.

use clipforge_common::{Capability, Container};

/// Tier used when a value outside `1..=4` slips through.
pub const FALLBACK_TIER: u8 = 2;

/// Sampling rate injected for animated-image output.
pub const ANIMATED_IMAGE_FPS: u32 = 10;

/// x264 CRF per tier.
const X264_CRF: [(u8, u32); 4] = [(1, 28), (2, 23), (3, 18), (4, 15)];

/// VP9 CRF per tier, tuned to roughly match x264 visual quality.
const VP9_CRF: [(u8, u32); 4] = [(1, 40), (2, 33), (3, 26), (4, 20)];

/// Video codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecFamily {
    /// libx264, used for mp4/mkv/avi/mov.
    X264,
    /// libvpx-vp9, used for the web-optimized container.
    Vp9,
}

impl CodecFamily {
    /// Codec family for a container, or `None` for animated-image output.
    pub fn for_container(container: Container) -> Option<Self> {
        if container.is_animated_image() {
            None
        } else if container.is_web_optimized() {
            Some(Self::Vp9)
        } else {
            Some(Self::X264)
        }
    }

    /// Encoder name passed to `-c:v`.
    pub fn encoder(self) -> &'static str {
        match self {
            Self::X264 => "libx264",
            Self::Vp9 => "libvpx-vp9",
        }
    }

    fn table(self) -> &'static [(u8, u32); 4] {
        match self {
            Self::X264 => &X264_CRF,
            Self::Vp9 => &VP9_CRF,
        }
    }

    /// CRF for a tier; unmapped tiers fall back to [`FALLBACK_TIER`].
    pub fn crf(self, tier: u8) -> u32 {
        let table = self.table();
        let lookup = |t: u8| table.iter().find(|(k, _)| *k == t).map(|(_, v)| *v);
        lookup(tier)
            .or_else(|| lookup(FALLBACK_TIER))
            .unwrap_or(table[1].1)
    }
}

/// What a tier resolves to for a given container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPlan {
    /// Encode with a codec at the given CRF.
    Codec { family: CodecFamily, crf: u32 },
    /// Animated image: no codec parameters, fixed sampling rate, no audio.
    AnimatedImage { sample_fps: u32 },
}

/// Resolve a quality tier for a container.
pub fn plan(tier: u8, container: Container) -> QualityPlan {
    match CodecFamily::for_container(container) {
        Some(family) => QualityPlan::Codec {
            family,
            crf: family.crf(tier),
        },
        None => QualityPlan::AnimatedImage {
            sample_fps: ANIMATED_IMAGE_FPS,
        },
    }
}

/// Video codec and rate-control arguments.
///
/// Empty for animated-image output, whose sampling is handled in the filter
/// chain.
pub fn codec_args(container: Container, tier: u8, capability: Capability) -> Vec<String> {
    let (family, crf) = match plan(tier, container) {
        QualityPlan::Codec { family, crf } => (family, crf),
        QualityPlan::AnimatedImage { .. } => return Vec::new(),
    };

    let threads = capability.thread_hint();
    let crf = crf.to_string();

    let mut args: Vec<&str> = match family {
        CodecFamily::Vp9 => vec![
            "-c:v", family.encoder(),
            "-crf", crf.as_str(),
            "-b:v", "0",
            "-threads", threads,
            "-cpu-used", "5",
            "-row-mt", "1",
        ],
        CodecFamily::X264 => vec![
            "-c:v", family.encoder(),
            "-crf", crf.as_str(),
            "-preset", "fast",
            "-threads", threads,
            "-refs", "1",
            "-x264opts", "rc-lookahead=20",
        ],
    };

    // Moov atom up front so the file plays while downloading.
    if container == Container::Mp4 {
        args.extend(["-movflags", "+faststart"]);
    }

    args.into_iter().map(String::from).collect()
}

/// Audio arguments for a container.
pub fn audio_args(container: Container) -> Vec<String> {
    let args: &[&str] = if container.is_animated_image() {
        &["-an"]
    } else if container.is_web_optimized() {
        &["-c:a", "libopus"]
    } else {
        &["-c:a", "aac", "-b:a", "128k"]
    };
    args.iter().map(|s| s.to_string()).collect()
}
