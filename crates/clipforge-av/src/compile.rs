//! Option set → ordered ffmpeg argument sequence.
//!
//! The argument order is fixed and matters: a misplaced flag produces a wrong
//! file rather than an error.
//!
//! 1. `-ss` / `-to` before the input, so trimming happens while demuxing
//! 2. `-i <input>`
//! 3. one `-vf` chain: crop → animated-image sampling rate → scale
//! 4. `-r <fps>` (never for animated images, which are sampled by the chain)
//! 5. video codec and rate control
//! 6. audio codec, or `-an`
//! 7. `-y output.<ext>`

use clipforge_common::paths::extension_of;
use clipforge_common::{Capability, Container, Format, ProcessOptions};

use crate::quality::{self, QualityPlan};
use crate::{aspect, trim};

/// Stem of every output name; the extension comes from the effective container.
const OUTPUT_STEM: &str = "output";

/// Resolve the container a run will actually write.
///
/// `Format::Original` takes the input's extension; a missing or unrecognized
/// extension falls back to mp4.
pub fn effective_container(input_name: &str, format: Format) -> Container {
    format.container().unwrap_or_else(|| {
        extension_of(input_name)
            .and_then(Container::from_extension)
            .unwrap_or(Container::Mp4)
    })
}

/// Engine-side output name for a run.
///
/// Derived from the effective container only, so changing containers never
/// collides with the input name.
pub fn output_file_name(input_name: &str, format: Format) -> String {
    let container = effective_container(input_name, format);
    format!("{OUTPUT_STEM}.{}", container.extension())
}

/// Build the comma-joined video filter graph, or `None` when no stage applies.
pub fn filter_chain(options: &ProcessOptions, container: Container) -> Option<String> {
    let mut filters = Vec::new();

    if let Some(crop) = aspect::resolve(options.aspect_ratio.as_deref()) {
        filters.push(crop);
    }

    if let QualityPlan::AnimatedImage { sample_fps } = quality::plan(options.quality, container) {
        filters.push(format!("fps={sample_fps}"));
    }

    if let Some(scale) = options.resolution.scale() {
        filters.push(format!("scale={scale}"));
    }

    if filters.is_empty() {
        None
    } else {
        Some(filters.join(","))
    }
}

/// Compile an option set into the engine argument sequence.
///
/// Pure and total: the same inputs always yield the same sequence, and no
/// combination of options makes this fail.
pub fn compile(input_name: &str, options: &ProcessOptions, capability: Capability) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    if trim::is_trim_point(&options.start_time) {
        args.extend(["-ss".to_string(), options.start_time.clone()]);
    }
    if trim::is_trim_point(&options.end_time) {
        args.extend(["-to".to_string(), options.end_time.clone()]);
    }

    args.extend(["-i".to_string(), input_name.to_string()]);

    let container = effective_container(input_name, options.format);

    if let Some(chain) = filter_chain(options, container) {
        args.extend(["-vf".to_string(), chain]);
    }

    if !container.is_animated_image() {
        if let Some(fps) = options.frame_rate.fps() {
            args.extend(["-r".to_string(), fps.to_string()]);
        }
    }

    args.extend(quality::codec_args(container, options.quality, capability));
    args.extend(quality::audio_args(container));

    args.extend([
        "-y".to_string(),
        output_file_name(input_name, options.format),
    ]);

    tracing::debug!(
        "Compiled {} arguments for {} -> {} ({})",
        args.len(),
        input_name,
        container,
        capability
    );

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_common::{FrameRate, Resolution};

    fn position(args: &[String], flag: &str) -> usize {
        args.iter()
            .position(|a| a == flag)
            .unwrap_or_else(|| panic!("{flag} missing from {args:?}"))
    }

    #[test]
    fn mp4_720p_trimmed_scenario() {
        let options = ProcessOptions::default()
            .with_format(Format::Mp4)
            .with_resolution(Resolution::Hd720)
            .with_quality(3)
            .with_frame_rate(FrameRate::Fps30)
            .with_trim("00:00:10", "00:01:30");

        let args = compile("input.mp4", &options, Capability::SingleThreaded);

        let expected: Vec<&str> = vec![
            "-ss", "00:00:10", "-to", "00:01:30",
            "-i", "input.mp4",
            "-vf", "scale=1280:-2",
            "-r", "30",
            "-c:v", "libx264", "-crf", "18", "-preset", "fast", "-threads", "1",
            "-refs", "1", "-x264opts", "rc-lookahead=20",
            "-movflags", "+faststart",
            "-c:a", "aac", "-b:a", "128k",
            "-y", "output.mp4",
        ];
        assert_eq!(args, expected);
    }

    #[test]
    fn gif_scenario() {
        let options = ProcessOptions::default()
            .with_format(Format::Gif)
            .with_resolution(Resolution::Sd480)
            .with_quality(1)
            .with_frame_rate(FrameRate::Fps60);

        let args = compile("input.mov", &options, Capability::MultiThreaded);

        assert!(!args.iter().any(|a| a == "-r"));
        assert!(!args.iter().any(|a| a == "-c:v" || a == "-c:a"));
        assert!(args.iter().any(|a| a == "-an"));
        assert_eq!(args[position(&args, "-vf") + 1], "fps=10,scale=854:-2");
        assert_eq!(args.last().unwrap(), "output.gif");
    }

    #[test]
    fn square_crop_comes_first_in_chain() {
        let options = ProcessOptions::default()
            .with_resolution(Resolution::Fhd1080)
            .with_aspect_ratio("1:1");

        let args = compile("input.mp4", &options, Capability::SingleThreaded);
        let chain = &args[position(&args, "-vf") + 1];
        assert_eq!(
            chain,
            "crop=min(iw\\,ih*1.0000):min(ih\\,iw/1.0000),scale=1920:-2"
        );
    }

    #[test]
    fn crop_sampling_scale_order_for_gif() {
        let options = ProcessOptions::default()
            .with_format(Format::Gif)
            .with_resolution(Resolution::Hd720)
            .with_aspect_ratio("16:9");

        let args = compile("input.mp4", &options, Capability::SingleThreaded);
        let chain = &args[position(&args, "-vf") + 1];
        let stages: Vec<&str> = chain.split("),").collect();
        assert!(chain.starts_with("crop="));
        assert!(stages.last().unwrap().ends_with("fps=10,scale=1280:-2"));
    }

    #[test]
    fn no_trim_no_filters() {
        let args = compile("input.mp4", &ProcessOptions::default(), Capability::SingleThreaded);
        assert_eq!(&args[..2], ["-i", "input.mp4"]);
        assert!(!args.iter().any(|a| a == "-vf" || a == "-ss" || a == "-to"));
    }

    #[test]
    fn only_end_time_set() {
        let options = ProcessOptions::default().with_trim("00:00:00", "00:00:42");
        let args = compile("input.mp4", &options, Capability::SingleThreaded);
        assert_eq!(&args[..4], ["-to", "00:00:42", "-i", "input.mp4"]);
    }

    #[test]
    fn malformed_trim_is_dropped() {
        let options = ProcessOptions::default().with_trim("10", "00:1:30");
        let args = compile("input.mp4", &options, Capability::SingleThreaded);
        assert_eq!(args[0], "-i");
    }

    #[test]
    fn unknown_aspect_ratio_equals_none() {
        let base = ProcessOptions::default().with_resolution(Resolution::Hd720);
        let garbage = base.clone().with_aspect_ratio("banana");
        let original = base.clone().with_aspect_ratio("original");

        let expected = compile("input.mp4", &base, Capability::MultiThreaded);
        assert_eq!(compile("input.mp4", &garbage, Capability::MultiThreaded), expected);
        assert_eq!(compile("input.mp4", &original, Capability::MultiThreaded), expected);
    }

    #[test]
    fn original_format_uses_input_extension() {
        let options = ProcessOptions::default().with_format(Format::Original);

        let args = compile("input.webm", &options, Capability::SingleThreaded);
        assert_eq!(args.last().unwrap(), "output.webm");
        assert!(args.iter().any(|a| a == "libvpx-vp9"));
        assert!(args.iter().any(|a| a == "libopus"));

        let args = compile("input.MKV", &options, Capability::SingleThreaded);
        assert_eq!(args.last().unwrap(), "output.mkv");

        let args = compile("input.xyz", &options, Capability::SingleThreaded);
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn output_name_never_follows_input_name() {
        let options = ProcessOptions::default().with_format(Format::Mov);
        let args = compile("input.mp4", &options, Capability::SingleThreaded);
        assert_eq!(args.last().unwrap(), "output.mov");
        assert_eq!(args[args.len() - 2], "-y");
    }

    #[test]
    fn compile_is_deterministic() {
        let options = ProcessOptions::default()
            .with_format(Format::Webm)
            .with_resolution(Resolution::Uhd4k)
            .with_aspect_ratio("21:9")
            .with_frame_rate(FrameRate::Fps24)
            .with_trim("00:00:01", "00:00:02");
        let first = compile("input.avi", &options, Capability::MultiThreaded);
        let second = compile("input.avi", &options, Capability::MultiThreaded);
        assert_eq!(first, second);
    }

    #[test]
    fn frame_rate_follows_filters() {
        let options = ProcessOptions::default()
            .with_resolution(Resolution::Hd720)
            .with_frame_rate(FrameRate::Fps24);
        let args = compile("input.mp4", &options, Capability::SingleThreaded);
        assert!(position(&args, "-vf") < position(&args, "-r"));
        assert!(position(&args, "-r") < position(&args, "-c:v"));
        assert!(position(&args, "-c:v") < position(&args, "-c:a"));
    }
}
