use clap::{Args, Parser, Subcommand};
use clipforge_av::Preset;
use clipforge_common::{Format, FrameRate, ProcessOptions, Resolution};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipforge")]
#[command(author, version, about = "Trim, crop, scale and re-encode videos with ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Conversion settings shared by `process` and `args`.
///
/// Unset flags keep the value from the preset, or from `[defaults]` in the
/// config file when no preset is given.
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Start from a named preset (youtube, instagram, whatsapp, custom)
    #[arg(short, long)]
    pub preset: Option<Preset>,

    /// Output format (original, mp4, webm, mkv, avi, mov, gif)
    #[arg(short, long)]
    pub format: Option<Format>,

    /// Output resolution (original, 4k, 1080p, 720p, 480p, 1080p-vertical)
    #[arg(short, long)]
    pub resolution: Option<Resolution>,

    /// Quality tier, 1 (smallest) to 4 (best)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub quality: Option<u8>,

    /// Frame rate (original, 24, 30, 60)
    #[arg(long = "fps")]
    pub frame_rate: Option<FrameRate>,

    /// Trim start, HH:MM:SS
    #[arg(long)]
    pub start: Option<String>,

    /// Trim end, HH:MM:SS
    #[arg(long)]
    pub end: Option<String>,

    /// Crop to an aspect ratio (16:9, 9:16, 4:3, 1:1, 4:5, 1.91:1, 21:9)
    #[arg(short, long)]
    pub aspect: Option<String>,
}

impl OptionArgs {
    /// Resolve the flags on top of `defaults`.
    pub fn resolve(&self, defaults: &ProcessOptions) -> ProcessOptions {
        let mut options = match self.preset {
            Some(preset) => preset.apply(defaults.clone()),
            None => defaults.clone(),
        };

        if let Some(format) = self.format {
            options.format = format;
        }
        if let Some(resolution) = self.resolution {
            options.resolution = resolution;
        }
        if let Some(quality) = self.quality {
            options.quality = quality;
        }
        if let Some(frame_rate) = self.frame_rate {
            options.frame_rate = frame_rate;
        }
        if let Some(start) = &self.start {
            options.start_time = start.clone();
        }
        if let Some(end) = &self.end {
            options.end_time = end.clone();
        }
        if let Some(aspect) = &self.aspect {
            options.aspect_ratio = Some(aspect.clone());
        }

        options
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a single file
    Process {
        /// Input file to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Where to write the result (default: output.<ext> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,

        /// Media duration in seconds, enables end-time validation
        #[arg(long)]
        duration: Option<u64>,

        /// Cancel the conversion after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the final session snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the ffmpeg arguments a conversion would use
    Args {
        /// Input file name (only its extension matters)
        #[arg(required = true)]
        input: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Compile for the single-threaded engine build
        #[arg(long)]
        single_thread: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// List the named presets
    Presets,

    /// Display version information
    Version,
}
