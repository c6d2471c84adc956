//! # clipforge-av
//!
//! Turns a small set of human-facing options into an ordered ffmpeg argument
//! sequence.
//!
//! This crate provides functionality for:
//! - Resolving named aspect ratios to resolution-independent crop filters ([`aspect`])
//! - Mapping ordinal quality tiers to codec rate-control parameters ([`quality`])
//! - Compiling a full option set into engine arguments ([`compile()`])
//! - Validating trim windows and input files before a run ([`validate`])
//! - Named option presets ([`preset`])
//!
//! Compilation is pure and total: unmappable values degrade to a no-op for that
//! one setting, and anything the engine cannot accept is reported by the engine
//! at execution time.
//!
//! ## Example
//!
//! ```
//! use clipforge_av::compile;
//! use clipforge_common::{Capability, Format, FrameRate, ProcessOptions, Resolution};
//!
//! let options = ProcessOptions::default()
//!     .with_format(Format::Mp4)
//!     .with_resolution(Resolution::Hd720)
//!     .with_frame_rate(FrameRate::Fps30);
//! let args = compile("input.mov", &options, Capability::SingleThreaded);
//! assert_eq!(args.last().map(String::as_str), Some("output.mp4"));
//! ```

pub mod aspect;
pub mod compile;
mod error;
pub mod preset;
pub mod quality;
pub mod trim;
pub mod validate;

// Re-exports
pub use compile::{compile, effective_container, output_file_name};
pub use error::{Result, ValidationError};
pub use preset::Preset;
pub use quality::{CodecFamily, QualityPlan};
pub use validate::InputLimits;
