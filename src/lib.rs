//! Clipforge - video conversion through an ffmpeg engine session
//!
//! This library crate exposes configuration loading for the binary and for
//! integration testing.

pub mod config;
