//! Clipforge-Common: shared option types and small utilities.
//!
//! This crate provides the vocabulary used by the compiler and the engine
//! session:
//!
//! - **Option types**: [`Format`], [`Container`], [`Resolution`], [`FrameRate`]
//!   and the per-run [`ProcessOptions`] value
//! - **Capability**: whether the loaded engine build runs multi-threaded
//! - **Path utilities**: extension and MIME helpers for input files
//! - **Size formatting**: human-readable byte counts for size reports
//!
//! # Examples
//!
//! ```
//! use clipforge_common::{Format, ProcessOptions, Resolution};
//!
//! let options = ProcessOptions::default()
//!     .with_format(Format::Webm)
//!     .with_resolution(Resolution::Hd720);
//! assert_eq!(options.quality, 3);
//! ```

pub mod error;
pub mod options;
pub mod paths;
pub mod size;
pub mod types;

pub use error::{Error, Result};
pub use options::{ProcessOptions, NO_TRIM};
pub use types::*;
