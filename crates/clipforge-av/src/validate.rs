//! Pre-run validation.
//!
//! Everything here runs before the engine is touched. A failure leaves the
//! session where it was, so the caller can fix the input and retry without
//! reloading anything.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::trim::{is_unset, is_well_formed, seconds_to_time, time_to_seconds};

const MIB: u64 = 1024 * 1024;

/// Limits applied to input files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    /// Largest accepted input, in bytes.
    pub max_input_bytes: u64,
    /// Accepted MIME types.
    pub accepted_types: Vec<String>,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 500 * MIB,
            accepted_types: [
                "video/mp4",
                "video/webm",
                "video/avi",
                "video/x-msvideo",
                "video/quicktime",
                "video/x-matroska",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl InputLimits {
    /// Check an input file's size and type.
    pub fn check(&self, size: u64, mime_type: &str) -> Result<()> {
        if size == 0 {
            return Err(ValidationError::EmptyInput);
        }
        if size > self.max_input_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                max_mb: self.max_input_bytes / MIB,
            });
        }
        if !self
            .accepted_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(mime_type))
        {
            return Err(ValidationError::UnsupportedType {
                mime_type: mime_type.to_string(),
            });
        }
        Ok(())
    }
}

/// Check a trim window.
///
/// Unset times (empty or `00:00:00`) are fine. Set times must be strict
/// `HH:MM:SS`; a set end must come after the start and, when the media
/// duration is known, must not exceed it.
pub fn validate_trim(start: &str, end: &str, duration_secs: Option<u64>) -> Result<()> {
    let start_secs = parse_field("start", start)?.unwrap_or(0);
    let Some(end_secs) = parse_field("end", end)? else {
        return Ok(());
    };

    if end_secs <= start_secs {
        return Err(ValidationError::EndNotAfterStart);
    }
    if let Some(duration) = duration_secs {
        if end_secs > duration {
            return Err(ValidationError::EndBeyondDuration {
                duration: seconds_to_time(duration),
            });
        }
    }
    Ok(())
}

fn parse_field(field: &'static str, value: &str) -> Result<Option<u64>> {
    if is_unset(value) {
        return Ok(None);
    }
    if !is_well_formed(value) {
        return Err(ValidationError::malformed_time(field, value));
    }
    time_to_seconds(value)
        .map(Some)
        .ok_or_else(|| ValidationError::malformed_time(field, value))
}
