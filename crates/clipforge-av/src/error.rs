//! Error types for clipforge-av.
//!
//! Compilation itself never fails; these errors come from the pre-run
//! validation in [`crate::validate`].

/// Result type alias using [`ValidationError`].
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Problems detected before a run touches the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A trim time is neither the sentinel nor strict `HH:MM:SS`.
    #[error("{field} time must be HH:MM:SS, got {value:?}")]
    MalformedTime { field: &'static str, value: String },

    /// The trim end does not come after the trim start.
    #[error("End time must be after start time")]
    EndNotAfterStart,

    /// The trim end lies past the end of the media.
    #[error("End time cannot exceed video duration ({duration})")]
    EndBeyondDuration { duration: String },

    /// The input file has no bytes.
    #[error("input file is empty")]
    EmptyInput,

    /// The input file exceeds the configured size limit.
    #[error("File too large. Maximum size is {max_mb}MB")]
    FileTooLarge { size: u64, max_mb: u64 },

    /// The input file's type is not in the accepted list.
    #[error("Invalid file type {mime_type:?}. Please provide a video file.")]
    UnsupportedType { mime_type: String },
}

impl ValidationError {
    /// Create a malformed time error.
    pub fn malformed_time(field: &'static str, value: impl Into<String>) -> Self {
        Self::MalformedTime {
            field,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_time_display() {
        let err = ValidationError::malformed_time("start", "1:2:3");
        assert_eq!(err.to_string(), "start time must be HH:MM:SS, got \"1:2:3\"");
    }

    #[test]
    fn too_large_display() {
        let err = ValidationError::FileTooLarge {
            size: 600 * 1024 * 1024,
            max_mb: 500,
        };
        assert_eq!(err.to_string(), "File too large. Maximum size is 500MB");
    }
}
