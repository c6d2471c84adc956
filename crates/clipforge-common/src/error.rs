//! Common error type used when parsing option values.

/// Common error type for clipforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An option value could not be parsed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the common error type.
pub type Result<T> = std::result::Result<T, Error>;
