//! Error types for clipforge-engine.

use clipforge_av::ValidationError;

use crate::session::Phase;

/// Errors raised by an engine implementation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine build could not be loaded.
    #[error("engine load failed: {0}")]
    Load(String),

    /// An I/O error occurred in the engine's storage or process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file name is not a plain name inside the engine's storage.
    #[error("invalid engine file name: {0:?}")]
    InvalidName(String),

    /// The named file does not exist in the engine's storage.
    #[error("engine file not found: {0}")]
    NotFound(String),

    /// Executing an argument sequence failed.
    #[error("engine execution failed: {0}")]
    Exec(String),

    /// The engine stopped because it was asked to abort.
    #[error("engine aborted")]
    Aborted,
}

impl EngineError {
    /// Create a load error.
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }

    /// Create an execution error.
    pub fn exec(message: impl Into<String>) -> Self {
        Self::Exec(message.into())
    }
}

/// Errors surfaced by [`crate::EngineSession`].
///
/// Cleanup failures never appear here: they are logged and swallowed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Both engine builds failed to load. Terminal until `reset()`.
    #[error("failed to load engine: {0}")]
    Load(String),

    /// The run was refused before touching the engine.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The engine rejected the arguments or failed mid-run.
    #[error("conversion failed: {message}")]
    Execution {
        /// What failed.
        message: String,
        /// The last log line the engine emitted before failing.
        last_log: String,
    },

    /// The run was cancelled.
    #[error("conversion cancelled")]
    Cancelled,

    /// No engine has been loaded yet.
    #[error("engine not loaded; call load() first")]
    NotReady,

    /// Another load or run is in flight.
    #[error("session is busy ({0})")]
    Busy(Phase),

    /// The operation is not allowed in the current phase.
    #[error("cannot {operation} while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },
}

impl SessionError {
    /// Create an execution error carrying the engine's last log line.
    pub fn execution(message: impl Into<String>, last_log: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            last_log: last_log.into(),
        }
    }

    /// Whether the session can be used again without `reset()`.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotReady | Self::Busy(_) | Self::InvalidState { .. }
        )
    }
}
