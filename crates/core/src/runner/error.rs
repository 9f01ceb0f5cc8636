//! Error types for the process runner.

use std::path::PathBuf;
use thiserror::Error;

/// The retrieval tool cannot be used at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// Binary missing from both the dependencies directory and PATH.
    #[error("retrieval tool not found at {}", path.display())]
    ToolNotFound { path: PathBuf },

    /// The tool exists but `--version` did not succeed.
    #[error("retrieval tool check failed: {reason}")]
    ToolCheckFailed { reason: String },
}

/// Errors raised while running a single attempt.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// Pipe or wait failure.
    #[error("I/O error while running the retrieval tool: {0}")]
    Io(#[from] std::io::Error),

    /// The attempt exceeded the configured bound and was killed.
    #[error("attempt timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

impl RunnerError {
    /// Whether trying another client profile is pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup(_))
    }
}
