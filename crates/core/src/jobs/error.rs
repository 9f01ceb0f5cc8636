//! Error types for jobs and metadata queries.

use std::path::PathBuf;
use thiserror::Error;

use crate::classifier::RemoteError;
use crate::runner::{RunnerError, SetupError};
use crate::source_url::InputError;

/// Everything that can end a job or a metadata query.
///
/// Only the `Display` text crosses the core boundary.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("retrieval tool failed: {0}")]
    Runner(RunnerError),

    /// Every client profile was tried without success.
    #[error("All download attempts failed. YouTube is blocking requests. Please try again in a few hours or try a different video.")]
    AllAttemptsFailed { attempts: usize, last: String },

    #[error("no media file found in {}", dir.display())]
    ResultNotFound { dir: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse video info: {0}")]
    InfoParse(String),
}

impl From<RunnerError> for JobError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Setup(setup) => JobError::Setup(setup),
            other => JobError::Runner(other),
        }
    }
}

impl JobError {
    /// Metrics label.
    pub fn label(&self) -> &'static str {
        match self {
            JobError::Input(_) => "input",
            JobError::Setup(_) => "setup",
            JobError::Remote(err) => err.label(),
            JobError::Runner(_) => "runner",
            JobError::AllAttemptsFailed { .. } => "all_attempts_failed",
            JobError::ResultNotFound { .. } => "result_not_found",
            JobError::Io(_) => "io",
            JobError::InfoParse(_) => "info_parse",
        }
    }
}
