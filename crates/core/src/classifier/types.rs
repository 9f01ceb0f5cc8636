//! Typed failure reasons reported by the retrieval tool.

use serde::Serialize;
use thiserror::Error;

/// A failure the tool reported in a recognizable way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unavailable,
    UpstreamBlocked,
    RequiresAuthentication,
    FragmentsUnavailable,
    Private,
    Removed,
}

impl FailureKind {
    /// Whether a different client profile has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamBlocked | Self::RequiresAuthentication | Self::FragmentsUnavailable
        )
    }

    /// Human readable message shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unavailable => "video is unavailable or private",
            Self::UpstreamBlocked => {
                "youtube blocked the request. Try a different video or wait a moment."
            }
            Self::RequiresAuthentication => "video requires sign-in or is age-restricted",
            Self::FragmentsUnavailable => {
                "video fragments are unavailable. This video may be corrupted or restricted"
            }
            Self::Private => "this is a private video",
            Self::Removed => "video is unavailable or has been removed",
        }
    }

    /// Stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::UpstreamBlocked => "upstream_blocked",
            Self::RequiresAuthentication => "requires_authentication",
            Self::FragmentsUnavailable => "fragments_unavailable",
            Self::Private => "private",
            Self::Removed => "removed",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Failure of one attempt as seen from the tool's output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("{0}")]
    Rejected(FailureKind),

    #[error("Download failed: {0}")]
    Unspecified(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected(kind) => kind.is_retryable(),
            Self::Unspecified(_) => false,
        }
    }

    /// Metrics label; unrecognized failures share one bucket.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rejected(kind) => kind.as_str(),
            Self::Unspecified(_) => "unspecified",
        }
    }
}

/// Outcome of classifying a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failed(RemoteError),
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
