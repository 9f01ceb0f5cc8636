//! Trait definitions for the process runner.

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::io::AsyncRead;

use super::error::RunnerError;

/// Boxed output stream of a running tool.
pub type ToolStream = Box<dyn AsyncRead + Send + Unpin>;

/// A started tool process.
///
/// Dropping `exit` before it resolves must terminate the process; the runner
/// relies on this to enforce attempt timeouts.
pub struct ToolProcess {
    pub stdout: ToolStream,
    pub stderr: ToolStream,
    /// Resolves to the exit code, `None` when killed by a signal.
    pub exit: BoxFuture<'static, std::io::Result<Option<i32>>>,
}

impl std::fmt::Debug for ToolProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolProcess").finish_non_exhaustive()
    }
}

/// Something that can launch the retrieval tool.
#[async_trait]
pub trait RetrievalTool: Send + Sync {
    /// Returns the name of this tool implementation.
    fn name(&self) -> &str;

    /// Starts the tool with `args` and hands back its streams.
    ///
    /// A missing binary must be reported as [`RunnerError::Setup`] so the
    /// fallback driver stops instead of trying every profile.
    async fn spawn(&self, args: &[String]) -> Result<ToolProcess, RunnerError>;
}
