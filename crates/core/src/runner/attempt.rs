//! One streamed attempt: two readers, one early-error slot.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::classifier::{classify, detect_early, FailureKind, RemoteError, Verdict};
use crate::progress::is_progress_line;

use super::error::RunnerError;
use super::traits::{RetrievalTool, ToolProcess, ToolStream};

/// What a finished attempt amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub verdict: Verdict,
    pub exit_code: Option<i32>,
    /// Set when stderr announced the failure before the tool exited.
    pub early_failure: Option<FailureKind>,
}

/// Runs the tool once, feeding stdout lines to `on_line` as they arrive.
///
/// Stderr is drained by a separate task. The first stderr line that carries
/// the error marker and matches a known failure fills a single slot; from then
/// on stdout is still drained but no longer forwarded, and the attempt fails
/// with that kind no matter how the process exits.
pub async fn run_attempt<F>(
    tool: &dyn RetrievalTool,
    args: &[String],
    timeout: Option<Duration>,
    on_line: F,
) -> Result<AttemptOutcome, RunnerError>
where
    F: FnMut(&str) + Send,
{
    let process = tool.spawn(args).await?;
    with_timeout(timeout, stream_attempt(process, on_line)).await
}

async fn stream_attempt<F>(process: ToolProcess, mut on_line: F) -> Result<AttemptOutcome, RunnerError>
where
    F: FnMut(&str) + Send,
{
    let ToolProcess {
        stdout,
        stderr,
        exit,
    } = process;

    let early: Arc<OnceLock<FailureKind>> = Arc::new(OnceLock::new());
    let stderr_task = tokio::spawn(drain_stderr(stderr, Arc::clone(&early)));

    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut notable = String::new();
    let mut suppressing = false;

    while let Some(line) = next_line_lossy(&mut reader, &mut buf).await? {
        debug!(line = %line, "tool stdout");

        if !is_progress_line(&line) {
            notable.push_str(&line);
            notable.push('\n');
        }

        if let Some(kind) = early.get() {
            if !suppressing {
                warn!(kind = kind.as_str(), "Early error detected, suppressing progress");
                suppressing = true;
            }
            continue;
        }

        on_line(&line);
    }

    let mut output = stderr_task.await.map_err(std::io::Error::other)??;
    let exit_code = exit.await?;
    output.push_str(&notable);

    let early_failure = early.get().copied();
    let verdict = match early_failure {
        Some(kind) => Verdict::Failed(RemoteError::Rejected(kind)),
        None => classify(exit_code, &output),
    };

    debug!(?exit_code, ?verdict, "Attempt finished");

    Ok(AttemptOutcome {
        verdict,
        exit_code,
        early_failure,
    })
}

async fn drain_stderr(
    stderr: ToolStream,
    early: Arc<OnceLock<FailureKind>>,
) -> std::io::Result<String> {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut text = String::new();

    while let Some(line) = next_line_lossy(&mut reader, &mut buf).await? {
        debug!(line = %line, "tool stderr");

        if early.get().is_none() {
            if let Some(kind) = detect_early(&line) {
                let _ = early.set(kind);
            }
        }

        text.push_str(&line);
        text.push('\n');
    }

    Ok(text)
}

/// Reads one line, tolerating invalid UTF-8 in file names.
pub(crate) async fn next_line_lossy<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// Bounds `fut` when a limit is configured. Dropping the future drops the
/// process handle, which kills the child.
pub(crate) async fn with_timeout<T, Fut>(
    limit: Option<Duration>,
    fut: Fut,
) -> Result<T, RunnerError>
where
    Fut: Future<Output = Result<T, RunnerError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| RunnerError::Timeout {
                timeout_secs: limit.as_secs(),
            })?,
        None => fut.await,
    }
}
