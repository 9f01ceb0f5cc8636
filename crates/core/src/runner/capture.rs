//! Buffered runs for short invocations (metadata queries, version check).

use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use super::attempt::with_timeout;
use super::error::{RunnerError, SetupError};
use super::traits::{RetrievalTool, ToolProcess, ToolStream};

const VERSION_FLAG: &str = "--version";
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a short run printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the tool and buffers both streams until it exits.
pub async fn run_to_completion(
    tool: &dyn RetrievalTool,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<CapturedOutput, RunnerError> {
    let ToolProcess {
        stdout,
        stderr,
        exit,
    } = tool.spawn(args).await?;

    with_timeout(timeout, async move {
        let (stdout, stderr) = tokio::try_join!(read_all(stdout), read_all(stderr))?;
        let exit_code = exit.await?;
        Ok::<_, RunnerError>(CapturedOutput {
            stdout,
            stderr,
            exit_code,
        })
    })
    .await
}

async fn read_all(mut stream: ToolStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Runs `--version` and returns the trimmed version string.
///
/// Versions sorting below `minimum_version` are only reported, the tool is
/// still usable.
pub async fn check_tool(
    tool: &dyn RetrievalTool,
    minimum_version: &str,
) -> Result<String, SetupError> {
    let output = run_to_completion(tool, &[VERSION_FLAG.to_string()], Some(VERSION_CHECK_TIMEOUT))
        .await
        .map_err(|e| match e {
            RunnerError::Setup(setup) => setup,
            other => SetupError::ToolCheckFailed {
                reason: other.to_string(),
            },
        })?;

    if !output.success() {
        return Err(SetupError::ToolCheckFailed {
            reason: match output.exit_code {
                Some(code) => format!("exit status {}: {}", code, output.stderr.trim()),
                None => "terminated by signal".to_string(),
            },
        });
    }

    let version = output.stdout.trim().to_string();
    if version.is_empty() {
        return Err(SetupError::ToolCheckFailed {
            reason: "empty version output".to_string(),
        });
    }

    if version.as_str() < minimum_version {
        warn!(
            tool = tool.name(),
            %version,
            minimum = minimum_version,
            "Retrieval tool may be outdated, consider updating it"
        );
    } else {
        info!(tool = tool.name(), %version, "Retrieval tool ready");
    }

    Ok(version)
}
