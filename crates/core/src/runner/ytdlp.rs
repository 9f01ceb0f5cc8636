//! The real retrieval tool, launched as a child process.

use async_trait::async_trait;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ToolConfig;

use super::error::{RunnerError, SetupError};
use super::traits::{RetrievalTool, ToolProcess};

/// yt-dlp driven through `tokio::process`.
#[derive(Debug, Clone)]
pub struct YtDlpTool {
    path: PathBuf,
}

impl YtDlpTool {
    /// Creates a tool that runs the binary at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves the binary from the dependencies directory, falling back to PATH.
    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(locate_binary(&config.dependencies_dir, &config.ytdlp_binary))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RetrievalTool for YtDlpTool {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn spawn(&self, args: &[String]) -> Result<ToolProcess, RunnerError> {
        debug!(tool = %self.path.display(), ?args, "Spawning retrieval tool");

        let mut child = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RunnerError::Setup(SetupError::ToolNotFound {
                        path: self.path.clone(),
                    })
                } else {
                    RunnerError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr was not captured"))?;

        Ok(ToolProcess {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            exit: async move { child.wait().await.map(|status| status.code()) }.boxed(),
        })
    }
}

/// `<dir>/<binary>` when it exists, otherwise the bare name for PATH lookup.
pub fn locate_binary(dependencies_dir: &Path, binary: &str) -> PathBuf {
    let bundled = dependencies_dir.join(binary);
    if bundled.is_file() {
        bundled
    } else {
        PathBuf::from(binary)
    }
}

/// Location to hand to `--ffmpeg-location`, if one is needed.
///
/// A bundled binary is passed explicitly. One on PATH is found by the
/// retrieval tool itself, so no flag is needed. When neither exists the
/// jobs still run; merging and audio extraction will fail downstream.
pub fn locate_ffmpeg(config: &ToolConfig) -> Option<PathBuf> {
    let bundled = config.dependencies_dir.join(&config.ffmpeg_binary);
    if bundled.is_file() {
        debug!(path = %bundled.display(), "Using bundled conversion tool");
        return Some(bundled);
    }

    if find_in_path(&config.ffmpeg_binary).is_none() {
        warn!(
            binary = %config.ffmpeg_binary,
            dir = %config.dependencies_dir.display(),
            "Conversion tool not found, merging and MP3 extraction may fail"
        );
    }
    None
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}
