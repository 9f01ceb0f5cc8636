//! Scripted retrieval tool for testing.

use async_trait::async_trait;
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

use crate::runner::{RetrievalTool, RunnerError, SetupError, ToolProcess};

const PIPE_CAPACITY: usize = 64 * 1024;

/// One scripted action of a fake process.
#[derive(Debug, Clone)]
enum Step {
    Stdout(String),
    Stderr(String),
    Pause(Duration),
    /// Writes a file into the directory of the `-o` output template.
    CreateFile(String),
}

/// What a single fake invocation prints and how it exits.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    steps: Vec<Step>,
    exit_code: Option<i32>,
}

impl ScriptedRun {
    /// A run that exits with status 0.
    pub fn success() -> Self {
        Self::exit(0)
    }

    /// A run that exits with `code`.
    pub fn exit(code: i32) -> Self {
        Self {
            steps: Vec::new(),
            exit_code: Some(code),
        }
    }

    /// A run that ends as if killed by a signal.
    pub fn killed() -> Self {
        Self {
            steps: Vec::new(),
            exit_code: None,
        }
    }

    pub fn stdout(mut self, line: impl Into<String>) -> Self {
        self.steps.push(Step::Stdout(line.into()));
        self
    }

    pub fn stderr(mut self, line: impl Into<String>) -> Self {
        self.steps.push(Step::Stderr(line.into()));
        self
    }

    pub fn pause_ms(mut self, ms: u64) -> Self {
        self.steps.push(Step::Pause(Duration::from_millis(ms)));
        self
    }

    /// Creates `name` next to where the real tool would write its output.
    pub fn create_file(mut self, name: impl Into<String>) -> Self {
        self.steps.push(Step::CreateFile(name.into()));
        self
    }

    /// Typical successful download: destination, progress, merge, result file.
    pub fn download(file_name: &str) -> Self {
        Self::success()
            .stdout(format!("[download] Destination: /unused/{}", file_name))
            .stdout("[download]  25.0% of 10.00MiB at  2.00MiB/s ETA 00:04")
            .stdout("[download]  75.0% of 10.00MiB at  2.00MiB/s ETA 00:01")
            .stdout("[download] 100% of 10.00MiB in 00:05")
            .stdout(format!("[ffmpeg] Merging formats into \"/unused/{}\"", file_name))
            .create_file(file_name)
    }

    /// The upstream service refusing the request.
    pub fn blocked() -> Self {
        Self::exit(1).stderr("ERROR: unable to download video data: HTTP Error 403: Forbidden")
    }
}

/// Mock implementation of the RetrievalTool trait.
///
/// Runs are chosen in this order:
/// - a script registered for the invocation's `--extractor-args` value
/// - the next queued script
/// - the default script, if any
/// - otherwise an empty successful run
///
/// # Example
///
/// ```rust,ignore
/// use mediagrab_core::testing::{MockTool, ScriptedRun};
///
/// let tool = MockTool::new();
/// tool.push_run(ScriptedRun::blocked());
/// tool.push_run(ScriptedRun::download("Clip.mp4"));
///
/// // First profile is blocked, second one succeeds.
/// ```
#[derive(Debug, Default)]
pub struct MockTool {
    queued: Mutex<VecDeque<ScriptedRun>>,
    by_extractor_args: Mutex<HashMap<String, ScriptedRun>>,
    default_run: Mutex<Option<ScriptedRun>>,
    invocations: Mutex<Vec<Vec<String>>>,
    spawn_not_found: Mutex<bool>,
}

impl MockTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script for the next unmatched invocation.
    pub fn push_run(&self, run: ScriptedRun) {
        self.queued.lock().unwrap().push_back(run);
    }

    /// Script used every time `--extractor-args` equals `extractor_args`.
    pub fn set_run_for(&self, extractor_args: impl Into<String>, run: ScriptedRun) {
        self.by_extractor_args
            .lock()
            .unwrap()
            .insert(extractor_args.into(), run);
    }

    /// Script used once the queue is empty.
    pub fn set_default_run(&self, run: ScriptedRun) {
        *self.default_run.lock().unwrap() = Some(run);
    }

    /// Make every spawn fail as if the binary did not exist.
    pub fn fail_spawn_not_found(&self) {
        *self.spawn_not_found.lock().unwrap() = true;
    }

    /// Argument vectors of every invocation so far.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    /// The `--extractor-args` value of each invocation, in order.
    pub fn extractor_args_seen(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .filter_map(|args| value_after(args, "--extractor-args"))
            .collect()
    }

    fn next_run(&self, args: &[String]) -> ScriptedRun {
        if let Some(key) = value_after(args, "--extractor-args") {
            if let Some(run) = self.by_extractor_args.lock().unwrap().get(&key) {
                return run.clone();
            }
        }
        if let Some(run) = self.queued.lock().unwrap().pop_front() {
            return run;
        }
        self.default_run
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(ScriptedRun::success)
    }
}

#[async_trait]
impl RetrievalTool for MockTool {
    fn name(&self) -> &str {
        "mock"
    }

    async fn spawn(&self, args: &[String]) -> Result<ToolProcess, RunnerError> {
        self.invocations.lock().unwrap().push(args.to_vec());

        if *self.spawn_not_found.lock().unwrap() {
            return Err(SetupError::ToolNotFound {
                path: PathBuf::from("mock-yt-dlp"),
            }
            .into());
        }

        let run = self.next_run(args);
        let output_dir = value_after(args, "-o")
            .and_then(|template| Path::new(&template).parent().map(Path::to_path_buf));

        let (mut stdout_w, stdout_r) = tokio::io::duplex(PIPE_CAPACITY);
        let (mut stderr_w, stderr_r) = tokio::io::duplex(PIPE_CAPACITY);
        let (exit_tx, exit_rx) = oneshot::channel();

        tokio::spawn(async move {
            for step in run.steps {
                match step {
                    Step::Stdout(line) => {
                        let _ = stdout_w.write_all(format!("{}\n", line).as_bytes()).await;
                    }
                    Step::Stderr(line) => {
                        let _ = stderr_w.write_all(format!("{}\n", line).as_bytes()).await;
                    }
                    Step::Pause(duration) => tokio::time::sleep(duration).await,
                    Step::CreateFile(name) => {
                        if let Some(ref dir) = output_dir {
                            let _ = tokio::fs::create_dir_all(dir).await;
                            let _ = tokio::fs::write(dir.join(name), b"mock media").await;
                        }
                    }
                }
            }
            drop(stdout_w);
            drop(stderr_w);
            let _ = exit_tx.send(run.exit_code);
        });

        Ok(ToolProcess {
            stdout: Box::new(stdout_r),
            stderr: Box::new(stderr_r),
            exit: async move {
                exit_rx
                    .await
                    .map_err(|_| std::io::Error::other("mock process vanished"))
            }
            .boxed(),
        })
    }
}

fn value_after(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
