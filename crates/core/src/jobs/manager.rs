//! Job registry and supervisor.
//!
//! The manager owns every [`Job`] record. Background tasks never touch a
//! record directly; they request changes through [`JobManager::update_state`],
//! which validates the transition, stamps the record and publishes the
//! resulting snapshot to all subscribers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::broadcast::{Broadcaster, Subscriber, SubscriberId};
use crate::classifier::{classify, Verdict};
use crate::command::{CommandBuilder, CommandSpec};
use crate::config::Config;
use crate::fallback::{run_with_fallback, ClientProfile, FallbackPolicy};
use crate::info::{parse_video_info, VideoInfo};
use crate::metrics;
use crate::progress::{ProgressEvent, ProgressParser};
use crate::runner::{self, locate_ffmpeg, run_to_completion, RetrievalTool, SetupError, YtDlpTool};
use crate::source_url::parse_video_url;

use super::error::JobError;
use super::output::{apply_quality_suffix, locate_result};
use super::types::{Job, JobKind, JobStatus, StateChange};

/// Shared state behind a [`JobManager`] handle.
struct ManagerInner {
    tool: Arc<dyn RetrievalTool>,
    builder: CommandBuilder,
    policy: FallbackPolicy,
    info_profile: ClientProfile,
    work_dir: PathBuf,
    minimum_version: String,
    jobs: RwLock<HashMap<String, Job>>,
    broadcaster: Broadcaster,
    /// Last timestamp handed out as a job id suffix.
    last_stamp: AtomicI64,
}

/// Starts jobs, tracks their state and fans out progress.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("tool", &self.inner.tool.name())
            .field("work_dir", &self.inner.work_dir)
            .field("jobs", &self.read_jobs().len())
            .finish()
    }
}

impl JobManager {
    pub fn new(config: &Config, tool: Arc<dyn RetrievalTool>, builder: CommandBuilder) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                tool,
                builder,
                policy: FallbackPolicy::from_config(&config.fallback),
                info_profile: config.fallback.info_profile.clone(),
                work_dir: config.jobs.work_dir.clone(),
                minimum_version: config.tool.minimum_version.clone(),
                jobs: RwLock::new(HashMap::new()),
                broadcaster: Broadcaster::new(config.jobs.subscriber_capacity),
                last_stamp: AtomicI64::new(0),
            }),
        }
    }

    /// Manager driving the real yt-dlp binary described by `config.tool`.
    pub fn from_config(config: &Config) -> Self {
        let tool = YtDlpTool::from_config(&config.tool);
        let builder = CommandBuilder::new(
            locate_ffmpeg(&config.tool),
            config.tool.cookies_from_browser,
        );
        Self::new(config, Arc::new(tool), builder)
    }

    pub fn work_dir(&self) -> &Path {
        &self.inner.work_dir
    }

    /// Verifies the tool runs and reports its version.
    pub async fn check_tool(&self) -> Result<String, SetupError> {
        runner::check_tool(self.inner.tool.as_ref(), &self.inner.minimum_version).await
    }

    /// Registers a job and runs it in the background.
    ///
    /// Returns the new job id immediately. Invalid input does not fail the
    /// call; the job reaches the error state right away instead.
    pub fn start_job(&self, kind: JobKind, url: &str, quality: Option<&str>) -> String {
        let id = self.next_id(kind);
        let quality = quality
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let job = Job::new(id.clone(), kind, url.to_string(), quality.clone());
        let snapshot = job.snapshot();
        self.write_jobs().insert(id.clone(), job);
        self.inner.broadcaster.publish(&snapshot);

        info!(job = %id, kind = kind.as_str(), url, "Job registered");
        metrics::JOBS_STARTED.with_label_values(&[kind.as_str()]).inc();
        metrics::JOBS_ACTIVE.inc();

        let manager = self.clone();
        let job_id = id.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            manager.run_job(job_id, kind, url, quality).await;
        });

        id
    }

    /// Starts a video download at `quality` (`best` when absent).
    pub fn start_download(&self, url: &str, quality: Option<&str>) -> String {
        self.start_job(JobKind::Download, url, quality)
    }

    /// Starts an MP3 extraction.
    pub fn start_audio_extract(&self, url: &str) -> String {
        self.start_job(JobKind::AudioExtract, url, None)
    }

    /// Fetches title, duration and selectable formats with a single
    /// invocation using the info profile.
    pub async fn get_info(&self, url: &str) -> Result<VideoInfo, JobError> {
        let result = self.query_info(url).await;
        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::INFO_QUERIES.with_label_values(&[label]).inc();
        result
    }

    async fn query_info(&self, url: &str) -> Result<VideoInfo, JobError> {
        let canonical = parse_video_url(url)?;
        let spec = CommandSpec {
            kind: JobKind::InfoQuery,
            quality: None,
            url: &canonical,
            output_dir: &self.inner.work_dir,
        };
        let args = self.inner.builder.build(&spec, &self.inner.info_profile);

        debug!(url = %canonical, client = %self.inner.info_profile.name, "Querying video info");
        let output = run_to_completion(
            self.inner.tool.as_ref(),
            &args,
            self.inner.policy.attempt_timeout,
        )
        .await?;

        match classify(output.exit_code, &output.stderr) {
            Verdict::Success => parse_video_info(&output.stdout, &canonical),
            Verdict::Failed(err) => {
                warn!(url = %canonical, error = %err, "Video info query failed");
                Err(err.into())
            }
        }
    }

    /// Applies `change` to job `id` and publishes the new snapshot.
    ///
    /// Unknown ids, changes to a terminal job and moves back to `starting`
    /// are ignored. Returns whether the change was applied.
    pub fn update_state(&self, id: &str, change: StateChange) -> bool {
        self.apply_change(id, change, None)
    }

    fn apply_change(&self, id: &str, change: StateChange, result_path: Option<PathBuf>) -> bool {
        let update = {
            let mut jobs = self.write_jobs();
            let Some(job) = jobs.get_mut(id) else {
                warn!(job = id, "State change for unknown job");
                return false;
            };

            if !job.status.can_transition_to(change.status) {
                warn!(
                    job = id,
                    from = ?job.status,
                    to = ?change.status,
                    "Ignoring state change"
                );
                return false;
            }

            job.status = change.status;
            job.progress = clamp_progress(change.progress);
            job.speed = change.speed;
            job.eta = change.eta;
            if change.status == JobStatus::Error {
                job.error_message = Some(change.message.clone());
            }
            job.message = change.message;
            if result_path.is_some() {
                job.result_path = result_path;
            }
            job.updated_at = Utc::now();
            job.snapshot()
        };

        self.inner.broadcaster.publish(&update);
        true
    }

    fn record_title(&self, id: &str, title: String) {
        if let Some(job) = self.write_jobs().get_mut(id) {
            debug!(job = id, %title, "Title detected");
            job.title = title;
        }
    }

    /// Current state of one job.
    pub fn get_job(&self, id: &str) -> Option<Job> {
        self.read_jobs().get(id).cloned()
    }

    /// All jobs, oldest first.
    pub fn list_jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.read_jobs().values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Attaches a progress subscriber.
    pub fn subscribe(&self) -> Subscriber {
        self.inner.broadcaster.attach()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.broadcaster.detach(id)
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }

    async fn run_job(&self, id: String, kind: JobKind, url: String, quality: Option<String>) {
        let started = Instant::now();

        let result = match kind {
            JobKind::InfoQuery => self.run_info_job(&id, &url).await,
            _ => self
                .run_retrieval(&id, kind, &url, quality.as_deref())
                .await
                .map(|path| {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (kind.saved_message(&name), Some(path))
                }),
        };

        let elapsed = started.elapsed().as_secs_f64();
        metrics::JOBS_ACTIVE.dec();

        match result {
            Ok((message, path)) => {
                info!(job = %id, kind = kind.as_str(), %message, elapsed_secs = elapsed, "Job completed");
                self.apply_change(
                    &id,
                    StateChange::new(JobStatus::Completed, 100.0, message),
                    path,
                );
                metrics::JOBS_COMPLETED.with_label_values(&[kind.as_str()]).inc();
                metrics::JOB_DURATION
                    .with_label_values(&[kind.as_str(), "completed"])
                    .observe(elapsed);
            }
            Err(err) => {
                error!(job = %id, kind = kind.as_str(), error = %err, "Job failed");
                self.update_state(
                    &id,
                    StateChange::new(JobStatus::Error, 0.0, kind.failure_message(&err.to_string())),
                );
                metrics::JOBS_FAILED
                    .with_label_values(&[kind.as_str(), err.label()])
                    .inc();
                metrics::JOB_DURATION
                    .with_label_values(&[kind.as_str(), "error"])
                    .observe(elapsed);
            }
        }
    }

    /// Download or audio extraction: fallback run, then locate the file.
    async fn run_retrieval(
        &self,
        id: &str,
        kind: JobKind,
        url: &str,
        quality: Option<&str>,
    ) -> Result<PathBuf, JobError> {
        let canonical = parse_video_url(url)?;
        let job_dir = self.inner.work_dir.join(id);
        tokio::fs::create_dir_all(&job_dir).await?;

        self.update_state(
            id,
            StateChange::new(JobStatus::Running, 0.0, kind.starting_message()),
        );

        let spec = CommandSpec {
            kind,
            quality,
            url: &canonical,
            output_dir: &job_dir,
        };

        let mut parser = ProgressParser::new();
        let success = run_with_fallback(
            self.inner.tool.as_ref(),
            &self.inner.builder,
            &spec,
            &self.inner.policy,
            |line| {
                for event in parser.parse_line(line) {
                    self.apply_event(id, kind, event);
                }
            },
        )
        .await?;

        info!(
            job = id,
            client = %success.profile,
            attempts = success.attempts,
            "Retrieval finished"
        );

        let path = locate_result(&job_dir).await?;
        if kind == JobKind::Download {
            Ok(apply_quality_suffix(path, quality).await)
        } else {
            Ok(path)
        }
    }

    /// Metadata query run as a tracked job; completes with the title.
    async fn run_info_job(
        &self,
        id: &str,
        url: &str,
    ) -> Result<(String, Option<PathBuf>), JobError> {
        self.update_state(
            id,
            StateChange::new(
                JobStatus::Running,
                0.0,
                JobKind::InfoQuery.starting_message(),
            ),
        );
        let info = self.get_info(url).await?;
        self.record_title(id, info.title.clone());
        Ok((info.title, None))
    }

    fn apply_event(&self, id: &str, kind: JobKind, event: ProgressEvent) {
        match event {
            ProgressEvent::Title(title) => self.record_title(id, title),
            ProgressEvent::Sample {
                progress,
                speed,
                eta,
            } => {
                self.update_state(
                    id,
                    StateChange::new(JobStatus::Running, progress, kind.starting_message())
                        .with_rate(speed, eta),
                );
            }
            ProgressEvent::Stage(stage) => {
                self.update_state(
                    id,
                    StateChange::new(JobStatus::Running, 100.0, kind.stage_message(stage)),
                );
            }
        }
    }

    /// `<prefix>_<microseconds>`, strictly increasing within the process.
    fn next_id(&self, kind: JobKind) -> String {
        let now = Utc::now().timestamp_micros();
        let previous = self
            .inner
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        let stamp = now.max(previous + 1);
        format!("{}_{}", kind.id_prefix(), stamp)
    }

    fn read_jobs(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Job>> {
        self.inner
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_jobs(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Job>> {
        self.inner
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FailureKind;
    use crate::testing::{fixtures, wait_terminal, MockTool, ScriptedRun};
    use tempfile::TempDir;

    fn manager_with(tool: Arc<MockTool>, dir: &TempDir) -> JobManager {
        JobManager::new(
            &fixtures::fast_config(dir.path()),
            tool,
            CommandBuilder::default(),
        )
    }

    #[tokio::test]
    async fn test_download_completes() {
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(MockTool::new());
        tool.push_run(ScriptedRun::download("Clip.mp4"));
        let manager = manager_with(tool.clone(), &dir);

        let id = manager.start_download("https://youtu.be/abc123", Some("720p"));
        assert!(id.starts_with("dl_"));

        let job = wait_terminal(&manager, &id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100.0);
        assert_eq!(job.message, "Saved as: Clip [720p].mp4");
        assert_eq!(job.title, "Clip");
        assert_eq!(
            job.result_path,
            Some(dir.path().join(&id).join("Clip [720p].mp4"))
        );
        assert_eq!(tool.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_id_usable_before_tool_spawns() {
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(MockTool::new());
        tool.push_run(ScriptedRun::download("Clip.mp4"));
        let manager = manager_with(tool.clone(), &dir);

        // The current-thread test runtime cannot run the job task before the
        // first await below.
        let id = manager.start_download("https://youtu.be/abc123", None);
        assert_eq!(tool.invocation_count(), 0);
        let job = manager.get_job(&id).unwrap();
        assert_eq!(job.status, JobStatus::Starting);
        assert_eq!(job.progress, 0.0);

        assert!(!manager.update_state(&id, StateChange::new(JobStatus::Starting, 0.0, "again")));
        assert_eq!(manager.get_job(&id).unwrap().message, job.message);

        let job = wait_terminal(&manager, &id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(tool.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_errors_without_spawning() {
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(MockTool::new());
        let manager = manager_with(tool.clone(), &dir);

        let id = manager.start_audio_extract("https://example.com/watch?v=abc");
        assert!(id.starts_with("mp3_"));

        let job = wait_terminal(&manager, &id).await;
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.message.starts_with("MP3 conversion failed: "));
        assert_eq!(job.error_message.as_deref(), Some(job.message.as_str()));
        assert_eq!(tool.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_terminal_state_is_final() {
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(MockTool::new());
        tool.push_run(ScriptedRun::download("Clip.mp4"));
        let manager = manager_with(tool, &dir);

        let id = manager.start_download("https://youtu.be/abc123", None);
        wait_terminal(&manager, &id).await;

        assert!(!manager.update_state(&id, StateChange::new(JobStatus::Running, 10.0, "late")));
        assert!(!manager.update_state(&id, StateChange::new(JobStatus::Error, 0.0, "late")));
        let job = manager.get_job(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(!manager.update_state("missing", StateChange::new(JobStatus::Running, 0.0, "")));
    }

    #[tokio::test]
    async fn test_progress_is_clamped() {
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(MockTool::new());
        tool.set_default_run(ScriptedRun::success().pause_ms(5_000));
        let manager = manager_with(tool, &dir);

        let id = manager.start_download("https://youtu.be/abc123", None);
        assert!(manager.update_state(&id, StateChange::new(JobStatus::Running, 150.0, "x")));
        assert_eq!(manager.get_job(&id).unwrap().progress, 100.0);
        assert!(manager.update_state(&id, StateChange::new(JobStatus::Running, -3.0, "x")));
        assert_eq!(manager.get_job(&id).unwrap().progress, 0.0);
        assert!(!manager.update_state(&id, StateChange::new(JobStatus::Starting, 0.0, "x")));
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(Arc::new(MockTool::new()), &dir);
        let ids: std::collections::HashSet<_> = (0..50)
            .map(|_| manager.next_id(JobKind::Download))
            .collect();
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test]
    async fn test_get_info() {
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(MockTool::new());
        tool.push_run(ScriptedRun::success().stdout(fixtures::video_info_json()));
        let manager = manager_with(tool.clone(), &dir);

        let info = manager.get_info("https://youtu.be/abc123").await.unwrap();
        assert_eq!(info.title, "Test Clip");
        assert_eq!(info.parsed_url, "https://www.youtube.com/watch?v=abc123");

        let args = &tool.invocations()[0];
        assert!(args.contains(&"-j".to_string()));
        assert!(args.iter().any(|a| a.contains("android_testsuite")));
    }

    #[tokio::test]
    async fn test_get_info_classifies_failure() {
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(MockTool::new());
        tool.push_run(ScriptedRun::exit(1).stderr("ERROR: [youtube] abc123: Private video"));
        let manager = manager_with(tool, &dir);

        let err = manager.get_info("https://youtu.be/abc123").await.unwrap_err();
        assert!(matches!(
            err,
            JobError::Remote(crate::classifier::RemoteError::Rejected(FailureKind::Private))
        ));
    }

    #[tokio::test]
    async fn test_subscriber_sees_lifecycle() {
        let dir = TempDir::new().unwrap();
        let tool = Arc::new(MockTool::new());
        tool.push_run(ScriptedRun::download("Clip.mp4"));
        let manager = manager_with(tool, &dir);
        let mut sub = manager.subscribe();

        let id = manager.start_download("https://youtu.be/abc123", None);
        wait_terminal(&manager, &id).await;

        let mut statuses = Vec::new();
        while let Some(update) = sub.try_recv() {
            assert_eq!(update.id, id);
            statuses.push(update.status);
        }
        assert_eq!(statuses.first().map(String::as_str), Some("starting"));
        assert!(statuses.iter().any(|s| s == "downloading"));
        assert_eq!(statuses.last().map(String::as_str), Some("completed"));
        assert_eq!(
            statuses.iter().filter(|s| *s == "completed").count(),
            1
        );

        assert!(manager.unsubscribe(sub.id()));
    }
}
