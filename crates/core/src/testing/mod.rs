//! Testing utilities and a mock retrieval tool.
//!
//! [`MockTool`] implements [`RetrievalTool`](crate::runner::RetrievalTool)
//! by replaying scripted stdout/stderr lines over in-memory pipes, so the
//! real runner, fallback and job manager code can be exercised without the
//! external binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediagrab_core::testing::{fixtures, MockTool, ScriptedRun};
//!
//! let tool = Arc::new(MockTool::new());
//! tool.push_run(ScriptedRun::download("Clip.mp4"));
//!
//! let manager = JobManager::new(&fixtures::fast_config(work_dir), tool.clone(), CommandBuilder::default());
//! ```

mod mock_tool;

pub use mock_tool::{MockTool, ScriptedRun};

use std::time::{Duration, Instant};

use crate::jobs::{Job, JobManager};

/// Polls until job `id` reaches a terminal state.
///
/// # Panics
///
/// Panics if the job is still running after ten seconds.
pub async fn wait_terminal(manager: &JobManager, id: &str) -> Job {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(job) = manager.get_job(id) {
            if job.status.is_terminal() {
                return job;
            }
        }
        assert!(Instant::now() < deadline, "job {} never finished", id);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::Config;

    /// Default configuration with no inter-attempt delay, rooted at `work_dir`.
    pub fn fast_config(work_dir: &Path) -> Config {
        let mut config = Config::default();
        config.jobs.work_dir = work_dir.to_path_buf();
        config.fallback.attempt_delay_ms = 0;
        config
    }

    /// One line of `-j` output with a mix of formats.
    ///
    /// Contains two 720p entries (the first without audio), a video-only
    /// 1080p stream, a storyboard and a 360p stream with only an approximate
    /// size.
    pub fn video_info_json() -> String {
        serde_json::json!({
            "id": "abc123",
            "title": "Test Clip",
            "duration": 125,
            "thumbnail": "https://i.ytimg.com/vi/abc123/maxresdefault.jpg",
            "formats": [
                {
                    "format_id": "sb0",
                    "ext": "mhtml",
                    "vcodec": "none",
                    "acodec": "none"
                },
                {
                    "format_id": "18",
                    "ext": "mp4",
                    "height": 360,
                    "vcodec": "avc1.42001E",
                    "acodec": "mp4a.40.2",
                    "filesize_approx": 5_242_880
                },
                {
                    "format_id": "136",
                    "ext": "mp4",
                    "height": 720,
                    "vcodec": "avc1.4d401f",
                    "acodec": "none",
                    "filesize": 20_000_000
                },
                {
                    "format_id": "22",
                    "ext": "mp4",
                    "height": 720,
                    "vcodec": "avc1.64001F",
                    "acodec": "mp4a.40.2",
                    "filesize": 31_457_280
                },
                {
                    "format_id": "137",
                    "ext": "mp4",
                    "height": 1080,
                    "vcodec": "avc1.640028",
                    "acodec": "none",
                    "filesize": 1_610_612_736
                }
            ]
        })
        .to_string()
    }
}
