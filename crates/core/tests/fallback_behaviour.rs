//! Client fallback integration tests.
//!
//! Each job walks the client profile catalogue one attempt at a time; these
//! tests script per-profile outcomes and check which profiles were tried.

use std::sync::Arc;

use tempfile::TempDir;

use mediagrab_core::{
    fallback::{default_client_profiles, PLAYER_CLIENT_ARG_PREFIX},
    testing::{fixtures, wait_terminal, MockTool, ScriptedRun},
    CommandBuilder, JobManager, JobStatus,
};

fn setup() -> (Arc<MockTool>, JobManager, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tool = Arc::new(MockTool::new());
    let manager = JobManager::new(
        &fixtures::fast_config(temp_dir.path()),
        tool.clone(),
        CommandBuilder::default(),
    );
    (tool, manager, temp_dir)
}

fn client(name: &str) -> String {
    format!("{}{}", PLAYER_CLIENT_ARG_PREFIX, name)
}

#[tokio::test]
async fn test_blocked_profiles_fall_through_in_order() {
    let (tool, manager, _dir) = setup();
    tool.set_default_run(ScriptedRun::blocked());
    tool.set_run_for(client("mweb"), ScriptedRun::download("Clip.mp4"));

    let id = manager.start_download("https://youtu.be/abc123", None);
    let job = wait_terminal(&manager, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        tool.extractor_args_seen(),
        vec![client("ios"), client("web"), client("mweb")]
    );
}

#[tokio::test]
async fn test_every_profile_tried_before_giving_up() {
    let (tool, manager, _dir) = setup();
    tool.set_default_run(ScriptedRun::blocked());

    let id = manager.start_download("https://youtu.be/abc123", None);
    let job = wait_terminal(&manager, &id).await;

    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.progress, 0.0);
    assert!(job.message.starts_with("All download attempts failed."));

    let expected: Vec<String> = default_client_profiles()
        .into_iter()
        .map(|profile| profile.extractor_args)
        .collect();
    assert_eq!(tool.extractor_args_seen(), expected);
}

#[tokio::test]
async fn test_terminal_failure_still_walks_catalogue() {
    let (tool, manager, _dir) = setup();
    tool.set_run_for(
        client("ios"),
        ScriptedRun::exit(1).stderr("ERROR: [youtube] abc123: Private video. Sign in if you've been granted access"),
    );
    tool.set_default_run(ScriptedRun::download("Clip.mp4"));

    let id = manager.start_download("https://youtu.be/abc123", None);
    let job = wait_terminal(&manager, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(tool.invocation_count(), 2);
}

#[tokio::test]
async fn test_early_error_overrides_clean_exit() {
    let (tool, manager, _dir) = setup();
    tool.set_run_for(
        client("ios"),
        ScriptedRun::success()
            .stderr("ERROR: [youtube] abc123: Video unavailable")
            .stdout("[download]  10.0% of 10.00MiB at  1.00MiB/s ETA 00:09"),
    );
    tool.set_run_for(client("web"), ScriptedRun::download("Clip.mp4"));

    let id = manager.start_audio_extract("https://youtu.be/abc123");
    let job = wait_terminal(&manager, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(tool.invocation_count(), 2);
}

#[tokio::test]
async fn test_capped_exit_code_counts_as_success() {
    let (tool, manager, _dir) = setup();
    tool.push_run(
        ScriptedRun::exit(101)
            .stdout("[info] Maximum number of downloads reached, stopping due to --max-downloads")
            .create_file("Clip.mp4"),
    );

    let id = manager.start_download("https://youtu.be/abc123", None);
    let job = wait_terminal(&manager, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.message, "Saved as: Clip.mp4");
    assert_eq!(tool.invocation_count(), 1);
}

#[tokio::test]
async fn test_capped_exit_code_without_cap_text_moves_on() {
    let (tool, manager, _dir) = setup();
    tool.set_run_for(client("ios"), ScriptedRun::exit(101));
    tool.set_run_for(client("web"), ScriptedRun::download("Clip.mp4"));

    let id = manager.start_download("https://youtu.be/abc123", None);
    let job = wait_terminal(&manager, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(tool.extractor_args_seen(), vec![client("ios"), client("web")]);
}

#[tokio::test]
async fn test_unrecognized_failure_moves_on() {
    let (tool, manager, _dir) = setup();
    tool.push_run(ScriptedRun::exit(2).stderr("something odd happened"));
    tool.push_run(ScriptedRun::download("Clip.mp4"));

    let id = manager.start_download("https://youtu.be/abc123", None);
    let job = wait_terminal(&manager, &id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(tool.invocation_count(), 2);
}
