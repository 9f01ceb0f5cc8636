//! Job records and the snapshots broadcast to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::progress::Stage;

/// What a job retrieves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Video with merged audio.
    Download,
    /// Audio track transcoded to MP3.
    AudioExtract,
    /// Metadata only, no file is written.
    InfoQuery,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Download => "download",
            JobKind::AudioExtract => "audio_extract",
            JobKind::InfoQuery => "info_query",
        }
    }

    /// Prefix of generated job ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            JobKind::Download => "dl",
            JobKind::AudioExtract => "mp3",
            JobKind::InfoQuery => "info",
        }
    }

    /// Label reported as `status` while the job is running.
    pub fn running_label(&self) -> &'static str {
        match self {
            JobKind::Download => "downloading",
            JobKind::AudioExtract => "converting",
            JobKind::InfoQuery => "querying",
        }
    }

    pub fn starting_message(&self) -> &'static str {
        match self {
            JobKind::Download => "Starting download...",
            JobKind::AudioExtract => "Starting MP3 conversion...",
            JobKind::InfoQuery => "Fetching video info...",
        }
    }

    /// Message accompanying a forced 100% at a stage marker.
    pub fn stage_message(&self, stage: Stage) -> &'static str {
        match (self, stage) {
            (JobKind::AudioExtract, Stage::Downloaded) => "MP3 conversion completed, processing...",
            (JobKind::AudioExtract, Stage::PostProcessing) => "Converting to MP3...",
            (_, Stage::Downloaded) => "Download completed, processing...",
            (_, Stage::PostProcessing) => "Converting video...",
        }
    }

    pub fn saved_message(&self, file_name: &str) -> String {
        match self {
            JobKind::AudioExtract => format!("MP3 saved as: {}", file_name),
            _ => format!("Saved as: {}", file_name),
        }
    }

    pub fn failure_message(&self, reason: &str) -> String {
        match self {
            JobKind::AudioExtract => format!("MP3 conversion failed: {}", reason),
            _ => reason.to_string(),
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a job: starting, running, then exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Allowed moves. Terminal states accept nothing, and nothing returns
    /// to `Starting` once the job has moved on.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            JobStatus::Starting => next != JobStatus::Starting,
            JobStatus::Running => next != JobStatus::Starting,
            JobStatus::Completed | JobStatus::Error => false,
        }
    }
}

/// One tracked retrieval task.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub source_url: String,
    pub quality: Option<String>,
    pub status: JobStatus,
    /// Percent in [0, 100].
    pub progress: f64,
    pub speed: String,
    pub eta: String,
    /// Media title once the tool announced its destination, empty before.
    pub title: String,
    pub message: String,
    pub result_path: Option<PathBuf>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: String, kind: JobKind, source_url: String, quality: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            source_url,
            quality,
            status: JobStatus::Starting,
            progress: 0.0,
            speed: String::new(),
            eta: String::new(),
            title: String::new(),
            message: String::new(),
            result_path: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `status` as shown to subscribers.
    pub fn status_label(&self) -> &'static str {
        match self.status {
            JobStatus::Starting => "starting",
            JobStatus::Running => self.kind.running_label(),
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            id: self.id.clone(),
            progress: self.progress,
            speed: self.speed.clone(),
            eta: self.eta.clone(),
            status: self.status_label().to_string(),
            message: self.message.clone(),
        }
    }
}

/// Immutable snapshot pushed to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub id: String,
    pub progress: f64,
    pub speed: String,
    pub eta: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// A requested change to a job, applied by the manager.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub status: JobStatus,
    pub progress: f64,
    pub speed: String,
    pub eta: String,
    pub message: String,
}

impl StateChange {
    pub fn new(status: JobStatus, progress: f64, message: impl Into<String>) -> Self {
        Self {
            status,
            progress,
            speed: String::new(),
            eta: String::new(),
            message: message.into(),
        }
    }

    pub fn with_rate(mut self, speed: impl Into<String>, eta: impl Into<String>) -> Self {
        self.speed = speed.into();
        self.eta = eta.into();
        self
    }
}
