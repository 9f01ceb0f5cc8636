//! Job API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use mediagrab_core::{Job, JobKind, VideoInfo};

use crate::state::AppState;

const INVALID_REQUEST: &str = "Invalid request";
const MSG_DOWNLOAD_STARTED: &str = "Download started";
const MSG_MP3_CONVERSION_STARTED: &str = "MP3 conversion started";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting a download or an MP3 conversion
#[derive(Debug, Deserialize)]
pub struct StartJobBody {
    pub url: String,
    /// Resolution label (`720p`), format id, or `best`. Ignored for MP3.
    #[serde(default)]
    pub quality: Option<String>,
}

/// Request body for a video info query
#[derive(Debug, Deserialize)]
pub struct VideoInfoBody {
    pub url: String,
}

/// Acknowledgement for started jobs and body of every error.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Same as `id`; the web UI tracks jobs under this name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl JobResponse {
    fn started(message: &str, id: String) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            id: Some(id.clone()),
            filename: Some(id),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            id: None,
            filename: None,
        }
    }
}

/// Job snapshot as served by the jobs endpoints
#[derive(Debug, Serialize)]
pub struct JobView {
    pub id: String,
    pub kind: JobKind,
    pub url: String,
    pub quality: Option<String>,
    pub status: String,
    pub progress: f64,
    pub speed: String,
    pub eta: String,
    pub title: String,
    pub message: String,
    pub result_path: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            status: job.status_label().to_string(),
            id: job.id,
            kind: job.kind,
            url: job.source_url,
            quality: job.quality,
            progress: job.progress,
            speed: job.speed,
            eta: job.eta,
            title: job.title,
            message: job.message,
            result_path: job.result_path,
            error: job.error_message,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

type ApiError = (StatusCode, Json<JobResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(JobResponse::error(message)))
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a video download
pub async fn start_download(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StartJobBody>, JsonRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let Json(body) = body.map_err(|e| {
        warn!(error = %e, "Invalid download request body");
        bad_request(INVALID_REQUEST)
    })?;

    info!(url = %body.url, quality = ?body.quality, "Starting download");
    let id = state
        .manager()
        .start_download(&body.url, body.quality.as_deref());

    Ok(Json(JobResponse::started(MSG_DOWNLOAD_STARTED, id)))
}

/// Start an MP3 conversion
pub async fn start_mp3_convert(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StartJobBody>, JsonRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let Json(body) = body.map_err(|e| {
        warn!(error = %e, "Invalid MP3 conversion request body");
        bad_request(INVALID_REQUEST)
    })?;

    info!(url = %body.url, "Starting MP3 conversion");
    let id = state.manager().start_audio_extract(&body.url);

    Ok(Json(JobResponse::started(MSG_MP3_CONVERSION_STARTED, id)))
}

/// Query title, duration and formats of a video
pub async fn video_info(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VideoInfoBody>, JsonRejection>,
) -> Result<Json<VideoInfo>, ApiError> {
    let Json(body) = body.map_err(|_| bad_request(INVALID_REQUEST))?;

    state
        .manager()
        .get_info(&body.url)
        .await
        .map(Json)
        .map_err(|e| bad_request(e.to_string()))
}

/// List all jobs, oldest first
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobView>> {
    Json(
        state
            .manager()
            .list_jobs()
            .into_iter()
            .map(JobView::from)
            .collect(),
    )
}

/// Get a job by ID
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
    state
        .manager()
        .get_job(&id)
        .map(|job| Json(JobView::from(job)))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(JobResponse::error(format!("Job not found: {}", id))),
            )
        })
}
