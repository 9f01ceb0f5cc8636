//! Video URL validation and normalization.
//!
//! Every job and metadata query goes through [`parse_video_url`] before the
//! retrieval tool is launched, so the tool always sees the canonical
//! `watch?v=` form regardless of what the user pasted.

use thiserror::Error;
use url::Url;

const YOUTUBE_DOMAIN: &str = "youtube.com";
const SHORT_DOMAIN: &str = "youtu.be";
const EMBED_PATH: &str = "/embed/";
const VIDEO_PARAM: &str = "v";

/// Input rejected before any subprocess is spawned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("not a YouTube URL: {0}")]
    UnsupportedHost(String),

    #[error("could not extract video ID from URL")]
    MissingVideoId,
}

/// Builds the canonical watch URL for a video identifier.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Validates a user supplied URL and returns its canonical watch URL.
pub fn parse_video_url(input: &str) -> Result<String, InputError> {
    let parsed = Url::parse(input.trim()).map_err(|e| InputError::InvalidUrl(e.to_string()))?;

    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    if !host.contains(YOUTUBE_DOMAIN) && !host.contains(SHORT_DOMAIN) {
        return Err(InputError::UnsupportedHost(host));
    }

    let video_id = extract_video_id(&parsed).ok_or(InputError::MissingVideoId)?;
    Ok(watch_url(&video_id))
}

/// Pulls the video identifier out of a short link, a watch URL or an embed URL.
pub fn extract_video_id(url: &Url) -> Option<String> {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    if host.contains(SHORT_DOMAIN) {
        return url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|id| !id.is_empty())
            .map(str::to_string);
    }

    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == VIDEO_PARAM) {
        if !id.is_empty() {
            return Some(id.into_owned());
        }
    }

    let path = url.path();
    let (_, rest) = path.split_once(EMBED_PATH)?;
    rest.split('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
