//! Video metadata as returned to callers, plus the raw tool JSON it is read from.

use serde::{Deserialize, Serialize};

/// One selectable quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFormat {
    /// Identifier to send back as the download quality.
    pub format_id: String,
    /// `<height>p`, or `unknown`.
    pub resolution: String,
    pub ext: String,
    /// Human readable size, `~` prefixed when approximate, empty when unknown.
    pub filesize: String,
    pub quality: String,
}

/// Metadata of a single video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    /// `minutes:seconds`, empty when unknown.
    pub duration: String,
    pub thumbnail: String,
    pub formats: Vec<VideoFormat>,
    /// Canonical URL the query ran against.
    pub parsed_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
}
