//! Quality string to `-f` format selector.
//!
//! The tool walks a selector left to right and uses the first branch that
//! resolves, so the order of the alternatives below is significant.

/// Sentinel quality meaning "let the tool pick the best tier".
pub const BEST_QUALITY: &str = "best";

/// Trailing marker of a height constraint such as `720p`.
const HEIGHT_SUFFIX: char = 'p';

/// Tiered default: >=1080p, then >=720p at >=30fps, then >=720p, then anything.
pub const BEST_FORMAT_SELECTOR: &str = "bestvideo[height>=1080]+bestaudio[ext=m4a]/\
bestvideo[height>=1080]+bestaudio/\
bestvideo[height>=720][fps>=30]+bestaudio[ext=m4a]/\
bestvideo[height>=720][fps>=30]+bestaudio/\
bestvideo[height>=720]+bestaudio[ext=m4a]/\
bestvideo[height>=720]+bestaudio/\
best[height>=720]/\
best";

/// How the requested quality was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityRequest {
    /// No preference, use the tiered default.
    Best,
    /// Cap the video height, e.g. `720p` -> 720.
    MaxHeight(String),
    /// A concrete format identifier reported by the metadata query.
    FormatId(String),
}

impl QualityRequest {
    pub fn parse(quality: Option<&str>) -> Self {
        let quality = quality.map(str::trim).unwrap_or_default();
        if quality.is_empty() || quality == BEST_QUALITY {
            return Self::Best;
        }
        match quality.strip_suffix(HEIGHT_SUFFIX) {
            Some(height) => Self::MaxHeight(height.to_string()),
            None => Self::FormatId(quality.to_string()),
        }
    }

    /// The selector string passed after `-f`.
    pub fn selector(&self) -> String {
        match self {
            Self::Best => BEST_FORMAT_SELECTOR.to_string(),
            Self::MaxHeight(h) => format!(
                "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/bestvideo[height<={h}]+bestaudio/best[height<={h}]"
            ),
            Self::FormatId(id) => format!("({id}+bestaudio[ext=m4a])/({id}+bestaudio)/{id}/best"),
        }
    }
}

/// Shorthand for `QualityRequest::parse(quality).selector()`.
pub fn format_selector(quality: Option<&str>) -> String {
    QualityRequest::parse(quality).selector()
}
