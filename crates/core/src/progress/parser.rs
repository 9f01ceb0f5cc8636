//! Line classifier for the retrieval tool's stdout.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::Path;

static PROGRESS_WITH_SPEED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[download\]\s+(\d+\.?\d*)%\s+of\s+.*?\s+at\s+(\S+)\s+ETA\s+(\S+)")
        .expect("valid progress regex")
});

static PROGRESS_SIMPLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[download\]\s+(\d+\.?\d*)%").expect("valid progress regex"));

static DESTINATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[download\] Destination: (.+)").expect("valid destination regex"));

const DOWNLOAD_COMPLETE_MARKER: &str = "[download] 100%";
const ALREADY_DOWNLOADED_MARKER: &str = "has already been downloaded";
const POST_PROCESSING_MARKER: &str = "[ffmpeg]";

/// Coarse phase transitions the tool announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Transfer finished (or the file was already present).
    Downloaded,
    /// The conversion tool was invoked for muxing or transcoding.
    PostProcessing,
}

/// Something a single stdout line told us.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Title(String),
    /// Percentage sample; `speed` and `eta` are empty when not reported.
    Sample {
        progress: f64,
        speed: String,
        eta: String,
    },
    /// Forces progress to 100.
    Stage(Stage),
}

impl ProgressEvent {
    /// Progress value this event implies, if any.
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Title(_) => None,
            Self::Sample { progress, .. } => Some(*progress),
            Self::Stage(_) => Some(100.0),
        }
    }
}

/// Per-job parser. Only the title survives between lines.
#[derive(Debug, Default)]
pub struct ProgressParser {
    title: Option<String>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Title seen in the most recent destination announcement.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Classifies one line. Events come back in application order, so a stage
    /// marker on the same line as a sample overrides the sample's message.
    pub fn parse_line(&mut self, line: &str) -> Vec<ProgressEvent> {
        let mut events = Vec::new();

        if let Some(caps) = DESTINATION.captures(line) {
            if let Some(title) = title_from_destination(&caps[1]) {
                self.title = Some(title.clone());
                events.push(ProgressEvent::Title(title));
            }
        }

        if let Some(caps) = PROGRESS_WITH_SPEED.captures(line) {
            if let Ok(progress) = caps[1].parse::<f64>() {
                events.push(ProgressEvent::Sample {
                    progress,
                    speed: caps[2].to_string(),
                    eta: caps[3].to_string(),
                });
            }
        } else if let Some(caps) = PROGRESS_SIMPLE.captures(line) {
            if let Ok(progress) = caps[1].parse::<f64>() {
                events.push(ProgressEvent::Sample {
                    progress,
                    speed: String::new(),
                    eta: String::new(),
                });
            }
        }

        if line.contains(DOWNLOAD_COMPLETE_MARKER) || line.contains(ALREADY_DOWNLOADED_MARKER) {
            events.push(ProgressEvent::Stage(Stage::Downloaded));
        }

        if line.contains(POST_PROCESSING_MARKER) {
            events.push(ProgressEvent::Stage(Stage::PostProcessing));
        }

        events
    }
}

/// Whether a line is pure progress noise not worth keeping for classification.
pub fn is_progress_line(line: &str) -> bool {
    PROGRESS_SIMPLE.is_match(line)
}

/// File name of the announced destination without its extension.
fn title_from_destination(destination: &str) -> Option<String> {
    Path::new(destination.trim())
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
}
