//! Argument vectors for one retrieval tool invocation.

use std::path::{Path, PathBuf};

use crate::config::Browser;
use crate::fallback::ClientProfile;
use crate::jobs::JobKind;

use super::format::format_selector;

/// Output template relative to the job's working directory.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

const DOWNLOAD_BASE_ARGS: &[&str] = &[
    "--merge-output-format",
    "mp4",
    "--embed-metadata",
    "--write-thumbnail",
    "--no-warnings",
    "--no-check-certificate",
    "--no-playlist",
    "--max-downloads",
    "1",
];

const AUDIO_BASE_ARGS: &[&str] = &[
    "-x",
    "--audio-format",
    "mp3",
    "--audio-quality",
    "0",
    "--embed-metadata",
    "--no-warnings",
    "--no-check-certificate",
    "--no-playlist",
    "--max-downloads",
    "1",
];

const INFO_BASE_ARGS: &[&str] = &["-j", "--no-warnings", "--no-check-certificate"];

/// What a single attempt should fetch.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec<'a> {
    pub kind: JobKind,
    pub quality: Option<&'a str>,
    /// Canonical video URL, always the final argument.
    pub url: &'a str,
    /// Scratch directory the tool writes into. Ignored for info queries.
    pub output_dir: &'a Path,
}

/// Builds tool arguments; cheap to clone and share between job tasks.
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    ffmpeg_location: Option<PathBuf>,
    cookies_from_browser: Option<Browser>,
}

impl CommandBuilder {
    pub fn new(ffmpeg_location: Option<PathBuf>, cookies_from_browser: Option<Browser>) -> Self {
        Self {
            ffmpeg_location,
            cookies_from_browser,
        }
    }

    pub fn ffmpeg_location(&self) -> Option<&Path> {
        self.ffmpeg_location.as_deref()
    }

    /// Full argument vector for `spec` under the given client profile.
    pub fn build(&self, spec: &CommandSpec<'_>, profile: &ClientProfile) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        match spec.kind {
            JobKind::InfoQuery => {
                args.extend(INFO_BASE_ARGS.iter().map(|s| s.to_string()));
            }
            JobKind::Download | JobKind::AudioExtract => {
                args.push("-o".to_string());
                args.push(
                    spec.output_dir
                        .join(OUTPUT_TEMPLATE)
                        .to_string_lossy()
                        .to_string(),
                );

                let base = if spec.kind == JobKind::Download {
                    DOWNLOAD_BASE_ARGS
                } else {
                    AUDIO_BASE_ARGS
                };
                args.extend(base.iter().map(|s| s.to_string()));

                if let Some(browser) = self.cookies_from_browser {
                    args.extend([
                        "--cookies-from-browser".to_string(),
                        browser.as_str().to_string(),
                    ]);
                }

                if let Some(ref ffmpeg) = self.ffmpeg_location {
                    args.extend([
                        "--ffmpeg-location".to_string(),
                        ffmpeg.to_string_lossy().to_string(),
                    ]);
                }

                if spec.kind == JobKind::Download {
                    args.extend(["-f".to_string(), format_selector(spec.quality)]);
                }
            }
        }

        args.extend([
            "--extractor-args".to_string(),
            profile.extractor_args.clone(),
        ]);
        args.push(spec.url.to_string());

        args
    }
}
