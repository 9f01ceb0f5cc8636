//! Turns `-j` output into a [`VideoInfo`].

use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::debug;

use crate::jobs::JobError;

use super::types::{RawFormat, RawInfo, VideoFormat, VideoInfo};

const CODEC_NONE: &str = "none";
const UNKNOWN_RESOLUTION: &str = "unknown";
const APPROX_PREFIX: &str = "~";
const SIZE_UNITS: &[char] = &['K', 'M', 'G', 'T', 'P', 'E'];

/// Parses the tool's JSON line for `parsed_url`.
///
/// The first line that looks like a JSON object is used; anything the tool
/// printed around it is ignored.
pub fn parse_video_info(stdout: &str, parsed_url: &str) -> Result<VideoInfo, JobError> {
    let json = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| JobError::InfoParse("no JSON object in tool output".to_string()))?;

    let raw: RawInfo =
        serde_json::from_str(json).map_err(|e| JobError::InfoParse(e.to_string()))?;

    Ok(VideoInfo {
        title: raw.title.unwrap_or_default(),
        duration: raw.duration.map(format_duration).unwrap_or_default(),
        thumbnail: raw.thumbnail.unwrap_or_default(),
        formats: select_formats(&raw.formats),
        parsed_url: parsed_url.to_string(),
    })
}

/// Drops audio-only entries, keeps one entry per resolution and sorts
/// highest first.
///
/// Video-only entries are listed; the audio is merged at download time. Within
/// one resolution the first entry wins, except that an entry carrying audio
/// replaces a video-only one.
fn select_formats(raw: &[RawFormat]) -> Vec<VideoFormat> {
    let mut by_label: HashMap<String, usize> = HashMap::new();
    let mut selected: Vec<Candidate> = Vec::new();

    for format in raw {
        if is_codec_none(&format.vcodec) {
            continue;
        }

        let height = format.height.filter(|h| *h > 0.0).map(|h| h as u32);
        let resolution = height
            .map(|h| format!("{}p", h))
            .unwrap_or_else(|| UNKNOWN_RESOLUTION.to_string());
        let candidate = Candidate {
            height,
            has_audio: !is_codec_none(&format.acodec),
            format: VideoFormat {
                format_id: format.format_id.clone().unwrap_or_default(),
                quality: resolution.clone(),
                resolution: resolution.clone(),
                ext: format.ext.clone().unwrap_or_default(),
                filesize: describe_size(format),
            },
        };

        match by_label.get(&resolution) {
            Some(&index) => {
                if candidate.has_audio && !selected[index].has_audio {
                    selected[index] = candidate;
                }
            }
            None => {
                by_label.insert(resolution, selected.len());
                selected.push(candidate);
            }
        }
    }

    // Stable: equal heights keep their original order, unknown goes last.
    selected.sort_by_key(|c| (c.height.is_none(), Reverse(c.height)));

    debug!(
        total = raw.len(),
        kept = selected.len(),
        "Selected video formats"
    );

    selected.into_iter().map(|c| c.format).collect()
}

struct Candidate {
    height: Option<u32>,
    has_audio: bool,
    format: VideoFormat,
}

fn is_codec_none(codec: &Option<String>) -> bool {
    codec.as_deref() == Some(CODEC_NONE)
}

fn describe_size(format: &RawFormat) -> String {
    if let Some(exact) = format.filesize.filter(|s| *s > 0.0) {
        return format_file_size(exact as u64);
    }
    if let Some(approx) = format.filesize_approx.filter(|s| *s > 0.0) {
        return format!("{}{}", APPROX_PREFIX, format_file_size(approx as u64));
    }
    String::new()
}

/// 1024-based size with one decimal, e.g. `1.5 GB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp + 1 < SIZE_UNITS.len() {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}B", bytes as f64 / div as f64, SIZE_UNITS[exp])
}

/// Whole seconds as `minutes:seconds`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
