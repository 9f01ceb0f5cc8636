//! Video metadata extraction from the tool's JSON dump.

mod parse;
mod types;

pub use parse::{format_duration, format_file_size, parse_video_info};
pub use types::{VideoFormat, VideoInfo};
