use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::fallback::{default_client_profiles, default_info_profile, ClientProfile};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the web UI assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8484
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

/// Browsers the retrieval tool can borrow cookies from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    Brave,
    Chrome,
    Firefox,
    Edge,
}

impl Browser {
    /// Name understood by `--cookies-from-browser`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Brave => "brave",
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "edge",
        }
    }
}

/// External tool locations and options.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolConfig {
    /// Directory searched first for bundled binaries.
    #[serde(default = "default_dependencies_dir")]
    pub dependencies_dir: PathBuf,

    /// Retrieval tool binary name.
    #[serde(default = "default_ytdlp_binary")]
    pub ytdlp_binary: String,

    /// Conversion tool binary name (optional at runtime).
    #[serde(default = "default_ffmpeg_binary")]
    pub ffmpeg_binary: String,

    /// Borrow cookies from a local browser profile.
    #[serde(default)]
    pub cookies_from_browser: Option<Browser>,

    /// Versions sorting below this are reported as outdated.
    #[serde(default = "default_minimum_version")]
    pub minimum_version: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            dependencies_dir: default_dependencies_dir(),
            ytdlp_binary: default_ytdlp_binary(),
            ffmpeg_binary: default_ffmpeg_binary(),
            cookies_from_browser: None,
            minimum_version: default_minimum_version(),
        }
    }
}

fn default_dependencies_dir() -> PathBuf {
    PathBuf::from("dependencies")
}

fn default_ytdlp_binary() -> String {
    if cfg!(windows) {
        "yt-dlp.exe".to_string()
    } else {
        "yt-dlp".to_string()
    }
}

fn default_ffmpeg_binary() -> String {
    if cfg!(windows) {
        "ffmpeg.exe".to_string()
    } else {
        "ffmpeg".to_string()
    }
}

fn default_minimum_version() -> String {
    "2024".to_string()
}

/// Client profile catalogue and retry pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackConfig {
    /// Profiles tried top to bottom for download and audio jobs.
    #[serde(default = "default_client_profiles")]
    pub profiles: Vec<ClientProfile>,

    /// Single profile used for metadata queries.
    #[serde(default = "default_info_profile")]
    pub info_profile: ClientProfile,

    /// Pause between two failed attempts (milliseconds).
    #[serde(default = "default_attempt_delay")]
    pub attempt_delay_ms: u64,

    /// Upper bound for a single attempt. `None` waits for the tool forever.
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            profiles: default_client_profiles(),
            info_profile: default_info_profile(),
            attempt_delay_ms: default_attempt_delay(),
            attempt_timeout_secs: None,
        }
    }
}

fn default_attempt_delay() -> u64 {
    3000 // 3 seconds
}

/// Job bookkeeping.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Root of the per-job scratch directories.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Queue depth of each subscriber.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            subscriber_capacity: default_subscriber_capacity(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("mediagrab")
}

fn default_subscriber_capacity() -> usize {
    100
}
