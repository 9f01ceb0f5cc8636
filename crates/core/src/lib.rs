pub mod broadcast;
pub mod classifier;
pub mod command;
pub mod config;
pub mod fallback;
pub mod info;
pub mod jobs;
pub mod metrics;
pub mod progress;
pub mod runner;
pub mod source_url;
pub mod testing;

pub use broadcast::{Broadcaster, Subscriber, SubscriberId};
pub use classifier::{FailureKind, RemoteError, Verdict};
pub use command::{CommandBuilder, CommandSpec};
pub use config::{load_config, load_config_from_str, validate_config, Browser, Config, ConfigError};
pub use fallback::{ClientProfile, FallbackPolicy};
pub use info::{VideoFormat, VideoInfo};
pub use jobs::{Job, JobError, JobKind, JobManager, JobStatus, ProgressUpdate, StateChange};
pub use runner::{RetrievalTool, RunnerError, SetupError, YtDlpTool};
pub use source_url::{parse_video_url, InputError};
