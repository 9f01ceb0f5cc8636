//! Process runner for the retrieval tool.
//!
//! The [`RetrievalTool`] trait is the seam between job logic and the external
//! binary: [`YtDlpTool`] spawns the real thing, `testing::MockTool` replays
//! scripted output. Everything above the trait only sees line streams and an
//! exit code.

mod attempt;
mod capture;
mod error;
mod traits;
mod ytdlp;

pub use attempt::{run_attempt, AttemptOutcome};
pub use capture::{check_tool, run_to_completion, CapturedOutput};
pub use error::{RunnerError, SetupError};
pub use traits::{RetrievalTool, ToolProcess, ToolStream};
pub use ytdlp::{locate_binary, locate_ffmpeg, YtDlpTool};
