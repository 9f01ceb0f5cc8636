//! Jobs: records, lifecycle and the manager that supervises them.

mod error;
mod manager;
mod output;
mod types;

pub use error::JobError;
pub use manager::JobManager;
pub use output::{apply_quality_suffix, is_excluded, locate_result, name_with_quality};
pub use types::{Job, JobKind, JobStatus, ProgressUpdate, StateChange};
