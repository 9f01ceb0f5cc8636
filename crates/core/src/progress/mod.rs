//! Progress parsing for retrieval tool output.

mod parser;

pub use parser::{is_progress_line, ProgressEvent, ProgressParser, Stage};
