//! Retrieval tool command construction.
//!
//! Turns a (job kind, quality, URL) tuple plus a client profile into the
//! argument vector for one tool invocation, including the format-selection
//! strategy for video downloads.

mod builder;
mod format;

pub use builder::{CommandBuilder, CommandSpec, OUTPUT_TEMPLATE};
pub use format::{format_selector, QualityRequest, BEST_FORMAT_SELECTOR, BEST_QUALITY};
