//! Error classification for retrieval tool runs.
//!
//! Output text is matched against an ordered rule table; the first rule that
//! fires decides the [`FailureKind`]. The same table drives early detection
//! on stderr while the tool is still running.

mod rules;
mod types;

pub use rules::{
    classify, detect_early, is_capped_success, match_rules, ClassifierRule, CAPPED_EXIT_CODE,
    CLASSIFIER_RULES, ERROR_MARKER,
};
pub use types::{FailureKind, RemoteError, Verdict};
