//! Ordered failure rules and the classification entry points.

use super::types::{FailureKind, RemoteError, Verdict};

/// Exit status the tool uses when `--max-downloads` stops it.
pub const CAPPED_EXIT_CODE: i32 = 101;

/// Marker the tool puts in front of fatal error lines.
pub const ERROR_MARKER: &str = "ERROR:";

const MAX_DOWNLOADS_REACHED: &str = "Maximum number of downloads reached";
const ALREADY_DOWNLOADED: &str = "has already been downloaded";

/// One entry of the ordered rule table.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierRule {
    pub kind: FailureKind,
    pub matches: fn(&str) -> bool,
}

/// First match wins. Reordering changes which message users see when the
/// tool prints several of these in one run.
pub static CLASSIFIER_RULES: &[ClassifierRule] = &[
    ClassifierRule {
        kind: FailureKind::Unavailable,
        matches: |text| text.contains("Video unavailable"),
    },
    ClassifierRule {
        kind: FailureKind::UpstreamBlocked,
        matches: |text| text.contains("403") || text.contains("Forbidden"),
    },
    ClassifierRule {
        kind: FailureKind::RequiresAuthentication,
        matches: |text| text.contains("Sign in"),
    },
    ClassifierRule {
        kind: FailureKind::FragmentsUnavailable,
        matches: |text| text.contains("fragment") && text.contains("not found"),
    },
    ClassifierRule {
        kind: FailureKind::Private,
        matches: |text| text.contains("Private video"),
    },
    ClassifierRule {
        kind: FailureKind::Removed,
        matches: |text| text.contains("has been removed"),
    },
];

/// Returns the first rule whose predicate accepts `text`.
pub fn match_rules(text: &str) -> Option<FailureKind> {
    CLASSIFIER_RULES
        .iter()
        .find(|rule| (rule.matches)(text))
        .map(|rule| rule.kind)
}

/// Early detection on a single stderr line while the tool is still running.
///
/// Only lines carrying the explicit error marker count; the tool also prints
/// harmless warnings that mention e.g. `403` while retrying internally.
pub fn detect_early(line: &str) -> Option<FailureKind> {
    if !line.contains(ERROR_MARKER) {
        return None;
    }
    match_rules(line)
}

/// Whether a non-zero exit is the download cap rather than a failure.
pub fn is_capped_success(exit_code: Option<i32>, output: &str) -> bool {
    exit_code == Some(CAPPED_EXIT_CODE)
        && (output.contains(MAX_DOWNLOADS_REACHED) || output.contains(ALREADY_DOWNLOADED))
}

/// Classifies a finished attempt from its exit code and captured output.
///
/// `output` is everything worth inspecting: the stderr text plus whatever
/// non-progress stdout lines the runner kept.
pub fn classify(exit_code: Option<i32>, output: &str) -> Verdict {
    if exit_code == Some(0) || is_capped_success(exit_code, output) {
        return Verdict::Success;
    }

    if let Some(kind) = match_rules(output) {
        return Verdict::Failed(RemoteError::Rejected(kind));
    }

    Verdict::Failed(RemoteError::Unspecified(summarize(exit_code, output)))
}

/// Text for an unrecognized failure: the first error line, else the whole
/// trimmed output, else the exit status.
fn summarize(exit_code: Option<i32>, output: &str) -> String {
    if let Some(line) = output.lines().find(|l| l.contains(ERROR_MARKER)) {
        if let Some((_, rest)) = line.split_once(ERROR_MARKER) {
            return rest.trim().to_string();
        }
    }

    let trimmed = output.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    match exit_code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(kind: FailureKind) -> Verdict {
        Verdict::Failed(RemoteError::Rejected(kind))
    }

    #[test]
    fn test_zero_exit_is_success() {
        assert_eq!(classify(Some(0), ""), Verdict::Success);
    }

    #[test]
    fn test_capped_exit_is_success() {
        let out = "[info] Maximum number of downloads reached, stopping due to --max-downloads";
        assert_eq!(classify(Some(101), out), Verdict::Success);

        let out = "[download] /tmp/x/Song.mp3 has already been downloaded";
        assert_eq!(classify(Some(101), out), Verdict::Success);
    }

    #[test]
    fn test_exit_101_without_cap_text_is_failure() {
        assert!(!classify(Some(101), "something else").is_success());
    }

    #[test]
    fn test_cap_text_with_other_exit_is_failure() {
        let out = "Maximum number of downloads reached";
        assert!(!classify(Some(1), out).is_success());
    }

    #[test]
    fn test_forbidden_classified_as_blocked() {
        assert_eq!(
            classify(Some(1), "ERROR: HTTP Error 403: Forbidden"),
            rejected(FailureKind::UpstreamBlocked)
        );
    }

    #[test]
    fn test_priority_order_holds() {
        // The sign-in text appears first but the forbidden rule ranks higher.
        let out = "WARNING: Sign in to confirm you're not a bot\nERROR: HTTP Error 403: Forbidden";
        assert_eq!(classify(Some(1), out), rejected(FailureKind::UpstreamBlocked));

        let out = "ERROR: HTTP Error 403\nERROR: Video unavailable";
        assert_eq!(classify(Some(1), out), rejected(FailureKind::Unavailable));
    }

    #[test]
    fn test_each_rule_matches_its_sample() {
        let samples = [
            (FailureKind::Unavailable, "ERROR: [youtube] x: Video unavailable"),
            (FailureKind::UpstreamBlocked, "ERROR: unable to download: Forbidden"),
            (FailureKind::RequiresAuthentication, "ERROR: Sign in to confirm your age"),
            (
                FailureKind::FragmentsUnavailable,
                "ERROR: fragment 1 not found, unable to continue",
            ),
            (FailureKind::Private, "ERROR: [youtube] x: Private video"),
            (FailureKind::Removed, "ERROR: This video has been removed by the uploader"),
        ];
        assert_eq!(samples.len(), CLASSIFIER_RULES.len());
        for (kind, text) in samples {
            assert_eq!(match_rules(text), Some(kind), "sample: {}", text);
        }
    }

    #[test]
    fn test_rule_table_order() {
        let kinds: Vec<_> = CLASSIFIER_RULES.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FailureKind::Unavailable,
                FailureKind::UpstreamBlocked,
                FailureKind::RequiresAuthentication,
                FailureKind::FragmentsUnavailable,
                FailureKind::Private,
                FailureKind::Removed,
            ]
        );
    }

    #[test]
    fn test_unspecified_uses_error_line() {
        let out = "[youtube] x: Downloading webpage\nERROR: Unsupported URL: whatever\n";
        assert_eq!(
            classify(Some(1), out),
            Verdict::Failed(RemoteError::Unspecified(
                "Unsupported URL: whatever".to_string()
            ))
        );
    }

    #[test]
    fn test_unspecified_falls_back_to_text_then_status() {
        assert_eq!(
            classify(Some(2), "  usage: yt-dlp [OPTIONS]  \n"),
            Verdict::Failed(RemoteError::Unspecified("usage: yt-dlp [OPTIONS]".to_string()))
        );
        assert_eq!(
            classify(Some(2), ""),
            Verdict::Failed(RemoteError::Unspecified("exit status 2".to_string()))
        );
    }

    #[test]
    fn test_early_detection_requires_marker() {
        assert_eq!(detect_early("WARNING: HTTP Error 403, retrying"), None);
        assert_eq!(
            detect_early("ERROR: HTTP Error 403: Forbidden"),
            Some(FailureKind::UpstreamBlocked)
        );
        assert_eq!(detect_early("ERROR: something new"), None);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(FailureKind::UpstreamBlocked.is_retryable());
        assert!(FailureKind::RequiresAuthentication.is_retryable());
        assert!(FailureKind::FragmentsUnavailable.is_retryable());
        assert!(!FailureKind::Unavailable.is_retryable());
        assert!(!FailureKind::Private.is_retryable());
        assert!(!FailureKind::Removed.is_retryable());
        assert!(!RemoteError::Unspecified("x".into()).is_retryable());
    }
}
