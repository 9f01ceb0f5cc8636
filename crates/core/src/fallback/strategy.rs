//! Sequential retry across client profiles.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::classifier::Verdict;
use crate::command::{CommandBuilder, CommandSpec};
use crate::config::FallbackConfig;
use crate::jobs::JobError;
use crate::metrics;
use crate::runner::{run_attempt, RetrievalTool, RunnerError};

use super::profiles::ClientProfile;

/// Profiles to walk and how to pace them.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    pub profiles: Vec<ClientProfile>,
    /// Pause before every attempt except the first.
    pub attempt_delay: Duration,
    pub attempt_timeout: Option<Duration>,
}

impl FallbackPolicy {
    pub fn from_config(config: &FallbackConfig) -> Self {
        Self {
            profiles: config.profiles.clone(),
            attempt_delay: Duration::from_millis(config.attempt_delay_ms),
            attempt_timeout: config.attempt_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// The attempt that worked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackSuccess {
    pub profile: String,
    /// 1-based number of the successful attempt.
    pub attempts: usize,
}

/// Runs `spec` with each profile in order until one attempt succeeds.
///
/// Attempts never overlap. Every profile is tried even when the failure
/// looks terminal; only a missing tool stops the walk early.
pub async fn run_with_fallback<F>(
    tool: &dyn RetrievalTool,
    builder: &CommandBuilder,
    spec: &CommandSpec<'_>,
    policy: &FallbackPolicy,
    mut on_line: F,
) -> Result<FallbackSuccess, JobError>
where
    F: FnMut(&str) + Send,
{
    let total = policy.profiles.len();
    let mut last_failure = String::new();

    for (index, profile) in policy.profiles.iter().enumerate() {
        if index > 0 && !policy.attempt_delay.is_zero() {
            info!(
                delay_ms = policy.attempt_delay.as_millis() as u64,
                "Waiting before trying next client"
            );
            tokio::time::sleep(policy.attempt_delay).await;
        }

        let args = builder.build(spec, profile);
        info!(
            kind = spec.kind.as_str(),
            client = %profile.name,
            attempt = index + 1,
            total,
            "Attempting request"
        );

        match run_attempt(tool, &args, policy.attempt_timeout, &mut on_line).await {
            Ok(outcome) => match outcome.verdict {
                Verdict::Success => {
                    metrics::ATTEMPTS.with_label_values(&["success"]).inc();
                    info!(client = %profile.name, "Request succeeded");
                    return Ok(FallbackSuccess {
                        profile: profile.name.clone(),
                        attempts: index + 1,
                    });
                }
                Verdict::Failed(err) => {
                    metrics::ATTEMPTS.with_label_values(&["failed"]).inc();
                    metrics::ATTEMPT_FAILURES
                        .with_label_values(&[err.label()])
                        .inc();
                    warn!(
                        client = %profile.name,
                        error = %err,
                        retryable = err.is_retryable(),
                        exit_code = ?outcome.exit_code,
                        "Request failed"
                    );
                    last_failure = err.to_string();
                }
            },
            Err(RunnerError::Setup(err)) => {
                error!(error = %err, "Retrieval tool unavailable, giving up");
                return Err(JobError::Setup(err));
            }
            Err(err) => {
                metrics::ATTEMPTS.with_label_values(&["failed"]).inc();
                metrics::ATTEMPT_FAILURES
                    .with_label_values(&[runner_label(&err)])
                    .inc();
                warn!(client = %profile.name, error = %err, "Request failed");
                last_failure = err.to_string();
            }
        }
    }

    Err(JobError::AllAttemptsFailed {
        attempts: total,
        last: last_failure,
    })
}

fn runner_label(err: &RunnerError) -> &'static str {
    match err {
        RunnerError::Setup(_) => "setup",
        RunnerError::Io(_) => "io",
        RunnerError::Timeout { .. } => "timeout",
    }
}
