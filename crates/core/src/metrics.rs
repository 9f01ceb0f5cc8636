//! Prometheus metrics for job supervision.
//!
//! All metrics use the `mediagrab_` prefix and are registered by the server
//! through [`all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs accepted, by kind.
pub static JOBS_STARTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediagrab_jobs_started_total", "Total jobs started"),
        &["kind"],
    )
    .unwrap()
});

/// Jobs that produced a file, by kind.
pub static JOBS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediagrab_jobs_completed_total", "Total jobs completed"),
        &["kind"],
    )
    .unwrap()
});

/// Jobs that ended in error, by kind and reason.
pub static JOBS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediagrab_jobs_failed_total", "Total jobs failed"),
        &["kind", "reason"],
    )
    .unwrap()
});

/// Jobs not yet in a terminal state.
pub static JOBS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mediagrab_jobs_active", "Jobs currently running").unwrap()
});

/// Wall time from start to terminal state.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediagrab_job_duration_seconds",
            "Time from job start to terminal state",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["kind", "result"],
    )
    .unwrap()
});

// =============================================================================
// Attempts
// =============================================================================

/// Individual tool invocations by outcome (`success`, `failed`).
pub static ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediagrab_attempts_total", "Tool invocations by outcome"),
        &["result"],
    )
    .unwrap()
});

/// Failed attempts by classified reason.
pub static ATTEMPT_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediagrab_attempt_failures_total",
            "Failed tool invocations by reason",
        ),
        &["reason"],
    )
    .unwrap()
});

/// Metadata queries by outcome.
pub static INFO_QUERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediagrab_info_queries_total", "Video info queries by outcome"),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Subscribers
// =============================================================================

pub static SUBSCRIBERS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediagrab_subscribers_active",
        "Number of attached progress subscribers",
    )
    .unwrap()
});

/// Updates lost because a subscriber queue was full.
pub static UPDATES_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediagrab_updates_dropped_total",
        "Progress updates dropped for slow subscribers",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_STARTED.clone()),
        Box::new(JOBS_COMPLETED.clone()),
        Box::new(JOBS_FAILED.clone()),
        Box::new(JOBS_ACTIVE.clone()),
        Box::new(JOB_DURATION.clone()),
        // Attempts
        Box::new(ATTEMPTS.clone()),
        Box::new(ATTEMPT_FAILURES.clone()),
        Box::new(INFO_QUERIES.clone()),
        // Subscribers
        Box::new(SUBSCRIBERS_ACTIVE.clone()),
        Box::new(UPDATES_DROPPED.clone()),
    ]
}
