//! Prometheus metrics for the oracle dispatcher

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static! {
    /// Events received by oracle workers
    pub static ref EVENTS_RECEIVED_TOTAL: CounterVec = register_counter_vec!(
        "oracle_dispatcher_events_received_total",
        "Surety events received by oracle workers",
        &["event", "status"]
    )
    .unwrap();

    /// Status submissions by outcome
    pub static ref SUBMISSIONS_TOTAL: CounterVec = register_counter_vec!(
        "oracle_dispatcher_submissions_total",
        "Oracle status submissions by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Submission round-trip duration
    pub static ref SUBMISSION_DURATION: HistogramVec = register_histogram_vec!(
        "oracle_dispatcher_submission_duration_seconds",
        "Oracle submission duration in seconds",
        &["outcome"]
    )
    .unwrap();
}
