//! AI client metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Total AI requests by task and outcome.
    pub const AI_REQUESTS_TOTAL: &str = "csplice_ai_requests_total";

    /// Total retry attempts by task.
    pub const AI_RETRIES_TOTAL: &str = "csplice_ai_retries_total";
}

/// Record a finished AI request. `outcome` is "success" or "error".
pub fn record_request(task: &str, outcome: &'static str) {
    counter!(
        names::AI_REQUESTS_TOTAL,
        "task" => task.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a retry attempt.
pub fn record_retry(task: &str) {
    counter!(
        names::AI_RETRIES_TOTAL,
        "task" => task.to_string()
    )
    .increment(1);
}
