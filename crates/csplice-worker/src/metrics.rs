//! Worker metrics.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Metric name constants for consistency.
pub mod names {
    /// Jobs that reached a completed state, by kind.
    pub const JOBS_COMPLETED_TOTAL: &str = "csplice_jobs_completed_total";

    /// Jobs that ended FAILED, by kind.
    pub const JOBS_FAILED_TOTAL: &str = "csplice_jobs_failed_total";

    /// Jobs dropped because the entity was not in a startable state.
    pub const JOBS_SKIPPED_TOTAL: &str = "csplice_jobs_skipped_total";

    /// Job wall time in seconds, by kind.
    pub const JOB_DURATION_SECONDS: &str = "csplice_job_duration_seconds";

    /// Selections that used deterministic ranking, by mode and reason.
    pub const SELECTION_FALLBACK_TOTAL: &str = "csplice_selection_fallback_total";
}

/// Install the Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub fn record_job_completed(kind: &str, duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL, "kind" => kind.to_string()).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "kind" => kind.to_string()).record(duration_secs);
}

pub fn record_job_failed(kind: &str, duration_secs: f64) {
    counter!(names::JOBS_FAILED_TOTAL, "kind" => kind.to_string()).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "kind" => kind.to_string()).record(duration_secs);
}

pub fn record_job_skipped(kind: &str) {
    counter!(names::JOBS_SKIPPED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_selection_fallback(mode: &str, reason: &'static str) {
    counter!(
        names::SELECTION_FALLBACK_TOTAL,
        "mode" => mode.to_string(),
        "reason" => reason
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::JOBS_COMPLETED_TOTAL.ends_with("_total"));
        assert!(names::JOB_DURATION_SECONDS.ends_with("_seconds"));
        assert!(names::SELECTION_FALLBACK_TOTAL.contains("fallback"));
    }
}
