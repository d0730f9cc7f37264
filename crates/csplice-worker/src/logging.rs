//! Structured job logging utilities.

use tracing::{error, info, warn, Span};

use csplice_queue::JobDescriptor;

/// Job logger for structured logging with consistent fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
    entity_id: String,
}

impl JobLogger {
    /// Logger for a queued job.
    pub fn for_job(job: &JobDescriptor) -> Self {
        Self {
            job_id: job.job_id.to_string(),
            operation: job.kind.to_string(),
            entity_id: job.entity_id.clone(),
        }
    }

    pub fn new(job_id: &str, operation: &str, entity_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
            entity_id: entity_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            entity_id = %self.entity_id,
            "Job started: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            entity_id = %self.entity_id,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            entity_id = %self.entity_id,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            entity_id = %self.entity_id,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the job fields, for instrumenting the job future.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation,
            entity_id = %self.entity_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csplice_models::SpliceId;

    #[test]
    fn test_logger_from_job() {
        let job = JobDescriptor::splice_render(&SpliceId::from_string("s-1"));
        let logger = JobLogger::for_job(&job);

        assert_eq!(logger.job_id(), job.job_id.to_string());
        assert_eq!(logger.operation(), "splice_render");
    }

    #[test]
    fn test_logger_new() {
        let logger = JobLogger::new("job-1", "export", "e-1");
        assert_eq!(logger.job_id(), "job-1");
        assert_eq!(logger.operation(), "export");
    }
}
