//! Job executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn, Instrument};

use csplice_queue::{JobDescriptor, JobReceiver};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::orchestrator::{Orchestrator, StageOutcome};

/// Pulls jobs off the queue and runs each on its own task, at most
/// `max_concurrent_jobs` at a time.
pub struct JobExecutor {
    orchestrator: Arc<Orchestrator>,
    job_semaphore: Arc<Semaphore>,
    max_concurrent_jobs: usize,
    shutdown_timeout: Duration,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(orchestrator: Arc<Orchestrator>, config: &WorkerConfig) -> Self {
        let max_concurrent_jobs = config.max_concurrent_jobs.max(1);
        let (shutdown, _) = watch::channel(false);
        Self {
            orchestrator,
            job_semaphore: Arc::new(Semaphore::new(max_concurrent_jobs)),
            max_concurrent_jobs,
            shutdown_timeout: config.shutdown_timeout,
            shutdown,
        }
    }

    /// Consume jobs until shutdown is signalled or every queue handle is dropped.
    pub async fn run(&self, mut receiver: JobReceiver) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.max_concurrent_jobs
        );
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                info!("Shutdown signal received, stopping executor");
                break;
            }
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                job = receiver.recv() => {
                    let Some(job) = job else {
                        info!("Job queue closed, stopping executor");
                        break;
                    };
                    let permit = Arc::clone(&self.job_semaphore)
                        .acquire_owned()
                        .await
                        .map_err(|_| WorkerError::processing("job semaphore closed"))?;
                    let orchestrator = Arc::clone(&self.orchestrator);
                    debug!(job_id = %job.job_id, kind = %job.kind, "Dispatching job");
                    tokio::spawn(async move {
                        let _permit = permit;
                        Self::execute_job(orchestrator, job).await;
                    });
                }
            }
        }

        receiver.close();
        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!("In-flight jobs still running after {:?}", self.shutdown_timeout);
        }

        info!("Job executor stopped");
        Ok(())
    }

    async fn execute_job(orchestrator: Arc<Orchestrator>, job: JobDescriptor) {
        let logger = JobLogger::for_job(&job);
        let kind = job.kind.as_str();
        let started = Instant::now();
        logger.log_start(&job.idempotency_key());

        let result = orchestrator
            .execute(&job)
            .instrument(logger.create_span())
            .await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(StageOutcome::Completed) => {
                logger.log_completion(&format!("finished in {:.2}s", elapsed));
                metrics::record_job_completed(kind, elapsed);
            }
            Ok(StageOutcome::Skipped { current }) => {
                logger.log_warning(&format!("skipped, entity is {}", current));
                metrics::record_job_skipped(kind);
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                metrics::record_job_failed(kind, elapsed);
            }
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FfmpegBackend;
    use csplice_queue::JobQueue;
    use csplice_store::MemoryStore;

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let config = WorkerConfig::default();
        let (queue, receiver) = JobQueue::new(4);
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FfmpegBackend::default()),
            None,
            queue,
            config.clone(),
        ));
        let executor = Arc::new(JobExecutor::new(orchestrator, &config));

        let handle = {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move { executor.run(receiver).await })
        };
        executor.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
