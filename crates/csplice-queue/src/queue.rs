//! Bounded mpsc job queue.

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{QueueError, QueueResult};
use crate::job::JobDescriptor;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Sending half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<JobDescriptor>,
    capacity: usize,
}

/// Receiving half, owned by the executor.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::Receiver<JobDescriptor>,
}

impl JobQueue {
    /// Create a queue holding up to `capacity` pending jobs.
    pub fn new(capacity: usize) -> (Self, JobReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, capacity }, JobReceiver { rx })
    }

    /// Enqueue a job, waiting for room if the queue is full.
    pub async fn enqueue(&self, job: JobDescriptor) -> QueueResult<()> {
        debug!(job_id = %job.job_id, kind = %job.kind, entity_id = %job.entity_id, "Enqueueing job");
        self.tx.send(job).await.map_err(|_| QueueError::Closed)
    }

    /// Enqueue without waiting.
    pub fn try_enqueue(&self, job: JobDescriptor) -> QueueResult<()> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full(self.capacity),
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl JobReceiver {
    /// Next job, or `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<JobDescriptor> {
        self.rx.recv().await
    }

    /// Stop accepting new jobs; already queued jobs can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
