//! In-process job dispatch.
//!
//! Triggers enqueue a [`JobDescriptor`] and return immediately; the worker
//! pool drains the [`JobReceiver`].

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::{JobDescriptor, JobKind};
pub use queue::{JobQueue, JobReceiver, DEFAULT_QUEUE_CAPACITY};
