//! Key-addressed record store for videos, clips, splices and exports.
//!
//! Status changes that start a job go through the `transition_*_status`
//! check-and-set operations, which is what keeps at most one job in flight
//! per entity.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::RecordStore;
