//! Job execution engine: bounded queue, worker pool, retry with backoff.
//!
//! ## Design
//!
//! - Submission persists a `Pending` job, then pushes it onto a bounded FIFO
//!   (blocking when full)
//! - A fixed pool of worker threads drains the queue
//! - Each dequeued job runs through a retry loop with linear backoff until it
//!   is `Completed` or `Failed`
//! - Status counts are recomputed from the store on demand
//!
//! ## Components
//!
//! - `EngineConfig`: pool size, queue capacity, retry bound, backoff unit
//! - `JobStore`: persistence contract (in-memory implementation included)
//! - `WorkQueue`: bounded FIFO with close-and-drain semantics
//! - `RetryExecutor`: the per-job state machine
//! - `Engine`: lifecycle (`start`/`stop`) and the four public operations

pub mod backoff;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod queue;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use backoff::{DelayGate, DelayOutcome, RetryPolicy};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use executor::{
    ExecutorStats, PlaceholderRunner, ProcessOutcome, RetryExecutor, TaskRunner, UNSTABLE_TASK,
};
pub use queue::{QueueError, WorkQueue};
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
