//! `jobqueue-core`: job domain building blocks.
//!
//! This crate contains **pure domain** types (no threads, no IO): the job
//! record and its lifecycle rules, task descriptors, identifiers, and the
//! status snapshot.

pub mod error;
pub mod id;
pub mod job;
pub mod status;
pub mod task;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use job::{Job, JobAttemptRecord, JobStatus};
pub use status::JobStatusSnapshot;
pub use task::TaskDescriptor;
