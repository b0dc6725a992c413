//! Engine error model.

use thiserror::Error;

use jobqueue_core::{DomainError, JobId};

use crate::queue::QueueError;
use crate::store::JobStoreError;

/// Errors surfaced by the engine's public operations.
///
/// Task failures never appear here: they end up in the job's status.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The submission was rejected before anything was persisted.
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The job store failed a save or lookup.
    #[error(transparent)]
    Storage(JobStoreError),

    /// The engine has been stopped and no longer accepts submissions.
    #[error("job queue is closed")]
    QueueClosed,

    #[error("engine already started")]
    AlreadyStarted,

    #[error("engine stopped")]
    Stopped,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<JobStoreError> for EngineError {
    fn from(err: JobStoreError) -> Self {
        match err {
            JobStoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl From<QueueError> for EngineError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Closed => Self::QueueClosed,
        }
    }
}
