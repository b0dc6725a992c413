//! Job storage contract and the in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jobqueue_core::{Job, JobId};

/// Job store abstraction.
///
/// Called concurrently by submitters, workers and readers; implementations
/// must be internally synchronized.
pub trait JobStore: Send + Sync {
    /// Insert or replace a job, keyed by its id.
    fn save(&self, job: &Job) -> Result<(), JobStoreError>;

    /// All stored jobs, oldest first.
    fn find_all(&self) -> Result<Vec<Job>, JobStoreError>;

    /// Get a job by ID. Absent jobs are [`JobStoreError::NotFound`].
    fn find_by_id(&self, id: JobId) -> Result<Job, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

impl JobStoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl<S: JobStore + ?Sized> JobStore for Arc<S> {
    fn save(&self, job: &Job) -> Result<(), JobStoreError> {
        (**self).save(job)
    }

    fn find_all(&self) -> Result<Vec<Job>, JobStoreError> {
        (**self).find_all()
    }

    fn find_by_id(&self, id: JobId) -> Result<Job, JobStoreError> {
        (**self).find_by_id(id)
    }
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobStore for InMemoryJobStore {
    fn save(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| JobStoreError::storage("job map lock poisoned"))?;
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn find_all(&self) -> Result<Vec<Job>, JobStoreError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| JobStoreError::storage("job map lock poisoned"))?;
        let mut result: Vec<_> = jobs.values().cloned().collect();

        // UUIDv7 ids break created_at ties in submission order.
        result.sort_by_key(|j| (j.created_at, j.id));
        Ok(result)
    }

    fn find_by_id(&self, id: JobId) -> Result<Job, JobStoreError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| JobStoreError::storage("job map lock poisoned"))?;
        jobs.get(&id).cloned().ok_or(JobStoreError::NotFound(id))
    }
}
