//! Status snapshot: per-status job counts, derived on demand.

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobStatus};

/// Point-in-time count of jobs by status.
///
/// Never persisted. `Canceled` is reserved and has no bucket.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusSnapshot {
    pub pending: usize,
    pub running: usize,
    pub failed: usize,
    pub completed: usize,
}

impl JobStatusSnapshot {
    /// Tally a full set of jobs.
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        jobs.into_iter().fold(Self::default(), |mut snapshot, job| {
            snapshot.record(job.status());
            snapshot
        })
    }

    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Canceled => {}
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.running + self.failed + self.completed
    }
}
