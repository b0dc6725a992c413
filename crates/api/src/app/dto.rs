use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jobqueue_core::{Job, JobId, JobStatus};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct EnqueueJobRequest {
    pub task: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: JobId,
    pub task: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            status: job.status(),
            attempts: job.attempts(),
            last_error: job.last_error().map(str::to_string),
            task: job.task.into_inner(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
