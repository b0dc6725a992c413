//! Job record and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::JobId;
use crate::task::TaskDescriptor;

/// Job execution status.
///
/// Transitions only move forward: `Pending -> Running -> {Completed | Failed}`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Persisted and queued, waiting for a worker
    Pending,
    /// Owned by a worker, attempts in progress
    Running,
    /// An attempt succeeded
    Completed,
    /// Retries exhausted
    Failed,
    /// Reserved; nothing produces it yet
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled
        )
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Canceled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Canceled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Canceled => "CANCELED",
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a single execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAttemptRecord {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A submitted unit of work.
///
/// `status`, `attempts` and `history` only change through the lifecycle
/// methods below, which reject regressions and enforce the attempt bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub task: TaskDescriptor,
    status: JobStatus,
    attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    history: Vec<JobAttemptRecord>,
}

impl Job {
    /// Create a new pending job with a fresh identifier and zero attempts.
    pub fn new(task: TaskDescriptor) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            task,
            status: JobStatus::Pending,
            attempts: 0,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn history(&self) -> &[JobAttemptRecord] {
        &self.history
    }

    pub fn last_error(&self) -> Option<&str> {
        self.history.iter().rev().find_map(|r| r.error.as_deref())
    }

    /// `Pending -> Running`, on pickup by a worker.
    pub fn mark_running(&mut self) -> DomainResult<()> {
        self.transition(JobStatus::Running)
    }

    /// Start the next attempt and return its 1-based number.
    ///
    /// Only valid while `Running` and while `attempts < max_attempts`.
    pub fn begin_attempt(&mut self, max_attempts: u32) -> DomainResult<u32> {
        if self.status != JobStatus::Running {
            return Err(DomainError::invalid_transition(format!(
                "cannot start an attempt while {}",
                self.status
            )));
        }
        if self.attempts >= max_attempts {
            return Err(DomainError::invalid_transition(format!(
                "attempt limit reached ({}/{max_attempts})",
                self.attempts
            )));
        }
        self.attempts += 1;
        self.updated_at = Utc::now();
        Ok(self.attempts)
    }

    /// The current attempt succeeded: `Running -> Completed`.
    pub fn record_success(&mut self, started_at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(JobStatus::Completed)?;
        self.push_attempt(started_at, None);
        Ok(())
    }

    /// The current attempt failed. Status stays `Running`; the caller decides
    /// whether to retry or give up via [`Job::mark_failed`].
    pub fn record_failure(
        &mut self,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != JobStatus::Running {
            return Err(DomainError::invalid_transition(format!(
                "cannot record a failed attempt while {}",
                self.status
            )));
        }
        self.push_attempt(started_at, Some(error.into()));
        Ok(())
    }

    /// Retries exhausted: `Running -> Failed`.
    pub fn mark_failed(&mut self) -> DomainResult<()> {
        self.transition(JobStatus::Failed)
    }

    fn transition(&mut self, next: JobStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_transition(format!(
                "{} -> {next}",
                self.status
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn push_attempt(&mut self, started_at: DateTime<Utc>, error: Option<String>) {
        let now = Utc::now();
        self.updated_at = now;
        self.history.push(JobAttemptRecord {
            attempt: self.attempts,
            started_at,
            finished_at: now,
            success: error.is_none(),
            error,
            duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn job(task: &str) -> Job {
        Job::new(TaskDescriptor::parse(task).unwrap())
    }

    fn rank(status: JobStatus) -> u8 {
        match status {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            _ => 2,
        }
    }

    #[test]
    fn new_job_is_pending_with_no_attempts() {
        let job = job("send-email");
        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(job.attempts(), 0);
        assert!(job.history().is_empty());
    }

    #[test]
    fn happy_path_lifecycle() {
        let mut job = job("send-email");
        job.mark_running().unwrap();
        assert_eq!(job.begin_attempt(3).unwrap(), 1);
        job.record_success(Utc::now()).unwrap();

        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.attempts(), 1);
        assert_eq!(job.history().len(), 1);
        assert!(job.history()[0].success);
    }

    #[test]
    fn failed_attempts_are_recorded_then_job_fails() {
        let mut job = job("flaky");
        job.mark_running().unwrap();
        for n in 1..=2 {
            assert_eq!(job.begin_attempt(2).unwrap(), n);
            job.record_failure(format!("boom {n}"), Utc::now()).unwrap();
        }
        assert!(job.begin_attempt(2).is_err());
        job.mark_failed().unwrap();

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.attempts(), 2);
        assert_eq!(job.last_error(), Some("boom 2"));
    }

    #[test]
    fn regressions_are_rejected() {
        let mut job = job("send-email");
        job.mark_running().unwrap();
        job.begin_attempt(3).unwrap();
        job.record_success(Utc::now()).unwrap();

        assert!(matches!(
            job.mark_running(),
            Err(DomainError::InvalidTransition(_))
        ));
        assert!(job.mark_failed().is_err());
        assert_eq!(job.status(), JobStatus::Completed);
    }

    #[test]
    fn attempts_require_running_status() {
        let mut job = job("send-email");
        assert!(job.begin_attempt(3).is_err());
        assert!(job.record_failure("nope", Utc::now()).is_err());
        assert_eq!(job.attempts(), 0);
    }

    #[test]
    fn status_serializes_in_upper_case() {
        let json = serde_json::to_value(job("send-email")).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["attempts"], 0);
        assert_eq!(json["task"], "send-email");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Whatever the attempt outcomes, attempts stay within the bound and
        /// status never moves backwards.
        #[test]
        fn attempts_bounded_and_status_monotonic(
            max in 1u32..6,
            outcomes in prop::collection::vec(any::<bool>(), 0..10)
        ) {
            let mut job = job("property");
            let mut last = rank(job.status());

            job.mark_running().unwrap();
            prop_assert!(rank(job.status()) >= last);
            last = rank(job.status());

            let mut outcomes = outcomes.into_iter();
            while job.attempts() < max {
                job.begin_attempt(max).unwrap();
                prop_assert!(job.attempts() <= max);
                if outcomes.next().unwrap_or(true) {
                    job.record_success(Utc::now()).unwrap();
                    break;
                }
                job.record_failure("failed", Utc::now()).unwrap();
            }
            if job.status() != JobStatus::Completed {
                job.mark_failed().unwrap();
            }

            prop_assert!(rank(job.status()) >= last);
            prop_assert!(job.status().is_terminal());
            prop_assert!(job.attempts() >= 1 && job.attempts() <= max);
            prop_assert_eq!(job.history().len() as u32, job.attempts());
        }
    }
}
