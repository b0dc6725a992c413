//! Per-job retry/backoff executor.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use jobqueue_core::{DomainError, DomainResult, Job, JobStatus, TaskDescriptor};

use crate::backoff::{DelayGate, DelayOutcome, RetryPolicy};
use crate::store::{JobStore, JobStoreError};

/// Task descriptor the placeholder runner treats as flaky.
pub const UNSTABLE_TASK: &str = "unstable-job";

/// Executes a single attempt of a task.
pub trait TaskRunner: Send + Sync {
    /// Run attempt number `attempt` (1-indexed). `Err` carries the failure
    /// reason recorded in the job's history.
    fn run(&self, task: &TaskDescriptor, attempt: u32) -> Result<(), String>;
}

/// Deterministic stand-in for real work.
///
/// [`UNSTABLE_TASK`] fails on attempts 1 and 2 and succeeds from attempt 3;
/// every other task succeeds on its first attempt.
#[derive(Debug, Copy, Clone, Default)]
pub struct PlaceholderRunner;

impl TaskRunner for PlaceholderRunner {
    fn run(&self, task: &TaskDescriptor, attempt: u32) -> Result<(), String> {
        if task.as_str() == UNSTABLE_TASK && attempt <= 2 {
            return Err(format!("{task} failed on attempt {attempt}"));
        }
        Ok(())
    }
}

/// What happened to a job handed to [`RetryExecutor::process`].
///
/// `Abandoned` and `Unpersisted` are the accepted inconsistency on storage
/// failure: nothing is retried and no caller is told; the engine only logs
/// and counts them.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Terminal status reached and saved.
    Finished(Job),
    /// The job's lifecycle refused processing (not pickable, or an attempt
    /// transition failed). No storage fault; the store keeps what it had.
    Rejected { job: Job, error: DomainError },
    /// The `Running` save failed; no attempt ran. The store keeps whatever
    /// was last saved.
    Abandoned { job: Job, error: JobStoreError },
    /// Terminal status reached in memory but the final save failed.
    Unpersisted { job: Job, error: JobStoreError },
}

impl ProcessOutcome {
    pub fn job(&self) -> &Job {
        match self {
            ProcessOutcome::Finished(job)
            | ProcessOutcome::Rejected { job, .. }
            | ProcessOutcome::Abandoned { job, .. }
            | ProcessOutcome::Unpersisted { job, .. } => job,
        }
    }

    pub fn into_job(self) -> Job {
        match self {
            ProcessOutcome::Finished(job)
            | ProcessOutcome::Rejected { job, .. }
            | ProcessOutcome::Abandoned { job, .. }
            | ProcessOutcome::Unpersisted { job, .. } => job,
        }
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExecutorStats {
    pub jobs_processed: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_rejected: u64,
    pub jobs_abandoned: u64,
    pub persistence_failures: u64,
    pub current_running: usize,
}

impl ExecutorStats {
    pub(crate) fn job_started(&mut self) {
        self.current_running += 1;
    }

    pub(crate) fn job_finished(&mut self, outcome: &ProcessOutcome) {
        self.current_running = self.current_running.saturating_sub(1);
        self.jobs_processed += 1;

        match outcome {
            ProcessOutcome::Rejected { .. } => {
                self.jobs_rejected += 1;
                return;
            }
            ProcessOutcome::Abandoned { .. } => {
                self.jobs_abandoned += 1;
                self.persistence_failures += 1;
                return;
            }
            ProcessOutcome::Unpersisted { .. } => self.persistence_failures += 1,
            ProcessOutcome::Finished(_) => {}
        }

        match outcome.job().status() {
            JobStatus::Completed => self.jobs_completed += 1,
            JobStatus::Failed => self.jobs_failed += 1,
            _ => {}
        }
    }
}

/// Runs one job through `Running`, its attempts and a terminal status.
///
/// The worker calling [`RetryExecutor::process`] owns the job exclusively for
/// the whole call, backoff delays included.
pub struct RetryExecutor<S> {
    store: S,
    runner: Arc<dyn TaskRunner>,
    policy: RetryPolicy,
    delay: Arc<DelayGate>,
}

impl<S: JobStore> RetryExecutor<S> {
    pub fn new(
        store: S,
        runner: Arc<dyn TaskRunner>,
        policy: RetryPolicy,
        delay: Arc<DelayGate>,
    ) -> Self {
        Self {
            store,
            runner,
            policy,
            delay,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Process a dequeued job to completion.
    pub fn process(&self, mut job: Job, worker: &str) -> ProcessOutcome {
        if let Err(e) = job.mark_running() {
            error!(worker, job_id = %job.id, error = %e, "job cannot be picked up");
            return ProcessOutcome::Rejected { job, error: e };
        }

        if let Err(e) = self.store.save(&job) {
            error!(
                worker,
                job_id = %job.id,
                error = %e,
                "failed to update job status to RUNNING"
            );
            return ProcessOutcome::Abandoned { job, error: e };
        }

        if let Err(e) = self.run_attempts(&mut job, worker) {
            // Unreachable for a freshly picked job; leave the stored RUNNING
            // record as is rather than save a state we cannot vouch for.
            error!(worker, job_id = %job.id, error = %e, "job lifecycle violated");
            return ProcessOutcome::Rejected { job, error: e };
        }

        if let Err(e) = self.store.save(&job) {
            error!(
                worker,
                job_id = %job.id,
                status = %job.status(),
                error = %e,
                "failed to save final job status"
            );
            return ProcessOutcome::Unpersisted { job, error: e };
        }

        ProcessOutcome::Finished(job)
    }

    fn run_attempts(&self, job: &mut Job, worker: &str) -> DomainResult<()> {
        while self.policy.should_retry(job.attempts()) {
            let attempt = job.begin_attempt(self.policy.max_attempts)?;
            info!(
                worker,
                job_id = %job.id,
                task = %job.task,
                attempt,
                "processing job"
            );

            let started = Utc::now();
            match self.runner.run(&job.task, attempt) {
                Ok(()) => {
                    job.record_success(started)?;
                    info!(worker, job_id = %job.id, task = %job.task, "job completed successfully");
                    return Ok(());
                }
                Err(reason) => {
                    warn!(
                        worker,
                        job_id = %job.id,
                        task = %job.task,
                        attempt,
                        error = %reason,
                        "job attempt failed"
                    );
                    job.record_failure(reason, started)?;
                }
            }

            if self.policy.should_retry(attempt) {
                let delay = self.policy.delay_for_attempt(attempt);
                if self.delay.wait(delay) == DelayOutcome::Interrupted {
                    debug!(worker, job_id = %job.id, attempt, "backoff interrupted");
                }
            }
        }

        job.mark_failed()?;
        error!(
            worker,
            job_id = %job.id,
            task = %job.task,
            attempts = job.attempts(),
            "job ultimately failed"
        );
        Ok(())
    }
}
