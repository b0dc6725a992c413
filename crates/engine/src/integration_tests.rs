//! End-to-end tests for the engine.
//!
//! Tests: enqueue → store (Pending) → queue → worker → executor → store
//!
//! Verifies:
//! - Retry outcomes for flaky, ordinary and always-failing tasks
//! - Attempt bound and monotonic status on every persisted write
//! - Backpressure, FIFO pickup, and graceful drain on stop
//! - Storage failures at submission never enqueue

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use jobqueue_core::{Job, JobId, JobStatus, TaskDescriptor};

    use crate::{
        Engine, EngineConfig, EngineError, InMemoryJobStore, JobStore, JobStoreError,
        TaskRunner, UNSTABLE_TASK,
    };

    const MAX_RETRIES: u32 = 3;

    fn test_config() -> EngineConfig {
        EngineConfig::default()
            .with_name("it")
            .with_worker_count(3)
            .with_queue_capacity(16)
            .with_max_retries(MAX_RETRIES)
            .with_backoff_unit(Duration::from_millis(2))
    }

    fn wait_for_terminal<S: JobStore>(engine: &Engine<S>, id: JobId) -> Job {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let job = engine.get_job_by_id(id).unwrap();
            if job.status().is_terminal() {
                return job;
            }
            assert!(
                Instant::now() < deadline,
                "job {id} still {} after timeout",
                job.status()
            );
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn rank(status: JobStatus) -> u8 {
        match status {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            _ => 2,
        }
    }

    struct AlwaysFails;

    impl TaskRunner for AlwaysFails {
        fn run(&self, _task: &TaskDescriptor, attempt: u32) -> Result<(), String> {
            Err(format!("attempt {attempt} failed"))
        }
    }

    /// Records the task of every first attempt, in pickup order.
    #[derive(Default)]
    struct PickupLog {
        seen: Mutex<Vec<String>>,
    }

    impl TaskRunner for Arc<PickupLog> {
        fn run(&self, task: &TaskDescriptor, attempt: u32) -> Result<(), String> {
            if attempt == 1 {
                self.seen.lock().unwrap().push(task.to_string());
            }
            Ok(())
        }
    }

    /// Store that checks every write against the previous one for the same job.
    #[derive(Default)]
    struct AuditingStore {
        inner: InMemoryJobStore,
        violations: Mutex<Vec<String>>,
        last_seen: Mutex<HashMap<JobId, (JobStatus, u32)>>,
    }

    impl JobStore for AuditingStore {
        fn save(&self, job: &Job) -> Result<(), JobStoreError> {
            let mut last_seen = self.last_seen.lock().unwrap();
            let mut violations = self.violations.lock().unwrap();

            if job.attempts() > MAX_RETRIES {
                violations.push(format!("{}: attempts {}", job.id, job.attempts()));
            }
            if let Some((status, attempts)) = last_seen.get(&job.id) {
                if rank(job.status()) < rank(*status) {
                    violations.push(format!("{}: {} -> {}", job.id, status, job.status()));
                }
                if job.attempts() < *attempts {
                    violations.push(format!("{}: attempts went backwards", job.id));
                }
            }
            last_seen.insert(job.id, (job.status(), job.attempts()));
            self.inner.save(job)
        }

        fn find_all(&self) -> Result<Vec<Job>, JobStoreError> {
            self.inner.find_all()
        }

        fn find_by_id(&self, id: JobId) -> Result<Job, JobStoreError> {
            self.inner.find_by_id(id)
        }
    }

    /// Store whose saves fail while `broken` is set.
    #[derive(Default)]
    struct SwitchableStore {
        inner: InMemoryJobStore,
        broken: AtomicBool,
    }

    impl JobStore for SwitchableStore {
        fn save(&self, job: &Job) -> Result<(), JobStoreError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(JobStoreError::storage("database unavailable"));
            }
            self.inner.save(job)
        }

        fn find_all(&self) -> Result<Vec<Job>, JobStoreError> {
            self.inner.find_all()
        }

        fn find_by_id(&self, id: JobId) -> Result<Job, JobStoreError> {
            self.inner.find_by_id(id)
        }
    }

    #[test]
    fn unstable_task_completes_on_third_attempt() {
        let engine = Engine::new(test_config(), InMemoryJobStore::new()).unwrap();
        engine.start().unwrap();

        let id = engine.enqueue(UNSTABLE_TASK).unwrap();
        let job = wait_for_terminal(&engine, id);

        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.attempts(), 3);
    }

    #[test]
    fn ordinary_task_completes_on_first_attempt() {
        let engine = Engine::new(test_config(), InMemoryJobStore::new()).unwrap();
        engine.start().unwrap();

        let id = engine.enqueue("send-welcome-email").unwrap();
        let job = wait_for_terminal(&engine, id);

        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.attempts(), 1);
        assert_eq!(job.task.as_str(), "send-welcome-email");
    }

    #[test]
    fn always_failing_task_ends_failed_after_max_retries() {
        let engine =
            Engine::with_runner(test_config(), InMemoryJobStore::new(), AlwaysFails).unwrap();
        engine.start().unwrap();

        let id = engine.enqueue("doomed").unwrap();
        let job = wait_for_terminal(&engine, id);

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.attempts(), MAX_RETRIES);
        assert_eq!(job.history().len() as u32, MAX_RETRIES);
    }

    #[test]
    fn every_write_respects_attempt_bound_and_monotonic_status() {
        let store = Arc::new(AuditingStore::default());
        let engine = Engine::new(test_config(), store.clone()).unwrap();
        engine.start().unwrap();

        let ids: Vec<JobId> = (0..12)
            .map(|i| {
                let task = if i % 3 == 0 {
                    UNSTABLE_TASK.to_string()
                } else {
                    format!("task-{i}")
                };
                engine.enqueue(task).unwrap()
            })
            .collect();
        for id in ids {
            wait_for_terminal(&engine, id);
        }
        engine.stop();

        assert!(
            store.violations.lock().unwrap().is_empty(),
            "violations: {:?}",
            store.violations.lock().unwrap()
        );
    }

    #[test]
    fn status_counts_always_sum_to_stored_jobs() {
        let engine = Engine::new(test_config(), InMemoryJobStore::new()).unwrap();
        engine.start().unwrap();

        let mut ids = Vec::new();
        for i in 0..10 {
            ids.push(engine.enqueue(if i % 2 == 0 { UNSTABLE_TASK } else { "quick" }).unwrap());

            let snapshot = engine.get_job_status().unwrap();
            assert_eq!(snapshot.total(), engine.get_all_jobs().unwrap().len());
        }
        for id in &ids {
            wait_for_terminal(&engine, *id);
        }

        let snapshot = engine.get_job_status().unwrap();
        assert_eq!(snapshot.total(), 10);
        assert_eq!(snapshot.completed, 10);
        assert_eq!(snapshot.pending + snapshot.running + snapshot.failed, 0);
    }

    #[test]
    fn concurrent_submissions_beyond_pool_size_all_finish() {
        let engine = Arc::new(
            Engine::new(
                test_config().with_worker_count(2).with_queue_capacity(4),
                InMemoryJobStore::new(),
            )
            .unwrap(),
        );
        engine.start().unwrap();

        let submitters: Vec<_> = (0..8)
            .map(|t| {
                let engine = engine.clone();
                thread::spawn(move || {
                    (0..5)
                        .map(|i| {
                            let task = if i == 0 {
                                UNSTABLE_TASK.to_string()
                            } else {
                                format!("job-{t}-{i}")
                            };
                            engine.enqueue(task).unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<JobId> = submitters
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 40);

        for id in &ids {
            let job = wait_for_terminal(&engine, *id);
            assert_eq!(job.status(), JobStatus::Completed);
        }
        assert_eq!(engine.get_all_jobs().unwrap().len(), 40);

        let stats = engine.stats();
        assert_eq!(stats.jobs_processed, 40);
        assert_eq!(stats.jobs_completed, 40);
    }

    #[test]
    fn enqueue_blocks_on_full_queue_until_a_worker_frees_capacity() {
        let engine = Arc::new(
            Engine::new(
                test_config().with_worker_count(1).with_queue_capacity(1),
                InMemoryJobStore::new(),
            )
            .unwrap(),
        );

        // Not started yet: the single slot fills up.
        let first = engine.enqueue("first").unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let blocked = {
            let engine = engine.clone();
            thread::spawn(move || {
                let result = engine.enqueue("second");
                done_tx.send(()).unwrap();
                result
            })
        };

        assert!(
            done_rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "enqueue returned while the queue was full"
        );

        engine.start().unwrap();
        done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        let second = blocked.join().unwrap().unwrap();

        assert_eq!(wait_for_terminal(&engine, first).status(), JobStatus::Completed);
        assert_eq!(wait_for_terminal(&engine, second).status(), JobStatus::Completed);
    }

    #[test]
    fn single_worker_picks_up_jobs_in_submission_order() {
        let log = Arc::new(PickupLog::default());
        let engine = Engine::with_runner(
            test_config().with_worker_count(1),
            InMemoryJobStore::new(),
            log.clone(),
        )
        .unwrap();

        let tasks: Vec<String> = (0..10).map(|i| format!("ordered-{i}")).collect();
        for task in &tasks {
            engine.enqueue(task.clone()).unwrap();
        }
        engine.start().unwrap();
        engine.stop();

        assert_eq!(*log.seen.lock().unwrap(), tasks);
    }

    #[test]
    fn stop_drains_already_queued_jobs() {
        let engine = Engine::new(
            test_config().with_worker_count(2).with_queue_capacity(32),
            InMemoryJobStore::new(),
        )
        .unwrap();

        let ids: Vec<JobId> = (0..20)
            .map(|i| {
                engine
                    .enqueue(if i % 4 == 0 { UNSTABLE_TASK } else { "drain-me" })
                    .unwrap()
            })
            .collect();

        engine.start().unwrap();
        engine.stop();

        for id in ids {
            let job = engine.get_job_by_id(id).unwrap();
            assert_eq!(job.status(), JobStatus::Completed, "job {id} not drained");
        }
        assert_eq!(engine.queue_depth(), 0);
    }

    #[test]
    fn storage_failure_at_submission_is_returned_and_nothing_is_queued() {
        let store = Arc::new(SwitchableStore::default());
        let engine = Engine::new(test_config(), store.clone()).unwrap();

        store.broken.store(true, Ordering::SeqCst);
        let err = engine.enqueue("never-stored").unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
        assert_eq!(engine.queue_depth(), 0);

        store.broken.store(false, Ordering::SeqCst);
        engine.start().unwrap();
        let id = engine.enqueue("stored").unwrap();
        wait_for_terminal(&engine, id);
        engine.stop();

        let jobs = engine.get_all_jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, id);
        assert_eq!(engine.stats().jobs_processed, 1);
    }

    #[test]
    fn storage_failure_mid_processing_is_counted_not_raised() {
        let store = Arc::new(SwitchableStore::default());
        let engine = Engine::with_runner(
            test_config().with_worker_count(1),
            store.clone(),
            AlwaysFails,
        )
        .unwrap();

        let id = engine.enqueue("never-runs").unwrap();
        store.broken.store(true, Ordering::SeqCst);
        engine.start().unwrap();
        engine.stop();

        // The RUNNING save failed, so the stored record never moved.
        let stored = engine.get_job_by_id(id).unwrap();
        assert_eq!(stored.status(), JobStatus::Pending);

        let stats = engine.stats();
        assert_eq!(stats.jobs_abandoned, 1);
        assert_eq!(stats.persistence_failures, 1);
    }
}
