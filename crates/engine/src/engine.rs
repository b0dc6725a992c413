//! Engine: submission, the worker pool lifecycle, and read operations.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, error, info};

use jobqueue_core::{Job, JobId, JobStatusSnapshot, TaskDescriptor};

use crate::backoff::DelayGate;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::executor::{ExecutorStats, PlaceholderRunner, RetryExecutor, TaskRunner};
use crate::queue::WorkQueue;
use crate::store::JobStore;

enum Lifecycle {
    Idle,
    Running(Vec<thread::JoinHandle<()>>),
    Stopped,
}

/// Asynchronous job execution engine.
///
/// - `enqueue` validates, persists (`Pending`), then pushes onto a bounded
///   queue, blocking while it is full
/// - `start` launches `worker_count` threads draining the queue through the
///   retry executor
/// - `stop` closes the queue, lets workers drain what is already queued,
///   and joins them
/// - reads go straight to the job store
///
/// Jobs enqueued before `start` wait in the queue; if the queue fills up
/// before `start`, `enqueue` blocks until workers are running. `stop` on an
/// engine that was never started launches the pool just to drain.
pub struct Engine<S: JobStore + 'static> {
    config: EngineConfig,
    store: Arc<S>,
    queue: Arc<WorkQueue<Job>>,
    executor: Arc<RetryExecutor<Arc<S>>>,
    stats: Arc<Mutex<ExecutorStats>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<S: JobStore + 'static> Engine<S> {
    /// Create an engine running the placeholder task semantics.
    pub fn new(config: EngineConfig, store: S) -> Result<Self, EngineError> {
        Self::with_runner(config, store, PlaceholderRunner)
    }

    /// Create an engine with an explicit task runner.
    pub fn with_runner<R>(config: EngineConfig, store: S, runner: R) -> Result<Self, EngineError>
    where
        R: TaskRunner + 'static,
    {
        config.validate()?;

        let store = Arc::new(store);
        // One latching gate for the whole pool, never interrupted here:
        // graceful stop lets backoffs run out.
        let executor = RetryExecutor::new(
            store.clone(),
            Arc::new(runner),
            config.retry_policy(),
            Arc::new(DelayGate::new()),
        );

        Ok(Self {
            queue: WorkQueue::arc(config.queue_capacity),
            store,
            executor: Arc::new(executor),
            stats: Arc::new(Mutex::new(ExecutorStats::default())),
            lifecycle: Mutex::new(Lifecycle::Idle),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Launch the worker pool.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running(_) => return Err(EngineError::AlreadyStarted),
            Lifecycle::Stopped => return Err(EngineError::Stopped),
        }

        let handles = match self.spawn_workers() {
            Ok(handles) => handles,
            Err(e) => {
                *lifecycle = Lifecycle::Stopped;
                return Err(e);
            }
        };

        *lifecycle = Lifecycle::Running(handles);
        info!(
            engine = %self.config.name,
            workers = self.config.worker_count,
            queue_capacity = self.config.queue_capacity,
            "started job queue workers"
        );
        Ok(())
    }

    /// Graceful shutdown: refuse new jobs, drain queued ones, join workers.
    ///
    /// Idempotent. Stopping an engine that was never started spawns the pool
    /// first, so jobs already queued (and submissions blocked on a full
    /// queue) still run to a terminal status.
    pub fn stop(&self) {
        let handles = {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(handles) => handles,
                Lifecycle::Stopped => Vec::new(),
                Lifecycle::Idle => match self.spawn_workers() {
                    Ok(handles) => {
                        debug!(engine = %self.config.name, "draining engine that was never started");
                        handles
                    }
                    // Queue is closed and nothing can drain it; what was
                    // queued stays `Pending`.
                    Err(_) => return,
                },
            }
        };

        self.queue.close();

        if handles.is_empty() {
            return;
        }

        info!(engine = %self.config.name, "stopping job queue workers");
        for handle in handles {
            if handle.join().is_err() {
                error!(engine = %self.config.name, "worker panicked");
            }
        }
        info!(engine = %self.config.name, "job queue workers stopped");
    }

    /// Spawn `worker_count` named workers. On failure the queue is closed and
    /// any workers already spawned are joined.
    fn spawn_workers(&self) -> Result<Vec<thread::JoinHandle<()>>, EngineError> {
        let mut handles = Vec::with_capacity(self.config.worker_count);
        for i in 0..self.config.worker_count {
            let name = format!("{}-worker-{i}", self.config.name);
            let queue = self.queue.clone();
            let executor = self.executor.clone();
            let stats = self.stats.clone();

            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(name, queue, executor, stats));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!(engine = %self.config.name, error = %e, "failed to spawn worker");
                    self.queue.close();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(EngineError::Spawn(e));
                }
            }
        }
        Ok(handles)
    }

    pub fn is_running(&self) -> bool {
        matches!(
            *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner),
            Lifecycle::Running(_)
        )
    }

    /// Submit a task. Returns the new job's id once it is persisted and queued.
    ///
    /// Blocks while the queue is full. A failed save returns the storage
    /// error and nothing is queued.
    pub fn enqueue(&self, task: impl Into<String>) -> Result<JobId, EngineError> {
        let task = TaskDescriptor::parse(task)?;

        // Reserve before saving so a concurrent stop cannot leave a saved
        // job that never reaches a worker.
        let producer = self.queue.producer()?;

        let job = Job::new(task);
        let id = job.id;
        if let Err(e) = self.store.save(&job) {
            error!(job_id = %id, error = %e, "failed to save job to repository");
            return Err(EngineError::Storage(e));
        }

        let task = job.task.clone();
        producer.push(job)?;

        info!(job_id = %id, task = %task, "job enqueued");
        Ok(id)
    }

    pub fn get_job_by_id(&self, id: JobId) -> Result<Job, EngineError> {
        Ok(self.store.find_by_id(id)?)
    }

    pub fn get_all_jobs(&self) -> Result<Vec<Job>, EngineError> {
        Ok(self.store.find_all()?)
    }

    /// Count stored jobs by status. Recomputed from the store on every call.
    pub fn get_job_status(&self) -> Result<JobStatusSnapshot, EngineError> {
        let jobs = self.store.find_all()?;
        Ok(JobStatusSnapshot::from_jobs(&jobs))
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    /// Submissions mid-push, including those blocked on a full queue.
    pub fn blocked_submissions(&self) -> usize {
        self.queue.pending_pushes()
    }
}

impl<S: JobStore + 'static> Drop for Engine<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S: JobStore + 'static> std::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("queue", &self.queue)
            .field("running", &self.is_running())
            .finish()
    }
}

fn worker_loop<S: JobStore>(
    name: String,
    queue: Arc<WorkQueue<Job>>,
    executor: Arc<RetryExecutor<Arc<S>>>,
    stats: Arc<Mutex<ExecutorStats>>,
) {
    debug!(worker = %name, "worker started");

    while let Some(job) = queue.pop() {
        stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .job_started();

        let outcome = executor.process(job, &name);

        stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .job_finished(&outcome);
    }

    debug!(worker = %name, "worker stopped");
}
