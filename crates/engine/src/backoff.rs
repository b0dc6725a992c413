//! Retry policy and the interruptible delay used between attempts.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Retry policy: bounded attempts with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Delay unit; multiplied by the attempt number
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts,
            backoff_unit,
        }
    }

    /// Delay after a failed attempt (1-indexed): `attempt * backoff_unit`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    /// Check if more attempts are allowed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// How a [`DelayGate::wait`] ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DelayOutcome {
    Elapsed,
    Interrupted,
}

/// Sleep primitive that can be woken early.
///
/// Once interrupted, the gate stays open: every current and future `wait`
/// returns [`DelayOutcome::Interrupted`] immediately. A gate shared by
/// several jobs (the engine hands one to every worker) is therefore a
/// process-wide "stop backing off" switch, not a per-job cancel; per-job
/// cancellation needs one gate per job.
#[derive(Debug, Default)]
pub struct DelayGate {
    interrupted: Mutex<bool>,
    wake: Condvar,
}

impl DelayGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the calling thread for `delay` unless interrupted first.
    pub fn wait(&self, delay: Duration) -> DelayOutcome {
        let deadline = Instant::now() + delay;
        let mut interrupted = self
            .interrupted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Loop guards against spurious wakeups.
        while !*interrupted {
            let now = Instant::now();
            if now >= deadline {
                return DelayOutcome::Elapsed;
            }
            interrupted = self
                .wake
                .wait_timeout(interrupted, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        DelayOutcome::Interrupted
    }

    /// Wake every waiter and open the gate.
    pub fn interrupt(&self) {
        let mut interrupted = self
            .interrupted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *interrupted = true;
        self.wake.notify_all();
    }

    pub fn is_interrupted(&self) -> bool {
        *self
            .interrupted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
