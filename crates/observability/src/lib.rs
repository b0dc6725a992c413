//! Process-wide tracing/logging setup.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing/logging for the process using `JOBQUEUE_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
