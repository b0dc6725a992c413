//! Tracing subscriber initialization.

use tracing_subscriber::EnvFilter;

const ENV_LOG_FORMAT: &str = "JOBQUEUE_LOG_FORMAT";

/// Output format for log lines.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable lines for local development
    Pretty,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "human" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }

    pub fn from_env() -> Self {
        std::env::var(ENV_LOG_FORMAT)
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }
}

/// Install the global subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_thread_names(true);

    let _ = match format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Pretty => builder.with_target(true).try_init(),
    };
}
