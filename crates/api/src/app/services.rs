use std::sync::Arc;

use axum::http::StatusCode;

use jobqueue_engine::{Engine, EngineConfig, EngineError, InMemoryJobStore, JobStore};

use crate::app::errors;

/// Engine behind the HTTP surface. The store is erased so the router does
/// not depend on a concrete backend.
pub type JobEngine = Engine<Arc<dyn JobStore>>;

/// Build an engine over the in-memory store. Workers are not started.
pub fn build_engine(config: EngineConfig) -> Result<Arc<JobEngine>, EngineError> {
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    Ok(Arc::new(Engine::new(config, store)?))
}

/// Run an engine call off the async runtime. Submission can block on a full
/// queue and store access takes locks.
pub async fn run_blocking<T, F>(
    engine: Arc<JobEngine>,
    f: F,
) -> Result<T, axum::response::Response>
where
    T: Send + 'static,
    F: FnOnce(&JobEngine) -> Result<T, EngineError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&engine)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(errors::engine_error_to_response(e)),
        Err(e) => {
            tracing::error!(error = %e, "engine task panicked");
            Err(errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "engine task failed",
            ))
        }
    }
}
