use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::JobEngine;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Worker pool counters and current queue depth.
pub async fn stats(Extension(engine): Extension<Arc<JobEngine>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "running": engine.is_running(),
        "queue_depth": engine.queue_depth(),
        "blocked_submissions": engine.blocked_submissions(),
        "executor": engine.stats(),
    }))
}
