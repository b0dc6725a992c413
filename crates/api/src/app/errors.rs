use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use jobqueue_engine::EngineError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::Validation(e) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        EngineError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("job {id} not found"))
        }
        EngineError::QueueClosed | EngineError::Stopped => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "shutting_down",
            "job queue is not accepting work",
        ),
        EngineError::Storage(e) => {
            tracing::error!(error = %e, "job store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", e.to_string())
        }
        other => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "engine_error",
            other.to_string(),
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
