use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use jobqueue_core::JobId;

use crate::app::services::{run_blocking, JobEngine};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/jobs", get(list_jobs).post(enqueue_job))
        .route("/jobs/status", get(job_status))
        .route("/jobs/:id", get(get_job))
}

/// Submit a task and return the created job as stored right after submission.
pub async fn enqueue_job(
    Extension(engine): Extension<Arc<JobEngine>>,
    Json(body): Json<dto::EnqueueJobRequest>,
) -> axum::response::Response {
    let created = run_blocking(engine, move |engine| {
        let id = engine.enqueue(body.task)?;
        engine.get_job_by_id(id)
    })
    .await;

    match created {
        Ok(job) => (StatusCode::CREATED, Json(dto::JobResponse::from(job))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn list_jobs(Extension(engine): Extension<Arc<JobEngine>>) -> axum::response::Response {
    match run_blocking(engine, |engine| engine.get_all_jobs()).await {
        Ok(jobs) => Json(
            jobs.into_iter()
                .map(dto::JobResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_job(
    Extension(engine): Extension<Arc<JobEngine>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(id) => id,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("{e}"));
        }
    };

    match run_blocking(engine, move |engine| engine.get_job_by_id(id)).await {
        Ok(job) => Json(dto::JobResponse::from(job)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn job_status(Extension(engine): Extension<Arc<JobEngine>>) -> axum::response::Response {
    match run_blocking(engine, |engine| engine.get_job_status()).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(resp) => resp,
    }
}
