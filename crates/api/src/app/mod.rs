//! HTTP API application wiring (Axum router + engine wiring).
//!
//! - `services.rs`: engine construction (store, config)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::JobEngine;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// The engine is shared with the caller, which owns its lifecycle.
pub fn build_app(engine: Arc<JobEngine>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/stats", get(routes::system::stats))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(engine)))
}
