//! HTTP API: server wiring, routing, and request/response mapping over the job engine.

pub mod app;
