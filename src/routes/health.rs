// src/routes/health.rs
//! API health check endpoint for the loadwatch backend.
//!
//! This module defines the `/health` route used by container orchestrators
//! and CI pipelines to verify that the service is running and able to respond
//! to HTTP requests. It is a sibling module in the `routes` directory and
//! follows the Explicit Module Boundary Pattern (EMBP):
//! - Internal to this file: endpoint handler(s) and related types
//! - Exports to the gateway (`mod.rs`): a subrouter containing the `/health` route

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
}

/// Handle `GET /health`.
///
/// Reports the crate version and the number of open dashboard sessions.
/// Does not touch the config or log files.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.session_count().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
