//! Threshold, logging and persistence endpoints for a session's settings.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{run_blocking, session_handle, ApiResult};
use crate::models::{Settings, Thresholds};
use crate::state::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/sessions/{id}/settings", get(current))
        .route("/sessions/{id}/settings/thresholds", put(update_thresholds))
        .route("/sessions/{id}/settings/logging", put(update_logging))
        .route("/sessions/{id}/settings/save", post(save))
        .route("/sessions/{id}/settings/load", post(load))
        .route("/sessions/{id}/settings/reset", post(reset))
}

#[derive(Debug, Deserialize)]
struct LoggingRequest {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct LoadResponse {
    loaded: bool,
    settings: Settings,
}

async fn current(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Settings>> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    Ok(Json(session.settings().clone()))
}

async fn update_thresholds(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(thresholds): Json<Thresholds>,
) -> ApiResult<Json<Thresholds>> {
    // ---
    let thresholds = run_blocking(&state, id, move |session| {
        session.update_thresholds(thresholds)?;
        Ok(session.settings().thresholds)
    })
    .await?;
    Ok(Json(thresholds))
}

async fn update_logging(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<LoggingRequest>,
) -> ApiResult<Json<Settings>> {
    // ---
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    session.set_logging_enabled(req.enabled);
    info!("Session {} data logging {}", id, if req.enabled { "enabled" } else { "disabled" });
    Ok(Json(session.settings().clone()))
}

async fn save(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Settings>> {
    // ---
    let settings = run_blocking(&state, id, |session| {
        session.save_settings()?;
        Ok(session.settings().clone())
    })
    .await?;
    Ok(Json(settings))
}

/// Handle `POST /sessions/{id}/settings/load`. `loaded` is false when no
/// configuration has been saved yet; the session keeps what it has.
async fn load(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<LoadResponse>> {
    // ---
    let response = run_blocking(&state, id, |session| {
        let loaded = session.load_settings()?;
        Ok(LoadResponse {
            loaded,
            settings: session.settings().clone(),
        })
    })
    .await?;
    Ok(Json(response))
}

async fn reset(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Settings>> {
    // ---
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    session.reset_to_defaults();
    Ok(Json(session.settings().clone()))
}
