// src/routes/monitoring.rs
//! Monitoring lifecycle and the tick endpoint.
//!
//! The dashboard starts monitoring, then calls `POST /sessions/{id}/tick` on
//! its refresh timer; each call is one evaluation cycle. Also serves the
//! chart series, its CSV export and the clear-data action.
//! Follows the Explicit Module Boundary Pattern (EMBP):
//! - Internal to this file: handlers and response types
//! - Exports to the gateway (`mod.rs`): a subrouter for the routes above

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::{csv_download, now, run_blocking, session_handle, ApiResult};
use crate::session::{SeriesPoint, SessionStatus, TickReport};
use crate::state::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/sessions/{id}/status", get(status))
        .route("/sessions/{id}/monitoring/start", post(start))
        .route("/sessions/{id}/monitoring/stop", post(stop))
        .route("/sessions/{id}/tick", post(tick))
        .route("/sessions/{id}/history", get(history))
        .route("/sessions/{id}/history/export", get(export_history))
        .route("/sessions/{id}/history/clear", post(clear_history))
}

#[derive(Debug, Serialize)]
struct MonitoringResponse {
    monitoring: bool,
    changed: bool,
}

async fn status(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<SessionStatus>> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    Ok(Json(session.status()))
}

async fn start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MonitoringResponse>> {
    // ---
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    let changed = session.start_monitoring(now());
    Ok(Json(MonitoringResponse {
        monitoring: session.is_monitoring(),
        changed,
    }))
}

async fn stop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MonitoringResponse>> {
    // ---
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    let changed = session.stop_monitoring();
    Ok(Json(MonitoringResponse {
        monitoring: session.is_monitoring(),
        changed,
    }))
}

/// Handle `POST /sessions/{id}/tick`: one evaluation cycle.
///
/// Called by the dashboard on its refresh timer. The tick runs on the
/// blocking pool because it appends to the data log. The session lock is held
/// for the whole tick, including the append, so settings writes cannot
/// interleave with it.
async fn tick(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<TickReport>> {
    // ---
    debug!("POST /sessions/{}/tick", id);

    let at = now();
    let report = run_blocking(&state, id, move |session| session.tick(at)).await?;

    if !report.new_alerts.is_empty() {
        info!(
            "Session {} tick {} raised {} alert(s)",
            id,
            report.update_counter,
            report.new_alerts.len()
        );
    }
    Ok(Json(report))
}

async fn history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<SeriesPoint>>> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    Ok(Json(session.history()))
}

async fn export_history(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Response> {
    // ---
    let handle = session_handle(&state, id).await?;
    let body = handle.lock().await.export_history_csv()?;
    info!("Session {} exported history", id);
    Ok(csv_download("load_management_data", body))
}

async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionStatus>> {
    // ---
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    session.clear_data(now());
    Ok(Json(session.status()))
}
