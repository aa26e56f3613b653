// src/routes/alerts.rs
//! Alert history endpoints (EMBP leaf).
//!
//! Alerts are raised by ticks; these routes only read, acknowledge, clear
//! and export what a session has accumulated. Listing is newest first.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{csv_download, session_handle, ApiResult};
use crate::models::AlertRecord;
use crate::session::AlertSummary;
use crate::state::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/sessions/{id}/alerts", get(list))
        .route("/sessions/{id}/alerts/clear", post(clear))
        .route("/sessions/{id}/alerts/export", get(export))
        .route("/sessions/{id}/alerts/{alert_id}/ack", post(acknowledge))
}

#[derive(Debug, Deserialize)]
struct AlertQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct AlertList {
    summary: AlertSummary,
    alerts: Vec<AlertRecord>,
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    removed: usize,
}

/// Handle `GET /sessions/{id}/alerts`, newest first.
async fn list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<Json<AlertList>> {
    // ---
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;

    let mut alerts: Vec<AlertRecord> = session.alerts().cloned().collect();
    alerts.reverse();
    if let Some(limit) = query.limit {
        alerts.truncate(limit);
    }

    Ok(Json(AlertList {
        summary: session.alert_summary(),
        alerts,
    }))
}

async fn acknowledge(
    State(state): State<AppState>,
    Path((id, alert_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    // ---
    let handle = session_handle(&state, id).await?;
    handle.lock().await.acknowledge_alert(alert_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<ClearResponse>> {
    let handle = session_handle(&state, id).await?;
    let removed = handle.lock().await.clear_alerts();
    Ok(Json(ClearResponse { removed }))
}

async fn export(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Response> {
    let handle = session_handle(&state, id).await?;
    let body = handle.lock().await.export_alerts_csv()?;
    Ok(csv_download("alerts", body))
}
