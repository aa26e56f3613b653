//! Load profile listing, per-load toggle/adjust, and emergency shutdown.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{session_handle, ApiResult};
use crate::engine::LoadAdjustment;
use crate::models::LoadProfile;
use crate::state::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/sessions/{id}/loads", get(list))
        .route("/sessions/{id}/loads/shutdown", post(shutdown))
        .route("/sessions/{id}/loads/{name}", put(update))
}

/// Body of `PUT /sessions/{id}/loads/{name}`; omitted fields stay unchanged.
#[derive(Debug, Deserialize)]
struct LoadUpdate {
    enabled: Option<bool>,
    current_rating: Option<f64>,
    power_factor: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ShutdownResponse {
    switched_off: usize,
    loads: Vec<LoadProfile>,
}

async fn list(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<LoadProfile>>> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    Ok(Json(session.loads().to_vec()))
}

async fn update(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
    Json(body): Json<LoadUpdate>,
) -> ApiResult<Json<LoadProfile>> {
    // ---
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;

    // Adjust first: it is the step that can fail validation, and a toggle on
    // a name that just resolved cannot fail afterwards.
    let mut profile = session.adjust_load(
        &name,
        LoadAdjustment {
            current_rating: body.current_rating,
            power_factor: body.power_factor,
        },
    )?;
    if let Some(enabled) = body.enabled {
        profile = session.toggle_load(&name, enabled)?;
    }
    Ok(Json(profile))
}

async fn shutdown(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<ShutdownResponse>> {
    // ---
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    let switched_off = session.emergency_shutdown();
    Ok(Json(ShutdownResponse {
        switched_off,
        loads: session.loads().to_vec(),
    }))
}
