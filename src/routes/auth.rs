// src/routes/auth.rs
//! Login and logout. A successful login opens a new dashboard session and
//! returns its id; repeated failures lock the login for a while.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{ApiError, ApiResult};
use crate::state::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/login", post(login))
        .route("/sessions/{id}/logout", post(logout))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    session_id: Uuid,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    // ---
    info!("POST /login - user '{}'", req.username);

    // Guard lock is released before the session registry is touched
    state
        .login()
        .lock()
        .await
        .attempt(&req.username, &req.password, Utc::now())?;

    let session_id = state.open_session().await?;
    Ok(Json(LoginResponse { session_id }))
}

async fn logout(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    // ---
    if state.close_session(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::UnknownSession(id))
    }
}
