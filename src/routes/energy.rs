//! Energy and cost summary, and tariff replacement.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use super::{now, run_blocking, session_handle, ApiResult};
use crate::session::EnergySummary;
use crate::state::AppState;
use crate::tariff::TariffSchedule;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/sessions/{id}/energy", get(summary))
        .route("/sessions/{id}/tariff", put(update_tariff))
}

/// Handle `GET /sessions/{id}/energy`: consumption, cost and the rate in
/// effect right now.
async fn summary(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<EnergySummary>> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    Ok(Json(session.energy_summary(now().naive_local())))
}

async fn update_tariff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(tariff): Json<TariffSchedule>,
) -> ApiResult<Json<TariffSchedule>> {
    // ---
    let tariff = run_blocking(&state, id, move |session| {
        session.update_tariff(tariff)?;
        Ok(session.settings().tariff)
    })
    .await?;
    Ok(Json(tariff))
}
