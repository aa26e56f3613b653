//! Route gateway (EMBP): each sibling module exports a subrouter for one
//! concern of the dashboard, and this module merges them and attaches the
//! shared state. `main.rs` only ever calls [`router`].

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Router;
use chrono::{DateTime, FixedOffset, Local};
use uuid::Uuid;

use crate::session::{DashboardSession, SessionError};
use crate::state::{AppState, SessionHandle};

mod alerts;
mod auth;
mod energy;
mod error;
mod health;
mod loads;
mod monitoring;
mod settings;

pub use error::{ApiError, ApiResult};

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(monitoring::router())
        .merge(loads::router())
        .merge(energy::router())
        .merge(alerts::router())
        .merge(settings::router())
        .with_state(state)
}

// ---

/// Look up a session or fail with 404.
async fn session_handle(state: &AppState, id: Uuid) -> ApiResult<SessionHandle> {
    state
        .session(id)
        .await
        .ok_or(ApiError::UnknownSession(id))
}

/// Run a session operation that touches the config or log file on the
/// blocking pool. The session lock is held for the whole operation.
async fn run_blocking<T, F>(state: &AppState, id: Uuid, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut DashboardSession) -> Result<T, SessionError> + Send + 'static,
{
    // ---
    let handle = session_handle(state, id).await?;
    let result = tokio::task::spawn_blocking(move || {
        let mut session = handle.blocking_lock();
        op(&mut session)
    })
    .await?;
    Ok(result?)
}

/// Current time with the site's UTC offset. Ticks measure elapsed time on it;
/// tariff periods and sample timestamps use its local reading.
fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Wrap a CSV document as a file download.
fn csv_download(prefix: &str, body: String) -> Response {
    // ---
    let filename = format!("{}_{}.csv", prefix, Local::now().format("%Y%m%d_%H%M%S"));
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
