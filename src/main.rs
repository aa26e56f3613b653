//! Application entry point for the `loadwatch` backend service.
//!
//! This binary orchestrates the startup sequence for the load management
//! dashboard API:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the shared application state (config store, data log, login guard)
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving until Ctrl-C
//!
//! # Environment Variables
//! - `LOADWATCH_BIND_ADDR` (optional) – listen address (default: `0.0.0.0:8080`)
//! - `LOADWATCH_CONFIG_FILE` (optional) – saved settings JSON (default: `load_config.json`)
//! - `LOADWATCH_DATA_LOG_FILE` (optional) – per-tick CSV log (default: `load_data_log.csv`)
//! - `LOADWATCH_USERNAME` / `LOADWATCH_PASSWORD` (optional) – dashboard credentials
//! - `LOADWATCH_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `LOADWATCH_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the remaining tuning knobs.
use std::env;

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use loadwatch::{config, routes, AppState};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let bind_addr = cfg.bind_addr;
    let state = AppState::from_config(cfg);

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", bind_addr, e))?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

// ---

async fn shutdown_signal() {
    // ---
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `LOADWATCH_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `LOADWATCH_LOG_LEVEL` env var
///
/// Called once at startup, after `.env` has been read so the variables above
/// can come from it.
fn init_tracing() {
    // ---
    let span_events = match env::var("LOADWATCH_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to LOADWATCH_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("LOADWATCH_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper=info,tower=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
