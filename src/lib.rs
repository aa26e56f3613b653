//! Load monitoring and cost accrual backend.
//!
//! The crate is split along the Explicit Module Boundary Pattern (EMBP):
//! - `engine`, `tariff`, `models`: the pure tick evaluation, with no I/O
//! - `simulator`: the sample source feeding each tick
//! - `store`: settings persistence and the per-tick data log
//! - `session`, `auth`, `state`: per-login dashboard state and the login guard
//! - `routes`: the HTTP gateway built on the above
//!
//! `main.rs` only wires configuration, tracing and the router together.

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod routes;
pub mod session;
pub mod simulator;
pub mod state;
pub mod store;
pub mod tariff;

pub use config::Config;
pub use engine::{evaluate_tick, TickOutcome};
pub use error::{EngineError, EngineResult};
pub use models::{
    Alert, AlertKind, AlertRecord, EdgeState, LoadProfile, RunningTotals, Sample, Settings, Thresholds,
};
pub use state::AppState;
pub use tariff::{TariffPeriod, TariffSchedule};
