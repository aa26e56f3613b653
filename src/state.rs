//! Shared application state handed to every axum handler.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::LoginGuard;
use crate::config::Config;
use crate::session::{DashboardSession, SessionLimits};
use crate::simulator::{SampleSource, SimulatedSource};
use crate::store::{ConfigStore, CsvLogSink, JsonFileConfigStore, LogSink, StoreError};

// ---

pub type SessionHandle = Arc<Mutex<DashboardSession>>;

/// Cheap to clone; everything mutable sits behind an `Arc<Mutex<_>>`.
///
/// Each session has its own lock, so one user's tick never waits on another
/// user's, while operations on the same session are serialized.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub config: Arc<Config>,
    pub config_store: Arc<dyn ConfigStore>,
    pub log_sink: Arc<dyn LogSink>,
    login: Arc<Mutex<LoginGuard>>,
    sessions: Arc<Mutex<HashMap<Uuid, SessionHandle>>>,
}

impl AppState {
    // ---
    pub fn new(config: Config, config_store: Arc<dyn ConfigStore>, log_sink: Arc<dyn LogSink>) -> Self {
        let login = LoginGuard::new(
            config.username.clone(),
            config.password.clone(),
            config.max_login_attempts,
            config.lockout_secs,
        );
        Self {
            config: Arc::new(config),
            config_store,
            log_sink,
            login: Arc::new(Mutex::new(login)),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// State backed by the JSON config file and CSV log named in `config`.
    pub fn from_config(config: Config) -> Self {
        let config_store = Arc::new(JsonFileConfigStore::new(config.config_file.clone()));
        let log_sink = Arc::new(CsvLogSink::new(config.data_log_file.clone()));
        Self::new(config, config_store, log_sink)
    }

    pub fn login(&self) -> &Mutex<LoginGuard> {
        &self.login
    }

    /// Create a session seeded from the stored settings (or the defaults).
    pub async fn open_session(&self) -> Result<Uuid, StoreError> {
        // ---
        let store = self.config_store.clone();
        let stored = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;

        let settings = match stored {
            Ok(Some(settings)) => settings,
            Ok(None) => Default::default(),
            Err(StoreError::Invalid(e)) => {
                warn!("Stored configuration rejected ({}), using defaults", e);
                Default::default()
            }
            Err(e) => return Err(e),
        };

        let source: Box<dyn SampleSource> = match self.config.sim_seed {
            Some(seed) => Box::new(SimulatedSource::seeded(seed)),
            None => Box::new(SimulatedSource::from_entropy()),
        };
        let limits = SessionLimits {
            max_data_points: self.config.max_data_points as usize,
            max_alerts: self.config.max_alerts as usize,
            time_scale: self.config.time_scale,
        };

        let session = DashboardSession::new(
            settings,
            limits,
            self.config_store.clone(),
            self.log_sink.clone(),
            source,
            Local::now().fixed_offset(),
        );

        let id = Uuid::new_v4();
        self.sessions
            .lock()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        info!("Session {} opened", id);
        Ok(id)
    }

    pub async fn session(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Returns `false` for an unknown id.
    pub async fn close_session(&self, id: Uuid) -> bool {
        let removed = self.sessions.lock().await.remove(&id).is_some();
        if removed {
            info!("Session {} closed", id);
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{Settings, Thresholds};
    use crate::store::{MemoryConfigStore, MemoryLogSink};

    fn state_with(store: MemoryConfigStore) -> AppState {
        AppState::new(
            Config {
                sim_seed: Some(1),
                ..Config::default()
            },
            Arc::new(store),
            Arc::new(MemoryLogSink::new()),
        )
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        // ---
        let state = state_with(MemoryConfigStore::new());
        let a = state.open_session().await.unwrap();
        let b = state.open_session().await.unwrap();
        assert_ne!(a, b);
        assert_eq!(state.session_count().await, 2);

        let session_a = state.session(a).await.unwrap();
        session_a.lock().await.emergency_shutdown();

        let session_b = state.session(b).await.unwrap();
        let b_guard = session_b.lock().await;
        assert!(b_guard.loads().iter().any(|load| load.enabled));
    }

    #[tokio::test]
    async fn test_new_session_uses_stored_settings() {
        // ---
        let stored = Settings {
            thresholds: Thresholds {
                max_voltage: 240.0,
                ..Thresholds::default()
            },
            ..Settings::default()
        };
        let state = state_with(MemoryConfigStore::with_settings(stored));

        let id = state.open_session().await.unwrap();
        let handle = state.session(id).await.unwrap();
        assert_eq!(handle.lock().await.settings().thresholds.max_voltage, 240.0);
    }

    #[tokio::test]
    async fn test_close_session() {
        // ---
        let state = state_with(MemoryConfigStore::new());
        let id = state.open_session().await.unwrap();

        assert!(state.close_session(id).await);
        assert!(!state.close_session(id).await);
        assert!(state.session(id).await.is_none());
    }
}
