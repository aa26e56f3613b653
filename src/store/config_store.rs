//! Settings persistence: the `ConfigStore` seam plus JSON file and
//! in-memory implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use super::StoreError;
use crate::models::Settings;

// ---

/// Persists thresholds, tariff and load profiles as one flat document.
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Settings>, StoreError>;

    fn save(&self, settings: &Settings) -> Result<(), StoreError>;
}

/// Pretty-printed JSON file. Saves go through a sibling temp file and a
/// rename so a reader never sees a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileConfigStore {
    path: PathBuf,
}

impl JsonFileConfigStore {
    // ---
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileConfigStore {
    fn load(&self) -> Result<Option<Settings>, StoreError> {
        // ---
        if !self.path.exists() {
            info!(
                "No configuration file at {}, using defaults",
                self.path.display()
            );
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        let settings: Settings = serde_json::from_str(&raw)?;
        settings.validate()?;

        info!("Configuration loaded from {}", self.path.display());
        Ok(Some(settings))
    }

    fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        // ---
        settings.validate()?;

        let body = serde_json::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Configuration saved to {}", self.path.display());
        Ok(())
    }
}

/// Keeps the document in memory; used by tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    saved: Mutex<Option<Settings>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            saved: Mutex::new(Some(settings)),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<Option<Settings>, StoreError> {
        let saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(saved.clone())
    }

    fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        settings.validate()?;
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        *saved = Some(settings.clone());
        Ok(())
    }
}
