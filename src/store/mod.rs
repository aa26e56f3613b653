//! Flat-file collaborators of the dashboard session.
//!
//! Both stores are injected into a session at construction; nothing in the
//! crate holds an ambient global file handle.

use serde::Serialize;
use thiserror::Error;

use crate::error::EngineError;

mod config_store;
mod log_sink;

pub use config_store::{ConfigStore, JsonFileConfigStore, MemoryConfigStore};
pub use log_sink::{CsvLogSink, LogSink, MemoryLogSink};

// ---

#[derive(Debug, Error)]
pub enum StoreError {
    // ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("stored settings are invalid: {0}")]
    Invalid(#[from] EngineError),
}

/// Render rows as a CSV document with a header line.
///
/// The csv writer derives the header from the first row, so `headers` is
/// only written explicitly when there are no rows at all.
pub fn write_csv<T, I>(headers: &[&str], rows: I) -> Result<String, StoreError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    // ---
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut written = 0usize;
    for row in rows {
        writer.serialize(row)?;
        written += 1;
    }
    if written == 0 {
        writer.write_record(headers)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
