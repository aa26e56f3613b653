//! Append-only tick log: the `LogSink` seam, a CSV file sink and an
//! in-memory sink for tests.
//!
//! The CSV columns are the fields of [`LogRecord`], in order.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::StoreError;
use crate::models::LogRecord;

// ---

/// Append-only history of evaluated ticks. Never read back by the engine.
pub trait LogSink: Send + Sync {
    fn append(&self, record: &LogRecord) -> Result<(), StoreError>;
}

/// One CSV row per tick; the header is written when the file is created.
#[derive(Debug)]
pub struct CsvLogSink {
    path: PathBuf,
    // Serializes appends from concurrent sessions sharing one file.
    write_lock: Mutex<()>,
}

impl CsvLogSink {
    // ---
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for CsvLogSink {
    fn append(&self, record: &LogRecord) -> Result<(), StoreError> {
        // ---
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, record: &LogRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;

    fn record(minute: u32, energy: f64) -> LogRecord {
        LogRecord {
            timestamp: NaiveDate::from_ymd_opt(2025, 3, 26)
                .unwrap()
                .and_hms_opt(10, minute, 0)
                .unwrap(),
            voltage: 231.2,
            current: 55.4,
            power: 11.5,
            energy_consumed_kwh: energy,
            estimated_cost: energy * 5.75,
        }
    }

    #[test]
    fn test_header_written_once() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvLogSink::new(dir.path().join("load_data_log.csv"));

        sink.append(&record(0, 0.5)).unwrap();
        sink.append(&record(1, 1.0)).unwrap();
        sink.append(&record(2, 1.5)).unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "timestamp,voltage,current,power,energy_consumed_kwh,estimated_cost"
        );
        assert!(lines[1].starts_with("2025-03-26T10:00:00,231.2,55.4,11.5,0.5,"));
        assert_eq!(
            contents.matches("timestamp").count(),
            1,
            "header must appear exactly once"
        );
    }

    #[test]
    fn test_appends_to_existing_log() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("load_data_log.csv");

        CsvLogSink::new(&path).append(&record(0, 0.5)).unwrap();
        CsvLogSink::new(&path).append(&record(1, 1.0)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<LogRecord> = reader.deserialize().map(|r| r.unwrap()).collect();

        assert_eq!(rows, vec![record(0, 0.5), record(1, 1.0)]);
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        // ---
        let sink = MemoryLogSink::new();
        sink.append(&record(0, 0.1)).unwrap();
        sink.append(&record(1, 0.2)).unwrap();

        let energies: Vec<f64> = sink
            .records()
            .iter()
            .map(|r| r.energy_consumed_kwh)
            .collect();
        assert_eq!(energies, vec![0.1, 0.2]);
    }
}
