#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSONL logging shared by the AERIS monitoring crates.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal operational events.
    Info,
    /// Degraded-but-available conditions.
    Warn,
    /// Failures surfaced to operators.
    Error,
}

/// One structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Component that emitted the record.
    pub component: String,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Structured fields attached to the record.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(component: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            component: component.into(),
            level,
            message: message.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Attaches structured fields; non-object values are stored under `data`.
    #[must_use]
    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        match fields {
            serde_json::Value::Object(map) => self.fields = map,
            serde_json::Value::Null => {}
            other => {
                self.fields.insert("data".into(), other);
            }
        }
        self
    }
}

/// Append-only JSONL logger with a minimum-severity filter.
#[derive(Debug)]
pub struct JsonlLogger {
    path: PathBuf,
    min_level: LogLevel,
    writer: Mutex<File>,
}

impl JsonlLogger {
    /// Creates or opens a logger at the given path, accepting all severities.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_min_level(path, LogLevel::Debug)
    }

    /// Creates or opens a logger that drops records below `min_level`.
    pub fn with_min_level(path: impl AsRef<Path>, min_level: LogLevel) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            min_level,
            writer: Mutex::new(file),
        })
    }

    /// Appends a record as one JSON line, skipping records below the filter.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        if record.level < self.min_level {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Underlying file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn writes_records_with_fields() {
        let dir = tempdir().unwrap();
        let logger = JsonlLogger::create(dir.path().join("monitor.log")).unwrap();
        let record = LogRecord::new("monitor", LogLevel::Info, "reading scored")
            .with_fields(json!({ "risk_level": 2 }));
        logger.log(&record).unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("\"message\":\"reading scored\""));
        assert!(content.contains("\"risk_level\":2"));
    }

    #[test]
    fn filters_below_min_level() {
        let dir = tempdir().unwrap();
        let logger =
            JsonlLogger::with_min_level(dir.path().join("monitor.log"), LogLevel::Warn).unwrap();
        logger
            .log(&LogRecord::new("monitor", LogLevel::Debug, "dropped"))
            .unwrap();
        logger
            .log(&LogRecord::new("monitor", LogLevel::Error, "kept"))
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(!content.contains("dropped"));
        assert!(content.contains("kept"));
    }

    #[test]
    fn severity_ordering_is_total() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}
