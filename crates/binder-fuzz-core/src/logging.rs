//! Append-only JSONL result sink.
//!
//! The sink is an explicitly constructed handle passed to whoever needs it;
//! there is no process-wide logger. Records carry a timestamp, a severity and
//! a free-text message, one JSON object per line.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::report::Severity;

pub const DEFAULT_LOG_FILE: &str = "fuzzing_results.log";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub ts: String,
    pub severity: Severity,
    pub message: String,
}

/// File-backed result sink. The file is opened lazily on first write and
/// appended to for the rest of the run.
#[derive(Debug)]
pub struct FuzzLogger {
    config: LogConfig,
    file: Mutex<Option<File>>,
}

impl FuzzLogger {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            file: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Append one record. Severity dispatch is a closed enum, so every class
    /// of record has a defined destination.
    pub fn log(&self, severity: Severity, message: impl Into<String>) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let record = LogRecord {
            ts: Utc::now().to_rfc3339(),
            severity,
            message: message.into(),
        };

        let mut file_guard = self.file.lock();
        if file_guard.is_none() {
            if let Some(parent) = self.config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.config.path)?;
            *file_guard = Some(file);
        }

        if let Some(file) = file_guard.as_mut() {
            let line = serde_json::to_string(&record)?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    /// Flush buffered output; part of the sink's teardown lifecycle.
    pub fn flush(&self) -> Result<()> {
        if let Some(file) = self.file.lock().as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}
