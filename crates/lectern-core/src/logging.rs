//! Error-log sinks for generation forensics.
//!
//! Every generation attempt and every rejected validation is recorded as a
//! [`LogEntry`]. Sinks are side channels: a failing sink is reported through
//! `tracing` and never changes the outcome of the work being logged.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::error::LecternError;

/// Default file written by [`JsonFileErrorLog`].
pub const DEFAULT_ERROR_LOG: &str = "error.log";

/// Error formatted for the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedError {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&LecternError> for FormattedError {
    fn from(err: &LecternError) -> Self {
        Self {
            name: err.kind().to_string(),
            message: err.to_string(),
            code: Some(err.code().as_str().to_string()),
        }
    }
}

/// One record in the error log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FormattedError>,
    pub context: serde_json::Value,
}

impl LogEntry {
    /// Entry describing a failure.
    pub fn error(err: &LecternError, context: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            error: Some(err.into()),
            context,
        }
    }

    /// Entry describing a non-failure event (e.g. a successful attempt).
    pub fn event(context: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            error: None,
            context,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Destination for generation forensics.
#[async_trait]
pub trait ErrorLog: Send + Sync {
    /// Record an entry. Must not fail; problems are reported via tracing.
    async fn record(&self, entry: LogEntry);
}

/// Writes entries as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorLog;

#[async_trait]
impl ErrorLog for TracingErrorLog {
    async fn record(&self, entry: LogEntry) {
        match &entry.error {
            Some(err) => error!(
                error.name = %err.name,
                error.message = %err.message,
                context = %entry.context,
                "Generation error"
            ),
            None => debug!(context = %entry.context, "Generation event"),
        }
    }
}

/// Appends entries to a file as pretty-printed JSON, one entry after another.
#[derive(Debug)]
pub struct JsonFileErrorLog {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        let mut content = serde_json::to_string_pretty(entry)?;
        content.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await
    }
}

impl Default for JsonFileErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_LOG)
    }
}

#[async_trait]
impl ErrorLog for JsonFileErrorLog {
    async fn record(&self, entry: LogEntry) {
        if let Err(e) = self.append(&entry).await {
            warn!(path = %self.path.display(), error = %e, "Failed to write error log entry");
        }
    }
}

/// Keeps entries in memory, for callers that hand the trail back with results.
#[derive(Debug, Default)]
pub struct MemoryErrorLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Only the entries that describe failures.
    pub fn errors(&self) -> Vec<LogEntry> {
        self.entries().into_iter().filter(LogEntry::is_error).collect()
    }
}

#[async_trait]
impl ErrorLog for MemoryErrorLog {
    async fn record(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_file_log_appends_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonFileErrorLog::new(dir.path().join("error.log"));

        log.record(LogEntry::error(
            &LecternError::generation_failed("timeout", 4),
            json!({"attempt": 3}),
        ))
        .await;
        log.record(LogEntry::event(json!({"attempt": 0}))).await;

        let content = tokio::fs::read_to_string(log.path()).await.unwrap();
        let entries: Vec<LogEntry> = serde_json::Deserializer::from_str(&content)
            .into_iter::<LogEntry>()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(entries.len(), 2);
        let err = entries[0].error.as_ref().unwrap();
        assert_eq!(err.name, "GenerationFailed");
        assert_eq!(err.code.as_deref(), Some("GEN_001"));
        assert_eq!(entries[0].context["attempt"], json!(3));
        assert!(entries[1].error.is_none());
    }

    #[tokio::test]
    async fn test_file_log_swallows_write_errors() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let log = JsonFileErrorLog::new(dir.path());
        log.record(LogEntry::event(json!({}))).await;
    }

    #[tokio::test]
    async fn test_memory_log_filters_errors() {
        let log = MemoryErrorLog::new();
        log.record(LogEntry::event(json!({"attempt": 0}))).await;
        log.record(LogEntry::error(&LecternError::llm("boom"), json!({})))
            .await;

        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.errors().len(), 1);
    }
}
