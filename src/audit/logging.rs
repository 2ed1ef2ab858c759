//! Operation log: the append-only, timestamped trace of one submission.
//!
//! Entries are written synchronously with the state transition they describe
//! and mirrored to `tracing`. Subscribers get live updates over a broadcast
//! channel; a lagging subscriber can always re-read the full log.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    Cleared,
    Appended(LogEntry),
}

struct Inner {
    entries: RwLock<Vec<LogEntry>>,
    events: broadcast::Sender<LogEvent>,
}

/// Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct OperationLog {
    inner: Arc<Inner>,
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OperationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationLog").field("len", &self.len()).finish()
    }
}

impl OperationLog {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { inner: Arc::new(Inner { entries: RwLock::new(Vec::new()), events }) }
    }

    /// Drops every entry. Called at the start of each submission.
    pub fn clear(&self) {
        self.inner.entries.write().clear();
        let _ = self.inner.events.send(LogEvent::Cleared);
    }

    pub fn append(
        &self,
        severity: Severity,
        message: impl Into<String>,
        payload: Option<Value>,
    ) -> LogEntry {
        let message = message.into();
        let entry = {
            let mut entries = self.inner.entries.write();
            // wall clock may step backwards; the log never does
            let now = Utc::now();
            let timestamp = match entries.last() {
                Some(last) if last.timestamp > now => last.timestamp,
                _ => now,
            };
            let entry = LogEntry { timestamp, message, severity, payload };
            entries.push(entry.clone());
            entry
        };

        let payload_text = entry.payload.as_ref().map(|p| p.to_string()).unwrap_or_default();
        match severity {
            Severity::Error => error!(severity = "error", payload = %payload_text, "{}", entry.message),
            Severity::Success => info!(severity = "success", payload = %payload_text, "{}", entry.message),
            Severity::Pending => info!(severity = "pending", payload = %payload_text, "{}", entry.message),
            Severity::Info => info!(severity = "info", payload = %payload_text, "{}", entry.message),
        }

        let _ = self.inner.events.send(LogEvent::Appended(entry.clone()));
        entry
    }

    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.append(Severity::Info, message, None)
    }

    pub fn info_with(&self, message: impl Into<String>, payload: Value) -> LogEntry {
        self.append(Severity::Info, message, Some(payload))
    }

    pub fn success(&self, message: impl Into<String>) -> LogEntry {
        self.append(Severity::Success, message, None)
    }

    pub fn success_with(&self, message: impl Into<String>, payload: Value) -> LogEntry {
        self.append(Severity::Success, message, Some(payload))
    }

    pub fn pending(&self, message: impl Into<String>) -> LogEntry {
        self.append(Severity::Pending, message, None)
    }

    pub fn pending_with(&self, message: impl Into<String>, payload: Value) -> LogEntry {
        self.append(Severity::Pending, message, Some(payload))
    }

    pub fn error_with(&self, message: impl Into<String>, payload: Value) -> LogEntry {
        self.append(Severity::Error, message, Some(payload))
    }

    /// Snapshot in append order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.inner.events.subscribe()
    }
}
