//! Logger capability used for caller-visible queue log lines.
//!
//! Queue operations write a small set of plain-text lines (send failures,
//! receive start, debug message dumps) through a [`QueueLogger`]. Callers can
//! route them anywhere by supplying their own implementation in the
//! configuration; by default they go through `tracing`.

use std::sync::{Arc, Mutex};

/// Sink for the plain-text log lines emitted by queues
pub trait QueueLogger: Send + Sync {
    /// Record an informational line
    fn info(&self, message: &str);

    /// Record an error line
    fn error(&self, message: &str);
}

/// Default logger that forwards lines to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl QueueLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "queue_consumer", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "queue_consumer", "{}", message);
    }
}

/// Severity of a captured log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// A single captured log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Logger that keeps every line in memory.
///
/// Useful for tests and for embedding applications that forward queue log lines
/// somewhere other than `tracing`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Lines logged at the given level
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    /// Check whether any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(needle))
    }

    fn push(&self, level: LogLevel, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: message.to_string(),
            });
        }
    }
}

impl QueueLogger for MemoryLogger {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}
