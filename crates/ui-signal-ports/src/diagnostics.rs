//! Diagnostic sink.
//!
//! A user-facing trail of what the sync layer did, separate from process
//! logging. Entries are purely observational.

use parking_lot::Mutex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    pub message: String,
    pub severity: Severity,
}

/// Receiver of diagnostic messages. `add` must never panic or block.
pub trait DiagnosticSink: Send + Sync {
    fn add(&self, message: &str, severity: Severity);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnosticSink;

impl DiagnosticSink for NullDiagnosticSink {
    fn add(&self, _message: &str, _severity: Severity) {}
}

/// Forwards entries to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn add(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => tracing::info!(target: "vitals::diagnostics", "{}", message),
            Severity::Warn => tracing::warn!(target: "vitals::diagnostics", "{}", message),
            Severity::Error => tracing::error!(target: "vitals::diagnostics", "{}", message),
        }
    }
}

/// Keeps every entry for assertions.
#[derive(Debug, Default)]
pub struct RecordingDiagnosticSink {
    entries: Mutex<Vec<DiagnosticEntry>>,
}

impl RecordingDiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.entries.lock().clone()
    }

    /// Messages at or above `severity`.
    pub fn messages_at_least(&self, severity: Severity) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.severity >= severity)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Whether any entry contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for RecordingDiagnosticSink {
    fn add(&self, message: &str, severity: Severity) {
        self.entries.lock().push(DiagnosticEntry {
            message: message.to_string(),
            severity,
        });
    }
}
