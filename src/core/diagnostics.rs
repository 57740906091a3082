//! Diagnostics sink for stage failure reporting
//!
//! Stages never write to a logger directly; they hand structured records to
//! a [`Diagnostics`] implementation. The default forwards to `tracing`. The
//! recording implementation is for tests and for applications that want to
//! assert on what the pipeline reported.

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a diagnostics record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for DiagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagLevel::Info => "info",
            DiagLevel::Warn => "warn",
            DiagLevel::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Sink collaborating with the pipeline.
///
/// Implementations must return promptly; the pipeline never awaits the sink
/// and a slow implementation would delay the request's pass/fail decision.
pub trait Diagnostics: Send + Sync {
    fn record(&self, level: DiagLevel, message: &str, meta: &Value);
}

/// Default sink forwarding to the `tracing` macros, with the structured
/// metadata attached as a field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, level: DiagLevel, message: &str, meta: &Value) {
        match level {
            DiagLevel::Info => tracing::info!(meta = %meta, "{}", message),
            DiagLevel::Warn => tracing::warn!(meta = %meta, "{}", message),
            DiagLevel::Error => tracing::error!(meta = %meta, "{}", message),
        }
    }
}

/// One captured record.
#[derive(Debug, Clone)]
pub struct DiagnosticRecord {
    pub level: DiagLevel,
    pub message: String,
    pub meta: Value,
}

/// Sink that keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    records: Arc<Mutex<Vec<DiagnosticRecord>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records captured so far.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn record(&self, level: DiagLevel, message: &str, meta: &Value) {
        if let Ok(mut records) = self.records.lock() {
            records.push(DiagnosticRecord {
                level,
                message: message.to_string(),
                meta: meta.clone(),
            });
        }
    }
}
